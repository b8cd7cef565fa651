//! Simulated hosting backend
//!
//! In-process embeds with scriptable durations. Every command an adapter
//! receives and every native event it reports is appended to a shared
//! [`SimulationLog`], which makes the backend useful for headless runs and
//! for asserting command ordering.

use super::Backend;
use crate::{
    adapter::{forward_native_state, AdapterContext, EventSink, VideoAdapter},
    plugin::Hook,
    types::{AdapterCommand, EntryId, NativeState, PlayerState, VideoDescriptor},
    Error, Result,
};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::debug;

/// Identifier the simulated backend registers under
pub const SIMULATED_BACKEND_ID: &str = "simulated";

const DEFAULT_NATIVE_DURATION: f64 = 60.0;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded simulation step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    /// Backend dependencies loaded
    Loaded,
    /// An adapter received a command
    Command {
        video_id: String,
        command: AdapterCommand,
    },
    /// An embed reported a native state
    Native { video_id: String, state: NativeState },
    /// A plugin observed a hook
    Hook { plugin: String, hook: Hook },
}

/// Shared, append-only simulation log
#[derive(Debug, Clone, Default)]
pub struct SimulationLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl SimulationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: LogEntry) {
        lock(&self.entries).push(entry);
    }

    pub fn record_hook(&self, plugin: impl Into<String>, hook: Hook) {
        self.record(LogEntry::Hook {
            plugin: plugin.into(),
            hook,
        });
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        lock(&self.entries).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    /// Commands received by the adapters of one video, in order
    pub fn commands_for(&self, video_id: &str) -> Vec<AdapterCommand> {
        lock(&self.entries)
            .iter()
            .filter_map(|entry| match entry {
                LogEntry::Command {
                    video_id: id,
                    command,
                } if id == video_id => Some(*command),
                _ => None,
            })
            .collect()
    }

    /// Index of the first entry matching `predicate`
    pub fn position(&self, predicate: impl Fn(&LogEntry) -> bool) -> Option<usize> {
        lock(&self.entries).iter().position(predicate)
    }
}

#[derive(Debug)]
struct Embed {
    native_duration: f64,
    position: f64,
    playing: bool,
    removed: bool,
}

/// Adapter for one simulated embed.
///
/// Clones share the embed; the backend keeps one clone per live embed to
/// inject native events and drops it when the embed is removed.
#[derive(Debug, Clone)]
pub struct SimulatedAdapter {
    descriptor: VideoDescriptor,
    embed: Arc<Mutex<Embed>>,
    embeds: Weak<Mutex<Embeds>>,
    events: EventSink,
    log: SimulationLog,
    auto_ready: bool,
    echo: bool,
}

impl SimulatedAdapter {
    fn record(&self, command: AdapterCommand) {
        self.log.record(LogEntry::Command {
            video_id: self.descriptor.video_id.clone(),
            command,
        });
    }

    /// Report a native state as the embed would
    pub fn emit_native(&mut self, state: NativeState) -> Option<PlayerState> {
        self.log.record(LogEntry::Native {
            video_id: self.descriptor.video_id.clone(),
            state,
        });
        let events = self.events.clone();
        forward_native_state(self, state, &events)
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.embed).playing
    }

    pub fn is_removed(&self) -> bool {
        lock(&self.embed).removed
    }

    /// Advance the embed's clock. Returns true if the video reached its end.
    fn advance(&self, seconds: f64) -> bool {
        let mut embed = lock(&self.embed);
        if !embed.playing || embed.removed {
            return false;
        }
        embed.position = (embed.position + seconds).min(embed.native_duration);
        if embed.position >= embed.native_duration {
            embed.playing = false;
            return true;
        }
        false
    }
}

impl VideoAdapter for SimulatedAdapter {
    fn descriptor(&self) -> &VideoDescriptor {
        &self.descriptor
    }

    fn create(&mut self) -> Result<()> {
        self.record(AdapterCommand::Create);
        if self.auto_ready {
            self.events.ready();
        }
        Ok(())
    }

    fn play(&mut self) {
        self.record(AdapterCommand::Play);
        let was_playing = std::mem::replace(&mut lock(&self.embed).playing, true);
        // Embeds only report actual state changes
        if self.echo && !was_playing {
            self.emit_native(NativeState::Playing);
        }
    }

    fn pause(&mut self) {
        self.record(AdapterCommand::Pause);
        let was_playing = std::mem::replace(&mut lock(&self.embed).playing, false);
        if self.echo && was_playing {
            self.emit_native(NativeState::Paused);
        }
    }

    fn seek_to(&mut self, seconds: f64) {
        self.record(AdapterCommand::SeekTo { seconds });
        let mut embed = lock(&self.embed);
        embed.position = seconds.clamp(0.0, embed.native_duration);
    }

    fn native_duration(&self) -> f64 {
        lock(&self.embed).native_duration
    }

    fn native_position(&self) -> f64 {
        lock(&self.embed).position
    }

    fn remove(&mut self) {
        self.record(AdapterCommand::Remove);
        {
            let mut embed = lock(&self.embed);
            embed.playing = false;
            embed.removed = true;
        }
        if let Some(embeds) = self.embeds.upgrade() {
            lock(&embeds)
                .adapters
                .retain(|adapter| !Arc::ptr_eq(&adapter.embed, &self.embed));
        }
    }
}

#[derive(Debug)]
struct Settings {
    durations: HashMap<String, f64>,
    default_duration: f64,
    load_delay: Duration,
    auto_ready: bool,
    echo: bool,
}

#[derive(Debug, Default)]
struct Embeds {
    adapters: Vec<SimulatedAdapter>,
    loads: usize,
}

/// In-process hosting backend.
///
/// Clones share settings, embeds and log, so a test or a CLI keeps one clone
/// to drive the embeds a player created through another.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    settings: Arc<Mutex<Settings>>,
    embeds: Arc<Mutex<Embeds>>,
    log: SimulationLog,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self {
            settings: Arc::new(Mutex::new(Settings {
                durations: HashMap::new(),
                default_duration: DEFAULT_NATIVE_DURATION,
                load_delay: Duration::ZERO,
                auto_ready: true,
                echo: false,
            })),
            embeds: Arc::new(Mutex::new(Embeds::default())),
            log: SimulationLog::new(),
        }
    }

    /// Native duration for a video id
    pub fn with_duration(self, video_id: impl Into<String>, seconds: f64) -> Self {
        lock(&self.settings)
            .durations
            .insert(video_id.into(), seconds);
        self
    }

    /// Native duration for videos without an explicit one
    pub fn with_default_duration(self, seconds: f64) -> Self {
        lock(&self.settings).default_duration = seconds;
        self
    }

    /// Delay before the dependency load completes
    pub fn with_load_delay(self, delay: Duration) -> Self {
        lock(&self.settings).load_delay = delay;
        self
    }

    /// Embeds stay initializing until [`SimulatedBackend::mark_ready`]
    pub fn with_manual_ready(self) -> Self {
        lock(&self.settings).auto_ready = false;
        self
    }

    /// Embeds report play and pause commands back as native events, as real
    /// embeds do
    pub fn with_echo(self) -> Self {
        lock(&self.settings).echo = true;
        self
    }

    pub fn log(&self) -> SimulationLog {
        self.log.clone()
    }

    /// Number of completed dependency loads
    pub fn load_count(&self) -> usize {
        lock(&self.embeds).loads
    }

    /// Number of live embeds
    pub fn embed_count(&self) -> usize {
        lock(&self.embeds).adapters.len()
    }

    /// First live embed of a video id
    fn adapter(&self, video_id: &str) -> Result<SimulatedAdapter> {
        lock(&self.embeds)
            .adapters
            .iter()
            .find(|adapter| adapter.descriptor.video_id == video_id)
            .cloned()
            .ok_or_else(|| Error::UnknownVideo {
                video_id: video_id.to_string(),
            })
    }

    /// Live embed of one player entry. Needed when a player holds the same
    /// video more than once.
    fn adapter_for_entry(&self, entry: EntryId) -> Result<SimulatedAdapter> {
        lock(&self.embeds)
            .adapters
            .iter()
            .find(|adapter| adapter.events.entry() == entry)
            .cloned()
            .ok_or_else(|| Error::UnknownVideo {
                video_id: entry.to_string(),
            })
    }

    /// Finish initializing an embed created with manual readiness
    pub fn mark_ready(&self, video_id: &str) -> Result<()> {
        let adapter = self.adapter(video_id)?;
        adapter.events.ready();
        Ok(())
    }

    /// [`SimulatedBackend::mark_ready`] for one entry
    pub fn mark_ready_entry(&self, entry: EntryId) -> Result<()> {
        let adapter = self.adapter_for_entry(entry)?;
        adapter.events.ready();
        Ok(())
    }

    /// Inject a native state event for a video
    pub fn emit_native(&self, video_id: &str, state: NativeState) -> Result<Option<PlayerState>> {
        let mut adapter = self.adapter(video_id)?;
        Ok(adapter.emit_native(state))
    }

    /// [`SimulatedBackend::emit_native`] for one entry
    pub fn emit_native_entry(
        &self,
        entry: EntryId,
        state: NativeState,
    ) -> Result<Option<PlayerState>> {
        let mut adapter = self.adapter_for_entry(entry)?;
        Ok(adapter.emit_native(state))
    }

    /// Advance the clock of every playing embed. Embeds that reach their end
    /// report `Ended`.
    pub fn advance(&self, seconds: f64) {
        let adapters = lock(&self.embeds).adapters.clone();
        for mut adapter in adapters {
            if adapter.advance(seconds) {
                adapter.emit_native(NativeState::Ended);
            }
        }
    }

    /// Native position of a video's embed
    pub fn position(&self, video_id: &str) -> Option<f64> {
        self.adapter(video_id)
            .ok()
            .map(|adapter| adapter.native_position())
    }

    pub fn is_playing(&self, video_id: &str) -> bool {
        self.adapter(video_id)
            .map(|adapter| adapter.is_playing())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Backend for SimulatedBackend {
    fn id(&self) -> &str {
        SIMULATED_BACKEND_ID
    }

    async fn load(&self) -> Result<()> {
        let delay = lock(&self.settings).load_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        lock(&self.embeds).loads += 1;
        self.log.record(LogEntry::Loaded);
        debug!("Simulated backend loaded");
        Ok(())
    }

    fn create_adapter(&self, context: AdapterContext) -> Result<Box<dyn VideoAdapter>> {
        let (native_duration, auto_ready, echo) = {
            let settings = lock(&self.settings);
            let duration = settings
                .durations
                .get(&context.descriptor.video_id)
                .copied()
                .unwrap_or(settings.default_duration);
            (duration, settings.auto_ready, settings.echo)
        };

        let adapter = SimulatedAdapter {
            descriptor: context.descriptor,
            embed: Arc::new(Mutex::new(Embed {
                native_duration,
                position: 0.0,
                playing: false,
                removed: false,
            })),
            embeds: Arc::downgrade(&self.embeds),
            events: context.events,
            log: self.log.clone(),
            auto_ready,
            echo,
        };

        lock(&self.embeds).adapters.push(adapter.clone());
        Ok(Box::new(adapter))
    }
}
