//! Split Player - Playback synchronization state machine
//!
//! Coordinates:
//! - Backend dependency loading
//! - Video membership and the readiness barrier
//! - Global state transitions, broadcast to every adapter
//! - Plugin notification and the update ticker
//!
//! All input reaches the player as [`PlayerEvent`]s on one channel: adapter
//! signals, update ticks and commands from [`PlayerHandle`]s. The player
//! handles them one at a time, so adapters and plugins never re-enter a
//! transition that is still in progress.

use crate::{
    adapter::{AdapterContext, EventSink, VideoAdapter},
    backend::{BackendRegistry, RegisteredBackend},
    barrier::ReadinessBarrier,
    config::PlayerConfig,
    error::{CommandOutcome, Rejection},
    plugin::{Hook, PlayerSnapshot, Plugin, PluginBus},
    ticker::UpdateTicker,
    types::*,
    Error, Result,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, trace, warn};

/// Id of the container rendered into the mount area
pub const CONTAINER_ID: &str = "SplitPlayer";

/// Command from a player consumer
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Play,
    Pause,
    Stop,
    /// Seek every video to a shared-timeline time
    TimeTo(f64),
    AddVideo(VideoDescriptor),
    RemoveVideo(VideoDescriptor),
    /// Leave the run loop
    Shutdown,
}

/// Input to the player's event loop
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Normalized signal from one adapter
    Adapter { entry: EntryId, signal: AdapterSignal },
    /// Update ticker fired. Ticks from a ticker run that has since been
    /// stopped carry an old generation and are dropped.
    Tick { generation: u64 },
    Command(PlayerCommand),
}

/// Cloneable command handle for UI and other consumers
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerEvent>,
}

impl PlayerHandle {
    pub fn send(&self, command: PlayerCommand) -> Result<()> {
        self.tx
            .send(PlayerEvent::Command(command))
            .map_err(|_| Error::PlayerClosed)
    }

    pub fn play(&self) -> Result<()> {
        self.send(PlayerCommand::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(PlayerCommand::Pause)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(PlayerCommand::Stop)
    }

    pub fn time_to(&self, time: f64) -> Result<()> {
        self.send(PlayerCommand::TimeTo(time))
    }

    pub fn add_video(&self, video: VideoDescriptor) -> Result<()> {
        self.send(PlayerCommand::AddVideo(video))
    }

    pub fn remove_video(&self, video: VideoDescriptor) -> Result<()> {
        self.send(PlayerCommand::RemoveVideo(video))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(PlayerCommand::Shutdown)
    }

    /// True once the player has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct VideoEntry {
    id: EntryId,
    descriptor: VideoDescriptor,
    adapter: Box<dyn VideoAdapter>,
    /// Completed its ready handshake
    ready: bool,
}

/// A set of video embeds driven as one player
pub struct SplitPlayer {
    /// Player configuration
    config: PlayerConfig,
    /// Hosting backend resolved from the configuration
    backend: Arc<RegisteredBackend>,
    /// Global player state
    state: PlayerState,
    /// State change broadcaster
    state_tx: watch::Sender<PlayerState>,
    /// Videos in registration order
    videos: Vec<VideoEntry>,
    /// Videos added before backend dependencies finished loading
    deferred: Vec<VideoDescriptor>,
    barrier: ReadinessBarrier,
    /// Longest effective duration reported by a ready video
    duration: f64,
    /// Video answering position queries
    position_source: Option<EntryId>,
    plugins: PluginBus,
    ticker: UpdateTicker,
    /// Container rendered into the mount area
    container: Option<String>,
    dependencies_loaded: bool,
    events_tx: mpsc::UnboundedSender<PlayerEvent>,
    events_rx: mpsc::UnboundedReceiver<PlayerEvent>,
}

impl SplitPlayer {
    /// Create a player, resolving its backend from the registry
    pub fn new(config: PlayerConfig, registry: &BackendRegistry) -> Result<Self> {
        config.validate()?;
        let backend = registry.resolve(&config.hoster)?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(PlayerState::Unstarted);
        let ticker = UpdateTicker::new(config.update_interval(), events_tx.clone());

        info!(
            hoster = %config.hoster,
            videos = config.videos.len(),
            max_videos = config.max_videos,
            "Split player created"
        );

        Ok(Self {
            config,
            backend,
            state: PlayerState::Unstarted,
            state_tx,
            videos: Vec::new(),
            deferred: Vec::new(),
            barrier: ReadinessBarrier::new(),
            duration: 0.0,
            position_source: None,
            plugins: PluginBus::new(),
            ticker,
            container: None,
            dependencies_loaded: false,
            events_tx,
            events_rx,
        })
    }

    /// Command handle for consumers outside the event loop
    pub fn handle(&self) -> PlayerHandle {
        PlayerHandle {
            tx: self.events_tx.clone(),
        }
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<PlayerState> {
        self.state_tx.subscribe()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Longest effective video duration
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Shared-timeline position, answered by the canonical position source
    pub fn played_time(&self) -> f64 {
        self.position_source
            .and_then(|id| self.entry(id))
            .map(|video| video.adapter.played_time())
            .unwrap_or(0.0)
    }

    /// Entry currently answering position queries
    pub fn position_source(&self) -> Option<EntryId> {
        self.position_source
    }

    pub fn video_count(&self) -> usize {
        self.videos.len()
    }

    pub fn ready_count(&self) -> usize {
        self.barrier.ready()
    }

    /// Readiness barrier satisfied
    pub fn all_ready(&self) -> bool {
        self.barrier.is_satisfied()
    }

    /// Videos in registration order
    pub fn videos(&self) -> impl Iterator<Item = &VideoDescriptor> + '_ {
        self.videos.iter().map(|video| &video.descriptor)
    }

    /// Entry ids and videos in registration order
    pub fn entries(&self) -> impl Iterator<Item = (EntryId, &VideoDescriptor)> + '_ {
        self.videos.iter().map(|video| (video.id, &video.descriptor))
    }

    /// Entry id of the first video equal to `descriptor`
    pub fn entry_id(&self, descriptor: &VideoDescriptor) -> Option<EntryId> {
        self.videos
            .iter()
            .find(|video| &video.descriptor == descriptor)
            .map(|video| video.id)
    }

    /// Videos waiting for backend dependencies
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    pub fn dependencies_loaded(&self) -> bool {
        self.dependencies_loaded
    }

    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_running()
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Read-only view handed to plugins
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            state: self.state,
            duration: self.duration,
            played_time: self.played_time(),
            videos: self.videos.len(),
            ready: self.barrier.ready(),
        }
    }

    /// Register a plugin. Plugins are notified in registration order.
    pub fn add_plugin<P: Plugin + 'static>(&mut self, plugin: P) -> usize {
        debug!(plugin = plugin.name(), "Plugin added");
        self.plugins.add(Box::new(plugin))
    }

    /// Load the backend's runtime dependency, then add the configured videos.
    ///
    /// The backend load runs once per registration; a second player on the
    /// same backend only waits for it.
    #[instrument(skip(self), fields(hoster = %self.config.hoster))]
    pub async fn load_dependencies(&mut self) -> Result<()> {
        if self.dependencies_loaded {
            debug!("Backend dependencies already loaded");
            return Ok(());
        }
        self.backend.ensure_loaded().await?;
        self.on_dependencies_ready();
        Ok(())
    }

    fn on_dependencies_ready(&mut self) {
        self.dependencies_loaded = true;
        self.render();

        let initial: Vec<VideoDescriptor> = self
            .config
            .videos
            .iter()
            .cloned()
            .chain(self.deferred.drain(..))
            .collect();

        for video in initial {
            if let Err(e) = self.add_video(video) {
                warn!(error = %e, code = e.error_code(), "Failed to add video");
            }
        }

        self.set_state(PlayerState::Loading);
        info!(videos = self.videos.len(), "Backend dependencies loaded");
    }

    fn render(&mut self) {
        match &self.config.area {
            Some(area) => {
                self.container = Some(format!("{} #{}", area, CONTAINER_ID));
                info!(area = %area, container = CONTAINER_ID, "Container rendered");
            }
            None => info!("No mount area defined, nothing rendered"),
        }
    }

    /// Add a video. Before backend dependencies are loaded the video is
    /// deferred; it is created once loading completes.
    #[instrument(skip(self, video), fields(video = %video))]
    pub fn add_video(&mut self, video: VideoDescriptor) -> Result<CommandOutcome> {
        video.validate()?;

        if self.videos.len() + self.deferred.len() >= self.config.max_videos {
            return Ok(self.reject(
                "add_video",
                Rejection::CapacityReached {
                    max_videos: self.config.max_videos,
                },
            ));
        }

        if !self.dependencies_loaded {
            debug!("Backend dependencies loading, video deferred");
            self.deferred.push(video);
            return Ok(CommandOutcome::Deferred);
        }

        let id = EntryId::new();
        let context = AdapterContext {
            entry: id,
            descriptor: video.clone(),
            container: self.container.clone(),
            events: EventSink::new(id, self.events_tx.clone()),
        };
        let mut adapter = self.backend.create_adapter(context)?;
        adapter.create()?;

        self.videos.push(VideoEntry {
            id,
            descriptor: video,
            adapter,
            ready: false,
        });
        self.barrier.register();

        info!(entry = %id, videos = self.videos.len(), "Video added");
        Ok(CommandOutcome::Applied)
    }

    /// Remove the first video equal to `video` and tear down its embed
    #[instrument(skip(self, video), fields(video = %video))]
    pub fn remove_video(&mut self, video: &VideoDescriptor) -> CommandOutcome {
        if let Some(index) = self.deferred.iter().position(|deferred| deferred == video) {
            self.deferred.remove(index);
            info!("Deferred video removed");
            return CommandOutcome::Applied;
        }

        let Some(index) = self.videos.iter().position(|entry| &entry.descriptor == video) else {
            return self.reject(
                "remove_video",
                Rejection::UnknownVideo {
                    video_id: video.video_id.clone(),
                },
            );
        };

        let was_satisfied = self.barrier.is_satisfied();
        let mut entry = self.videos.remove(index);
        entry.adapter.remove();
        self.barrier.unregister(entry.ready);

        if self.position_source == Some(entry.id) {
            self.elect_position_source();
        }

        // The last pending video left: the remaining ones are all ready
        if !was_satisfied && self.barrier.is_satisfied() && !self.videos.is_empty() {
            info!(videos = self.videos.len(), duration = self.duration, "All videos ready");
            self.notify(Hook::Ready);
        }

        info!(
            entry = %entry.id,
            videos = self.videos.len(),
            ready = self.barrier.ready(),
            "Video removed"
        );
        CommandOutcome::Applied
    }

    /// Apply a normalized state reported by an adapter
    pub fn change_state(&mut self, candidate: PlayerState) -> CommandOutcome {
        info!(state = %candidate, "State change requested");

        if let Err(rejection) = self.barrier.check() {
            return self.reject("change_state", rejection);
        }

        match candidate {
            PlayerState::Buffering | PlayerState::Paused => self.pause(),
            PlayerState::Playing => self.play(),
            other => self.reject("change_state", Rejection::Unmapped { state: other }),
        }
    }

    /// Start every video
    #[instrument(skip(self))]
    pub fn play(&mut self) -> CommandOutcome {
        if let Err(rejection) = self.barrier.check() {
            return self.reject("play", rejection);
        }
        if self.state == PlayerState::Playing {
            return self.reject(
                "play",
                Rejection::Redundant {
                    state: PlayerState::Playing,
                },
            );
        }

        self.ticker.start();
        for video in self.videos.iter_mut() {
            video.adapter.play();
        }
        self.set_state(PlayerState::Playing);
        self.notify(Hook::Play);

        info!("Playing");
        CommandOutcome::Applied
    }

    /// Pause every video. Only a playing player can be paused.
    #[instrument(skip(self))]
    pub fn pause(&mut self) -> CommandOutcome {
        if let Err(rejection) = self.barrier.check() {
            return self.reject("pause", rejection);
        }
        if self.state != PlayerState::Playing {
            return self.reject("pause", Rejection::NotPlaying { state: self.state });
        }

        for video in self.videos.iter_mut() {
            video.adapter.pause();
        }
        self.ticker.stop();
        self.set_state(PlayerState::Paused);
        self.notify(Hook::Pause);

        info!("Paused");
        CommandOutcome::Applied
    }

    /// Rewind and pause every video
    #[instrument(skip(self))]
    pub fn stop(&mut self) -> CommandOutcome {
        if let Err(rejection) = self.barrier.check() {
            return self.reject("stop", rejection);
        }
        if self.state == PlayerState::Unstarted {
            return self.reject(
                "stop",
                Rejection::Redundant {
                    state: PlayerState::Unstarted,
                },
            );
        }

        for video in self.videos.iter_mut() {
            video.adapter.stop();
        }
        self.ticker.stop();
        self.set_state(PlayerState::Unstarted);
        self.notify(Hook::Stop);

        info!("Stopped");
        CommandOutcome::Applied
    }

    /// Seek every video to a shared-timeline time. Not gated on readiness.
    #[instrument(skip(self))]
    pub fn time_to(&mut self, time: f64) {
        for video in self.videos.iter_mut() {
            video.adapter.time_to(time);
        }
        info!(time, videos = self.videos.len(), "Time set");
    }

    /// Notify plugins of an update tick
    pub fn update(&mut self) {
        self.notify(Hook::Update);
    }

    /// Handle one event. Returns false once the player was asked to shut
    /// down.
    pub fn handle_event(&mut self, event: PlayerEvent) -> bool {
        match event {
            PlayerEvent::Adapter {
                entry,
                signal: AdapterSignal::Ready,
            } => self.on_adapter_ready(entry),
            PlayerEvent::Adapter {
                entry,
                signal: AdapterSignal::StateChange { state },
            } => self.on_adapter_state(entry, state),
            PlayerEvent::Tick { generation } => {
                if self.ticker.is_current(generation) {
                    self.update();
                } else {
                    trace!("Stale tick dropped");
                }
            }
            PlayerEvent::Command(command) => return self.apply_command(command),
        }
        true
    }

    /// Handle every event already queued, without waiting. Returns the
    /// number of events handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            handled += 1;
            if !self.handle_event(event) {
                break;
            }
        }
        handled
    }

    /// Handle events until a shutdown command arrives
    pub async fn run(&mut self) {
        info!("Player event loop started");
        while let Some(event) = self.events_rx.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }
        info!("Player event loop stopped");
    }

    fn apply_command(&mut self, command: PlayerCommand) -> bool {
        match command {
            PlayerCommand::Play => {
                self.play();
            }
            PlayerCommand::Pause => {
                self.pause();
            }
            PlayerCommand::Stop => {
                self.stop();
            }
            PlayerCommand::TimeTo(time) => self.time_to(time),
            PlayerCommand::AddVideo(video) => {
                if let Err(e) = self.add_video(video) {
                    warn!(error = %e, code = e.error_code(), "Failed to add video");
                }
            }
            PlayerCommand::RemoveVideo(video) => {
                self.remove_video(&video);
            }
            PlayerCommand::Shutdown => {
                self.ticker.stop();
                info!("Shutdown requested");
                return false;
            }
        }
        true
    }

    fn on_adapter_ready(&mut self, entry: EntryId) {
        let Some(video) = self.entry_mut(entry) else {
            debug!(%entry, "Ready signal from removed video ignored");
            return;
        };
        if video.ready {
            debug!(%entry, "Duplicate ready signal ignored");
            return;
        }

        let duration = video.adapter.duration();
        let video_id = video.descriptor.video_id.clone();
        self.consider_duration(entry, duration);

        if let Some(video) = self.entry_mut(entry) {
            video.adapter.stop();
            video.ready = true;
        }
        info!(video = %video_id, duration, "Video ready");

        if !self.barrier.mark_ready() {
            info!(
                ready = self.barrier.ready(),
                total = self.barrier.total(),
                "Videos not ready yet"
            );
            return;
        }

        info!(videos = self.videos.len(), duration = self.duration, "All videos ready");
        self.notify(Hook::Ready);
    }

    fn on_adapter_state(&mut self, entry: EntryId, state: PlayerState) {
        let Some(video) = self.entry(entry) else {
            debug!(%entry, %state, "State from removed video ignored");
            return;
        };
        debug!(video = %video.descriptor.video_id, %state, "Adapter state");

        if state != PlayerState::Ended {
            self.change_state(state);
            return;
        }

        if let Err(rejection) = self.barrier.check() {
            self.reject("ended", rejection);
            return;
        }
        if self.position_source == Some(entry) {
            self.finish();
        } else {
            debug!(%entry, "Shorter video ended and rewound");
        }
    }

    /// The canonical position source reached its end: the whole timeline
    /// is over.
    fn finish(&mut self) {
        for video in self.videos.iter_mut() {
            video.adapter.stop();
        }
        self.ticker.stop();
        self.set_state(PlayerState::Ended);
        self.notify(Hook::Stop);

        info!(duration = self.duration, "Timeline ended");
    }

    /// Longest video wins: it defines the duration and answers position
    /// queries.
    fn consider_duration(&mut self, entry: EntryId, duration: f64) {
        if duration > self.duration {
            debug!(%entry, duration, previous = self.duration, "New position source");
            self.duration = duration;
            self.position_source = Some(entry);
        }
    }

    fn elect_position_source(&mut self) {
        self.duration = 0.0;
        self.position_source = None;

        let candidates: Vec<(EntryId, f64)> = self
            .videos
            .iter()
            .filter(|video| video.ready)
            .map(|video| (video.id, video.adapter.duration()))
            .collect();
        for (entry, duration) in candidates {
            self.consider_duration(entry, duration);
        }
    }

    fn set_state(&mut self, state: PlayerState) {
        if self.state == state {
            return;
        }
        let previous = self.state;
        self.state = state;
        self.state_tx.send_replace(state);
        info!(from = %previous, to = %state, "State transition");
    }

    fn notify(&mut self, hook: Hook) {
        let snapshot = self.snapshot();
        self.plugins.notify(hook, &snapshot);
    }

    fn reject(&self, command: &'static str, rejection: Rejection) -> CommandOutcome {
        info!(command, state = %self.state, %rejection, "Command ignored");
        CommandOutcome::Rejected(rejection)
    }

    fn entry(&self, id: EntryId) -> Option<&VideoEntry> {
        self.videos.iter().find(|video| video.id == id)
    }

    fn entry_mut(&mut self, id: EntryId) -> Option<&mut VideoEntry> {
        self.videos.iter_mut().find(|video| video.id == id)
    }
}

#[cfg(all(test, feature = "simulated"))]
mod tests {
    use super::*;
    use crate::backend::SimulatedBackend;

    fn player(config: PlayerConfig) -> (SplitPlayer, SimulatedBackend) {
        let backend = SimulatedBackend::new();
        let mut registry = BackendRegistry::new();
        registry.register(backend.clone());
        (SplitPlayer::new(config, &registry).unwrap(), backend)
    }

    #[test]
    fn test_player_creation() {
        let (player, _) = player(PlayerConfig::default());
        assert_eq!(player.state(), PlayerState::Unstarted);
        assert_eq!(player.duration(), 0.0);
        assert_eq!(player.played_time(), 0.0);
        assert!(!player.dependencies_loaded());
        assert!(!player.is_ticking());
    }

    #[test]
    fn test_unknown_hoster_rejected() {
        let registry = BackendRegistry::new();
        let result = SplitPlayer::new(PlayerConfig::new("youtube", Vec::new()), &registry);
        assert!(matches!(result, Err(Error::UnknownBackend { .. })));
    }

    #[test]
    fn test_videos_deferred_until_dependencies_load() {
        let (mut player, backend) = player(PlayerConfig::default().with_area("#stage"));

        let outcome = player.add_video(VideoDescriptor::new("late", 0.0)).unwrap();
        assert_eq!(outcome, CommandOutcome::Deferred);
        assert_eq!(player.video_count(), 0);
        assert_eq!(player.deferred_count(), 1);

        tokio_test::block_on(player.load_dependencies()).unwrap();

        assert_eq!(player.state(), PlayerState::Loading);
        assert_eq!(player.video_count(), 1);
        assert_eq!(player.deferred_count(), 0);
        assert_eq!(player.container(), Some("#stage #SplitPlayer"));
        assert_eq!(backend.load_count(), 1);
    }

    #[test]
    fn test_removing_deferred_video() {
        let (mut player, _) = player(PlayerConfig::default());
        let video = VideoDescriptor::new("pending", 2.0);
        player.add_video(video.clone()).unwrap();

        assert!(player.remove_video(&video).is_applied());
        assert_eq!(player.deferred_count(), 0);
    }

    #[test]
    fn test_stale_tick_dropped() {
        let (mut player, _) = player(PlayerConfig::default());
        assert!(player.handle_event(PlayerEvent::Tick { generation: 0 }));
        assert!(!player.is_ticking());
    }

    #[test]
    fn test_shutdown_command_ends_processing() {
        let (mut player, _) = player(PlayerConfig::default());
        let handle = player.handle();
        handle.shutdown().unwrap();
        handle.play().unwrap();

        assert_eq!(player.process_pending(), 1);
        assert_eq!(player.process_pending(), 1);
        drop(player);
        assert!(handle.is_closed());
        assert!(matches!(handle.play(), Err(Error::PlayerClosed)));
    }
}
