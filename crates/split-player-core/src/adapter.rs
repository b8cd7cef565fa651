//! Video adapter contract
//!
//! An adapter wraps one embed of a hosting backend. It owns the embed,
//! translates its native state events into [`AdapterSignal`]s and applies
//! transport commands coming back from the player.
//!
//! Adapters never call into the player. Everything they report goes through
//! their [`EventSink`] and is handled later by the player's event loop, so an
//! embed that fires events while a command is being applied cannot re-enter
//! the state machine.

use crate::{
    player::PlayerEvent,
    types::{AdapterSignal, EntryId, NativeState, PlayerState, VideoDescriptor},
    Result,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Channel from one adapter back to its player
#[derive(Debug, Clone)]
pub struct EventSink {
    entry: EntryId,
    tx: mpsc::UnboundedSender<PlayerEvent>,
}

impl EventSink {
    pub(crate) fn new(entry: EntryId, tx: mpsc::UnboundedSender<PlayerEvent>) -> Self {
        Self { entry, tx }
    }

    /// Entry this sink reports for
    pub fn entry(&self) -> EntryId {
        self.entry
    }

    /// Report that the embed finished initializing
    pub fn ready(&self) {
        self.send(AdapterSignal::Ready);
    }

    /// Report a normalized state change
    pub fn state_changed(&self, state: PlayerState) {
        self.send(AdapterSignal::StateChange { state });
    }

    fn send(&self, signal: AdapterSignal) {
        let event = PlayerEvent::Adapter {
            entry: self.entry,
            signal,
        };
        if self.tx.send(event).is_err() {
            debug!(entry = %self.entry, ?signal, "Player gone, signal dropped");
        }
    }
}

/// Everything a backend needs to build an adapter for one entry
#[derive(Debug, Clone)]
pub struct AdapterContext {
    /// Entry the adapter will be stored under
    pub entry: EntryId,
    /// Video to embed
    pub descriptor: VideoDescriptor,
    /// Container the player rendered into its mount point, if any
    pub container: Option<String>,
    /// Signal channel back to the player
    pub events: EventSink,
}

/// One embedded video of a hosting backend.
///
/// Implementors provide the native operations; shared-timeline arithmetic
/// (start offsets, stop) is provided on top of them.
pub trait VideoAdapter: Send {
    /// Video this adapter was created for
    fn descriptor(&self) -> &VideoDescriptor;

    /// Start creating the embed. Completion is reported through
    /// [`EventSink::ready`], never assumed synchronous.
    fn create(&mut self) -> Result<()>;

    fn play(&mut self);

    fn pause(&mut self);

    /// Seek to a native (embed) time
    fn seek_to(&mut self, seconds: f64);

    /// Native duration of the embedded video
    fn native_duration(&self) -> f64;

    /// Native playback position of the embedded video
    fn native_position(&self) -> f64;

    /// Tear down the external embed
    fn remove(&mut self);

    fn start_offset(&self) -> f64 {
        self.descriptor().start_seconds
    }

    /// Seek to a shared-timeline time
    fn time_to(&mut self, time: f64) {
        let native = time + self.start_offset();
        debug!(video = %self.descriptor().video_id, time, native, "Set time");
        self.seek_to(native);
    }

    /// Rewind to the start of the shared timeline and pause
    fn stop(&mut self) {
        self.time_to(0.0);
        self.pause();
    }

    /// Duration on the shared timeline
    fn duration(&self) -> f64 {
        self.native_duration() - self.start_offset()
    }

    /// Position on the shared timeline
    fn played_time(&self) -> f64 {
        self.native_position() - self.start_offset()
    }
}

/// Normalize a native embed state and forward it to the player.
///
/// An ended video rewinds itself to the start of the shared timeline before
/// the player hears about it. States the player does not react to are logged
/// and dropped. Returns the forwarded state.
pub fn forward_native_state<A>(
    adapter: &mut A,
    native: NativeState,
    events: &EventSink,
) -> Option<PlayerState>
where
    A: VideoAdapter + ?Sized,
{
    let Some(state) = native.normalize() else {
        info!(
            video = %adapter.descriptor().video_id,
            code = native.code(),
            "Native event not handled"
        );
        return None;
    };

    if state == PlayerState::Ended {
        adapter.time_to(0.0);
    }

    events.state_changed(state);
    Some(state)
}
