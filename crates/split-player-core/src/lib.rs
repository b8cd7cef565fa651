//! Split Player Core - Synchronized playback of multiple video embeds
//!
//! This crate drives several independently hosted video embeds as one
//! logical player:
//! - One shared timeline, with a start offset per video
//! - A readiness barrier gating every transport command
//! - A state machine reconciling per-video events into one global state
//! - Plugin hooks for timeline bars, scrubbers and other observers
//! - Hosting backends resolved from a static registry
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Split Player                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Adapter    │  │   Adapter    │  │   Adapter    │  ...      │
//! │  │  (backend)   │  │  (backend)   │  │  (backend)   │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │    normalized signals (event channel)                 │
//! │         └─────────────────┼─────────────────┘                   │
//! │                    ┌──────┴──────┐   ┌──────────────┐           │
//! │                    │    State    │───│  Readiness   │           │
//! │                    │   Machine   │   │   Barrier    │           │
//! │                    └──────┬──────┘   └──────────────┘           │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐            │
//! │  │    Update    │  │   Plugin    │  │   Timeline   │            │
//! │  │    Ticker    │  │     Bus     │──│  TimePicker  │            │
//! │  └──────────────┘  └─────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod adapter;
pub mod backend;
pub mod barrier;
pub mod plugin;
pub mod ticker;
pub mod player;
pub mod timeline;

pub use error::{CommandOutcome, Error, Rejection, Result};
pub use types::*;
pub use config::PlayerConfig;
pub use adapter::{forward_native_state, AdapterContext, EventSink, VideoAdapter};
pub use backend::{Backend, BackendRegistry, RegisteredBackend};
#[cfg(feature = "simulated")]
pub use backend::{LogEntry, SimulatedBackend, SimulationLog, SIMULATED_BACKEND_ID};
pub use barrier::ReadinessBarrier;
pub use plugin::{Hook, HookSet, PlayerSnapshot, Plugin, PluginBus};
pub use ticker::UpdateTicker;
pub use player::{PlayerCommand, PlayerEvent, PlayerHandle, SplitPlayer};
pub use timeline::{format_time, TimePicker, TimePreview, Timeline, TimelineFrame, TimelineModule};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library
pub fn init() {
    tracing::info!(version = VERSION, "Split Player Core initialized");
}
