//! Plugin hook bus
//!
//! Plugins observe the player at fixed lifecycle points. They get a read-only
//! [`PlayerSnapshot`] with every hook and cannot drive transitions; a plugin
//! that needs to seek or play does it through a
//! [`PlayerHandle`](crate::player::PlayerHandle) like any other consumer.

use crate::types::PlayerState;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Lifecycle point a plugin can observe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    /// Every video completed its ready handshake
    Ready,
    /// Update tick while playing
    Update,
    Play,
    Pause,
    Stop,
}

impl Hook {
    fn bit(self) -> u8 {
        match self {
            Hook::Ready => 1 << 0,
            Hook::Update => 1 << 1,
            Hook::Play => 1 << 2,
            Hook::Pause => 1 << 3,
            Hook::Stop => 1 << 4,
        }
    }
}

impl std::fmt::Display for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hook::Ready => write!(f, "on_ready"),
            Hook::Update => write!(f, "on_update"),
            Hook::Play => write!(f, "on_play"),
            Hook::Pause => write!(f, "on_pause"),
            Hook::Stop => write!(f, "on_stop"),
        }
    }
}

/// Set of hooks a plugin implements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HookSet(u8);

impl HookSet {
    pub const NONE: HookSet = HookSet(0);
    pub const ALL: HookSet = HookSet(0b1_1111);

    pub fn of(hooks: &[Hook]) -> Self {
        hooks.iter().fold(Self::NONE, |set, hook| set.with(*hook))
    }

    pub fn with(self, hook: Hook) -> Self {
        HookSet(self.0 | hook.bit())
    }

    pub fn contains(&self, hook: Hook) -> bool {
        self.0 & hook.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Read-only view of the player handed to every hook
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub state: PlayerState,
    /// Longest effective video duration reported so far
    pub duration: f64,
    /// Position of the canonical position source
    pub played_time: f64,
    pub videos: usize,
    pub ready: usize,
}

impl PlayerSnapshot {
    pub fn all_ready(&self) -> bool {
        self.ready == self.videos
    }
}

/// An observer of player lifecycle points.
///
/// Every hook defaults to a no-op. The bus only invokes the hooks listed by
/// [`Plugin::hooks`].
pub trait Plugin: Send {
    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Hooks this plugin implements
    fn hooks(&self) -> HookSet;

    fn on_ready(&mut self, _player: &PlayerSnapshot) {}

    fn on_update(&mut self, _player: &PlayerSnapshot) {}

    fn on_play(&mut self, _player: &PlayerSnapshot) {}

    fn on_pause(&mut self, _player: &PlayerSnapshot) {}

    fn on_stop(&mut self, _player: &PlayerSnapshot) {}
}

/// Ordered plugin registry. Registration order is notification order and
/// plugins are never removed.
#[derive(Default)]
pub struct PluginBus {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin, returning its position in notification order
    pub fn add(&mut self, plugin: Box<dyn Plugin>) -> usize {
        self.plugins.push(plugin);
        self.plugins.len() - 1
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Invoke `hook` on every plugin that implements it, in registration
    /// order
    pub fn notify(&mut self, hook: Hook, player: &PlayerSnapshot) {
        for plugin in self.plugins.iter_mut() {
            if !plugin.hooks().contains(hook) {
                continue;
            }
            trace!(plugin = plugin.name(), %hook, "Plugin hook");
            match hook {
                Hook::Ready => plugin.on_ready(player),
                Hook::Update => plugin.on_update(player),
                Hook::Play => plugin.on_play(player),
                Hook::Pause => plugin.on_pause(player),
                Hook::Stop => plugin.on_stop(player),
            }
        }
    }
}

impl std::fmt::Debug for PluginBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|plugin| plugin.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        label: &'static str,
        hooks: HookSet,
        seen: Arc<Mutex<Vec<(&'static str, Hook)>>>,
    }

    impl Recorder {
        fn record(&self, hook: Hook) {
            self.seen.lock().unwrap().push((self.label, hook));
        }
    }

    impl Plugin for Recorder {
        fn hooks(&self) -> HookSet {
            self.hooks
        }

        fn on_ready(&mut self, _player: &PlayerSnapshot) {
            self.record(Hook::Ready);
        }

        fn on_play(&mut self, _player: &PlayerSnapshot) {
            self.record(Hook::Play);
        }

        fn on_stop(&mut self, _player: &PlayerSnapshot) {
            self.record(Hook::Stop);
        }
    }

    fn snapshot() -> PlayerSnapshot {
        PlayerSnapshot {
            state: PlayerState::Loading,
            duration: 0.0,
            played_time: 0.0,
            videos: 0,
            ready: 0,
        }
    }

    #[test]
    fn test_hook_set() {
        let set = HookSet::of(&[Hook::Ready, Hook::Stop]);
        assert!(set.contains(Hook::Ready));
        assert!(set.contains(Hook::Stop));
        assert!(!set.contains(Hook::Update));
        assert!(HookSet::NONE.is_empty());
        assert!(HookSet::ALL.contains(Hook::Pause));
    }

    #[test]
    fn test_notification_order_and_skipping() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = PluginBus::new();
        bus.add(Box::new(Recorder {
            label: "first",
            hooks: HookSet::of(&[Hook::Play]),
            seen: seen.clone(),
        }));
        bus.add(Box::new(Recorder {
            label: "second",
            hooks: HookSet::ALL,
            seen: seen.clone(),
        }));

        bus.notify(Hook::Ready, &snapshot());
        bus.notify(Hook::Play, &snapshot());
        bus.notify(Hook::Pause, &snapshot());

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("second", Hook::Ready),
                ("first", Hook::Play),
                ("second", Hook::Play),
            ]
        );
    }

    #[test]
    fn test_undeclared_hook_not_invoked() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = PluginBus::new();
        bus.add(Box::new(Recorder {
            label: "silent",
            hooks: HookSet::NONE,
            seen: seen.clone(),
        }));

        bus.notify(Hook::Stop, &snapshot());
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(bus.len(), 1);
    }
}
