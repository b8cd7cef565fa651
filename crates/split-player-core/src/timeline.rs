//! Timeline progress plugin and time picker
//!
//! [`Timeline`] turns player hooks into [`TimelineFrame`]s (rendered flag and
//! progress percentage) published on a watch channel, for whatever draws the
//! actual bar. [`TimePicker`] is the scrubber side: it previews times for a
//! pointer position and seeks the player through a [`PlayerHandle`].

use crate::{
    player::PlayerHandle,
    plugin::{Hook, HookSet, PlayerSnapshot, Plugin},
    Result,
};
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

/// Format seconds as `m:ss`
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Progress state of the timeline bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimelineFrame {
    /// The bar has been rendered (all videos became ready)
    pub rendered: bool,
    /// Bar width in percent of the shared timeline
    pub progress_percent: f64,
    pub played_time: f64,
    pub duration: f64,
}

/// Extension module of a timeline, called with every published frame
pub trait TimelineModule: Send {
    fn on_frame(&mut self, frame: &TimelineFrame);
}

/// Timeline progress plugin
pub struct Timeline {
    frame_tx: watch::Sender<TimelineFrame>,
    modules: Vec<Box<dyn TimelineModule>>,
}

impl Timeline {
    pub fn new() -> (Self, watch::Receiver<TimelineFrame>) {
        let (frame_tx, frame_rx) = watch::channel(TimelineFrame::default());
        let timeline = Self {
            frame_tx,
            modules: Vec::new(),
        };
        (timeline, frame_rx)
    }

    pub fn subscribe(&self) -> watch::Receiver<TimelineFrame> {
        self.frame_tx.subscribe()
    }

    /// Attach an extension module
    pub fn extend<M: TimelineModule + 'static>(&mut self, module: M) -> usize {
        self.modules.push(Box::new(module));
        self.modules.len() - 1
    }

    pub fn frame(&self) -> TimelineFrame {
        *self.frame_tx.borrow()
    }

    fn publish(&mut self, frame: TimelineFrame) {
        for module in self.modules.iter_mut() {
            module.on_frame(&frame);
        }
        self.frame_tx.send_replace(frame);
    }

    fn render(&mut self, player: &PlayerSnapshot) {
        debug!(duration = player.duration, "Timeline rendered");
        self.publish(TimelineFrame {
            rendered: true,
            progress_percent: 0.0,
            played_time: 0.0,
            duration: player.duration,
        });
    }

    fn reset(&mut self, player: &PlayerSnapshot) {
        let frame = TimelineFrame {
            progress_percent: 0.0,
            played_time: 0.0,
            duration: player.duration,
            ..self.frame()
        };
        self.publish(frame);
    }
}

impl Plugin for Timeline {
    fn name(&self) -> &str {
        "timeline"
    }

    fn hooks(&self) -> HookSet {
        HookSet::of(&[Hook::Ready, Hook::Update, Hook::Stop])
    }

    fn on_ready(&mut self, player: &PlayerSnapshot) {
        self.render(player);
    }

    fn on_update(&mut self, player: &PlayerSnapshot) {
        let progress_percent = if player.duration > 0.0 {
            (player.played_time * 100.0 / player.duration).clamp(0.0, 100.0)
        } else {
            0.0
        };
        let frame = TimelineFrame {
            progress_percent,
            played_time: player.played_time,
            duration: player.duration,
            ..self.frame()
        };
        self.publish(frame);
    }

    fn on_stop(&mut self, player: &PlayerSnapshot) {
        self.reset(player);
    }
}

/// Time shown for a pointer hovering the scrubber
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePreview {
    /// Width of the preview line in percent
    pub percent: f64,
    /// Time under the pointer, rounded to whole percents of the duration
    pub time: f64,
    pub label: String,
}

/// Scrubber model: picks a time and seeks the player to it
#[derive(Debug)]
pub struct TimePicker {
    player: PlayerHandle,
    frames: watch::Receiver<TimelineFrame>,
    picked: f64,
}

impl TimePicker {
    pub fn new(player: PlayerHandle, frames: watch::Receiver<TimelineFrame>) -> Self {
        Self {
            player,
            frames,
            picked: 0.0,
        }
    }

    pub fn duration(&self) -> f64 {
        self.frames.borrow().duration
    }

    pub fn picked(&self) -> f64 {
        self.picked
    }

    /// Duration label
    pub fn duration_label(&self) -> String {
        format_time(self.duration())
    }

    /// Current time label
    pub fn current_label(&self) -> String {
        format_time(self.frames.borrow().played_time)
    }

    /// Preview for a pointer at `fraction` (0..=1) of the scrubber width
    pub fn preview(&self, fraction: f64) -> TimePreview {
        let percent = (fraction * 100.0).clamp(0.0, 100.0);
        let time = self.duration() / 100.0 * percent.round();
        TimePreview {
            percent,
            time,
            label: format_time(time),
        }
    }

    /// Scrubber input changed
    pub fn input(&mut self, time: f64) {
        self.picked = time.clamp(0.0, self.duration().max(0.0));
    }

    /// Seek the player to the picked time
    pub fn commit(&self) -> Result<()> {
        debug!(time = self.picked, "Time picked");
        self.player.time_to(self.picked)
    }
}
