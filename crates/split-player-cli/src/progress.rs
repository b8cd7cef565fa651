//! Terminal progress bar fed by the timeline plugin

use indicatif::{ProgressBar, ProgressStyle};
use split_player_core::{format_time, TimelineFrame, TimelineModule};

/// Timeline module drawing the shared timeline as a progress bar
pub struct ProgressModule {
    bar: ProgressBar,
}

impl ProgressModule {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::with_template("{bar:40.magenta/blue} {pos:>3}% {msg}") {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }

    /// Handle for finishing the bar once the run ends
    pub fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }
}

impl TimelineModule for ProgressModule {
    fn on_frame(&mut self, frame: &TimelineFrame) {
        self.bar.set_position(frame.progress_percent.round() as u64);
        self.bar.set_message(format!(
            "{} / {}",
            format_time(frame.played_time),
            format_time(frame.duration)
        ));
    }
}
