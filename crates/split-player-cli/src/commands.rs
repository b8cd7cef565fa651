//! CLI command implementations

use crate::output::{json_line, table, OutputFormat};
use crate::progress::ProgressModule;
use crate::script::{self, Step};
use anyhow::Context;
use chrono::{DateTime, Utc};
use console::style;
use indicatif::ProgressBar;
use serde::Serialize;
use split_player_core::{
    format_time, BackendRegistry, CommandOutcome, LogEntry, PlayerConfig, PlayerState,
    SimulatedBackend, SplitPlayer, Timeline, TimelineFrame, VideoDescriptor,
    SIMULATED_BACKEND_ID,
};
use std::path::Path;
use std::time::Duration;
use tabled::Tabled;
use tokio::sync::watch;
use tracing::{info, warn};

fn display_seconds(seconds: &f64) -> String {
    format_time(*seconds)
}

fn display_clock(at: &DateTime<Utc>) -> String {
    at.format("%H:%M:%S%.3f").to_string()
}

#[derive(Debug, Serialize, Tabled)]
struct ConfiguredVideo {
    #[tabled(rename = "#")]
    index: usize,
    video: String,
    #[tabled(rename = "start (s)")]
    start_seconds: f64,
    /// Beyond `maxVideos`; dropped when the player loads
    dropped: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    config: &'a PlayerConfig,
    backend_registered: bool,
    dropped_videos: usize,
}

/// Validate a player configuration
pub fn check(config_path: &Path, format: &str) -> anyhow::Result<()> {
    let config = PlayerConfig::from_path(config_path)
        .with_context(|| format!("invalid configuration {}", config_path.display()))?;
    let registry = BackendRegistry::with_defaults();
    let backend_registered = registry.contains(&config.hoster);
    let dropped_videos = config.videos.len().saturating_sub(config.max_videos);

    let videos: Vec<ConfiguredVideo> = config
        .videos
        .iter()
        .enumerate()
        .map(|(index, video)| ConfiguredVideo {
            index: index + 1,
            video: video.video_id.clone(),
            start_seconds: video.start_seconds,
            dropped: index >= config.max_videos,
        })
        .collect();

    match OutputFormat::from(format) {
        OutputFormat::Json => {
            let report = CheckReport {
                config: &config,
                backend_registered,
                dropped_videos,
            };
            println!("{}", json_line(&report));
        }
        OutputFormat::Table => println!("{}", table(videos)),
        OutputFormat::Text => {
            println!("Configuration: {}", config_path.display());
            println!("  Hoster: {}", config.hoster);
            println!("  Area: {}", config.area.as_deref().unwrap_or("(none)"));
            println!("  Max videos: {}", config.max_videos);
            println!("  Update interval: {}ms", config.update_interval_ms);
            println!("\nVideos:");
            for video in &videos {
                let note = if video.dropped { " (dropped)" } else { "" };
                println!(
                    "  {}. {} from {}s{}",
                    video.index, video.video, video.start_seconds, note
                );
            }
            println!();

            if !backend_registered {
                println!(
                    "{} no backend registered for '{}' (available: {})",
                    style("warning:").yellow().bold(),
                    config.hoster,
                    registry.ids().join(", ")
                );
            }
            if dropped_videos > 0 {
                println!(
                    "{} {} video(s) beyond maxVideos will be dropped",
                    style("warning:").yellow().bold(),
                    dropped_videos
                );
            }
            println!("{}", style("Configuration valid").green());
        }
    }

    if !backend_registered {
        warn!(hoster = %config.hoster, "Hoster has no registered backend");
    }
    Ok(())
}

/// Options of the `simulate` command
#[derive(Debug, Default)]
pub struct SimulateOptions {
    /// `id=seconds` native duration overrides
    pub durations: Vec<String>,
    /// Embeds wait for a `ready` step instead of initializing at once
    pub manual_ready: bool,
    /// Draw the shared timeline as a progress bar
    pub progress: bool,
}

/// Result of one executed script step
#[derive(Debug, Serialize, Tabled)]
struct StepRecord {
    #[tabled(rename = "#")]
    step: usize,
    #[tabled(display_with = "display_clock")]
    at: DateTime<Utc>,
    command: String,
    outcome: String,
    state: PlayerState,
    #[tabled(display_with = "display_seconds")]
    played_time: f64,
    ready: String,
}

#[derive(Debug, Serialize, Tabled)]
struct VideoStatus {
    video: String,
    start: f64,
    #[tabled(display_with = "display_seconds")]
    played: f64,
    playing: bool,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    state: PlayerState,
    duration: f64,
    played_time: f64,
    ready: usize,
    videos: Vec<VideoStatus>,
}

#[derive(Debug, Serialize)]
struct SessionSummary {
    state: PlayerState,
    duration: f64,
    played_time: f64,
    progress_percent: f64,
    steps: usize,
    adapter_commands: usize,
    elapsed_ms: i64,
}

/// A scripted run against the simulated backend
struct Session {
    player: SplitPlayer,
    backend: SimulatedBackend,
    frames: watch::Receiver<TimelineFrame>,
    format: OutputFormat,
    bar: Option<ProgressBar>,
    records: Vec<StepRecord>,
    started: DateTime<Utc>,
}

impl Session {
    fn emit(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{}", line),
        }
    }

    fn ready_label(&self) -> String {
        format!("{}/{}", self.player.ready_count(), self.player.video_count())
    }

    async fn execute(&mut self, step: &Step) -> String {
        match step {
            Step::Play => self.player.play().to_string(),
            Step::Pause => self.player.pause().to_string(),
            Step::Stop => self.player.stop().to_string(),
            Step::Seek(time) => {
                self.player.time_to(*time);
                CommandOutcome::Applied.to_string()
            }
            Step::Wait(ms) => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                format!("{} event(s)", self.player.process_pending())
            }
            Step::Advance(seconds) => {
                self.backend.advance(*seconds);
                self.player.process_pending();
                if self.player.is_ticking() {
                    self.player.update();
                }
                format!("{}s simulated", seconds)
            }
            Step::Event { video_id, state } => match self.backend.emit_native(video_id, *state) {
                Ok(Some(normalized)) => format!("forwarded as {}", normalized),
                Ok(None) => "dropped".to_string(),
                Err(e) => format!("failed: {}", e),
            },
            Step::Ready(video_id) => match self.backend.mark_ready(video_id) {
                Ok(()) => "signalled".to_string(),
                Err(e) => format!("failed: {}", e),
            },
            Step::Add(video) => match self.player.add_video(video.clone()) {
                Ok(outcome) => outcome.to_string(),
                Err(e) => format!("failed: {}", e),
            },
            Step::Remove(video) => self.player.remove_video(video).to_string(),
            Step::Status => {
                self.report_status();
                "reported".to_string()
            }
        }
    }

    fn video_status(&self, video: &VideoDescriptor) -> VideoStatus {
        let native = self.backend.position(&video.video_id).unwrap_or(0.0);
        VideoStatus {
            video: video.video_id.clone(),
            start: video.start_seconds,
            played: (native - video.start_seconds).max(0.0),
            playing: self.backend.is_playing(&video.video_id),
        }
    }

    fn report_status(&self) {
        let videos: Vec<VideoStatus> = self
            .player
            .videos()
            .map(|video| self.video_status(video))
            .collect();

        match self.format {
            OutputFormat::Json => {
                let report = StatusReport {
                    state: self.player.state(),
                    duration: self.player.duration(),
                    played_time: self.player.played_time(),
                    ready: self.player.ready_count(),
                    videos,
                };
                self.emit(json_line(&report));
            }
            OutputFormat::Text | OutputFormat::Table => self.emit(table(videos)),
        }
    }

    fn record(&mut self, step: usize, command: String, outcome: String) {
        let record = StepRecord {
            step,
            at: Utc::now(),
            command,
            outcome,
            state: self.player.state(),
            played_time: self.player.played_time(),
            ready: self.ready_label(),
        };

        match self.format {
            OutputFormat::Json => self.emit(json_line(&record)),
            OutputFormat::Text => {
                let outcome = if record.outcome.starts_with("ignored")
                    || record.outcome.starts_with("failed")
                {
                    style(record.outcome.as_str()).yellow()
                } else {
                    style(record.outcome.as_str()).green()
                };
                self.emit(format!(
                    "[{}] {:>3} {:<24} {} ({}, {}, ready {})",
                    display_clock(&record.at),
                    record.step,
                    record.command,
                    outcome,
                    style(record.state).cyan(),
                    format_time(record.played_time),
                    record.ready
                ));
            }
            OutputFormat::Table => {}
        }
        self.records.push(record);
    }

    fn finish(self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }

        let adapter_commands = self
            .backend
            .log()
            .entries()
            .iter()
            .filter(|entry| matches!(entry, LogEntry::Command { .. }))
            .count();
        let summary = SessionSummary {
            state: self.player.state(),
            duration: self.player.duration(),
            played_time: self.player.played_time(),
            progress_percent: self.frames.borrow().progress_percent,
            steps: self.records.len().saturating_sub(1),
            adapter_commands,
            elapsed_ms: (Utc::now() - self.started).num_milliseconds(),
        };
        info!(state = %summary.state, steps = summary.steps, "Simulation finished");

        match self.format {
            OutputFormat::Json => println!("{}", json_line(&summary)),
            OutputFormat::Table => {
                println!("{}", table(self.records));
                print_summary(&summary);
            }
            OutputFormat::Text => {
                println!();
                print_summary(&summary);
            }
        }
    }
}

fn print_summary(summary: &SessionSummary) {
    println!("Simulation Summary:");
    println!("  Final state: {}", style(summary.state).cyan().bold());
    println!(
        "  Timeline: {} / {} ({:.1}%)",
        format_time(summary.played_time),
        format_time(summary.duration),
        summary.progress_percent
    );
    println!("  Steps: {}", summary.steps);
    println!("  Adapter commands: {}", summary.adapter_commands);
    println!("  Elapsed: {}ms", summary.elapsed_ms);
}

/// Run a script against the simulated backend
pub async fn simulate(
    config_path: &Path,
    script_path: &Path,
    options: SimulateOptions,
    format: &str,
) -> anyhow::Result<()> {
    let mut config = PlayerConfig::from_path(config_path)
        .with_context(|| format!("invalid configuration {}", config_path.display()))?;
    let steps = script::load(script_path)?;
    let format = OutputFormat::from(format);

    if config.hoster != SIMULATED_BACKEND_ID {
        info!(hoster = %config.hoster, "Hoster replaced by the simulated backend");
        config.hoster = SIMULATED_BACKEND_ID.to_string();
    }

    let mut backend = SimulatedBackend::new().with_echo();
    for arg in &options.durations {
        let (video_id, seconds) = script::parse_duration(arg)?;
        backend = backend.with_duration(video_id, seconds);
    }
    if options.manual_ready {
        backend = backend.with_manual_ready();
    }

    let mut registry = BackendRegistry::new();
    registry.register(backend.clone());
    let mut player = SplitPlayer::new(config, &registry)?;

    let (mut timeline, frames) = Timeline::new();
    let bar = if options.progress && format == OutputFormat::Text {
        let module = ProgressModule::new();
        let bar = module.bar();
        timeline.extend(module);
        Some(bar)
    } else {
        None
    };
    player.add_plugin(timeline);

    player.load_dependencies().await?;
    player.process_pending();

    let mut session = Session {
        player,
        backend,
        frames,
        format,
        bar,
        records: Vec::new(),
        started: Utc::now(),
    };
    session.record(0, "load".to_string(), CommandOutcome::Applied.to_string());

    for (index, step) in steps.iter().enumerate() {
        let outcome = session.execute(step).await;
        session.player.process_pending();
        session.record(index + 1, step.to_string(), outcome);
    }

    session.finish();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use split_player_core::NativeState;

    async fn session(videos: &[(&str, f64)]) -> Session {
        let backend = SimulatedBackend::new()
            .with_duration("long", 90.0)
            .with_echo();
        let mut registry = BackendRegistry::new();
        registry.register(backend.clone());
        let config = PlayerConfig::new(
            SIMULATED_BACKEND_ID,
            videos
                .iter()
                .map(|(id, start)| VideoDescriptor::new(*id, *start))
                .collect(),
        );
        let mut player = SplitPlayer::new(config, &registry).unwrap();
        let (timeline, frames) = Timeline::new();
        player.add_plugin(timeline);
        player.load_dependencies().await.unwrap();
        player.process_pending();

        Session {
            player,
            backend,
            frames,
            format: OutputFormat::Json,
            bar: None,
            records: Vec::new(),
            started: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_steps_drive_player() {
        let mut session = session(&[("short", 0.0), ("long", 0.0)]).await;

        assert_eq!(session.execute(&Step::Play).await, "applied");
        session.player.process_pending();
        assert_eq!(session.player.state(), PlayerState::Playing);

        assert_eq!(session.execute(&Step::Play).await, "ignored: already playing");

        session.execute(&Step::Advance(30.0)).await;
        assert_eq!(session.player.played_time(), 30.0);
        assert_eq!(session.frames.borrow().progress_percent, 100.0 / 3.0);

        let outcome = session
            .execute(&Step::Event {
                video_id: "long".to_string(),
                state: NativeState::Cued,
            })
            .await;
        assert_eq!(outcome, "dropped");

        let outcome = session
            .execute(&Step::Event {
                video_id: "missing".to_string(),
                state: NativeState::Paused,
            })
            .await;
        assert!(outcome.starts_with("failed"));
    }

    #[tokio::test]
    async fn test_records_capture_state() {
        let mut session = session(&[("long", 5.0)]).await;
        let outcome = session.execute(&Step::Pause).await;
        session.record(1, "pause".to_string(), outcome);

        let record = &session.records[0];
        assert_eq!(record.state, PlayerState::Loading);
        assert_eq!(record.ready, "1/1");
        assert_eq!(record.outcome, "ignored: not playing (loading)");
    }
}
