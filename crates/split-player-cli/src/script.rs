//! Simulation script parsing
//!
//! One step per line, `#` starts a comment:
//!
//! ```text
//! play
//! wait 600          # milliseconds, ticks are delivered
//! advance 12.5      # simulated seconds on every playing embed
//! event cam-2 buffering
//! seek 30
//! add cam-4 2.5
//! remove cam-1
//! status
//! ```

use anyhow::{anyhow, bail, Context};
use split_player_core::{NativeState, VideoDescriptor};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// One script step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Play,
    Pause,
    Stop,
    Seek(f64),
    /// Real time in milliseconds
    Wait(u64),
    /// Simulated embed time in seconds
    Advance(f64),
    /// Native event injected into one embed
    Event { video_id: String, state: NativeState },
    /// Finish initializing an embed (with `--manual-ready`)
    Ready(String),
    Add(VideoDescriptor),
    Remove(VideoDescriptor),
    Status,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Play => write!(f, "play"),
            Step::Pause => write!(f, "pause"),
            Step::Stop => write!(f, "stop"),
            Step::Seek(time) => write!(f, "seek {}", time),
            Step::Wait(ms) => write!(f, "wait {}", ms),
            Step::Advance(seconds) => write!(f, "advance {}", seconds),
            Step::Event { video_id, state } => write!(f, "event {} {:?}", video_id, state),
            Step::Ready(video_id) => write!(f, "ready {}", video_id),
            Step::Add(video) => write!(f, "add {}", video),
            Step::Remove(video) => write!(f, "remove {}", video),
            Step::Status => write!(f, "status"),
        }
    }
}

fn number<T: FromStr>(verb: &str, arg: Option<&str>) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let arg = arg.ok_or_else(|| anyhow!("'{}' needs an argument", verb))?;
    arg.parse()
        .with_context(|| format!("invalid argument for '{}': {}", verb, arg))
}

fn descriptor(verb: &str, id: Option<&str>, start: Option<&str>) -> anyhow::Result<VideoDescriptor> {
    let id = id.ok_or_else(|| anyhow!("'{}' needs a video id", verb))?;
    let start = match start {
        Some(start) => number::<f64>(verb, Some(start))?,
        None => 0.0,
    };
    Ok(VideoDescriptor::new(id, start))
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or_else(|| anyhow!("empty step"))?;
        let first = words.next();
        let second = words.next();

        let step = match verb.to_lowercase().as_str() {
            "play" => Step::Play,
            "pause" => Step::Pause,
            "stop" => Step::Stop,
            "seek" => Step::Seek(number(verb, first)?),
            "wait" => Step::Wait(number(verb, first)?),
            "advance" => Step::Advance(number(verb, first)?),
            "event" => {
                let video_id = first.ok_or_else(|| anyhow!("'event' needs a video id"))?;
                let state = second
                    .ok_or_else(|| anyhow!("'event' needs a state"))?
                    .parse::<NativeState>()
                    .map_err(|e| anyhow!(e))?;
                Step::Event {
                    video_id: video_id.to_string(),
                    state,
                }
            }
            "ready" => Step::Ready(
                first
                    .ok_or_else(|| anyhow!("'ready' needs a video id"))?
                    .to_string(),
            ),
            "add" => Step::Add(descriptor(verb, first, second)?),
            "remove" => Step::Remove(descriptor(verb, first, second)?),
            "status" => Step::Status,
            other => bail!("unknown step '{}'", other),
        };
        Ok(step)
    }
}

/// Parse a whole script
pub fn parse(source: &str) -> anyhow::Result<Vec<Step>> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.split('#').next().unwrap_or("").trim();
            (!line.is_empty()).then_some((index + 1, line))
        })
        .map(|(number, line)| {
            line.parse::<Step>()
                .with_context(|| format!("line {}: {}", number, line))
        })
        .collect()
}

pub fn load(path: &Path) -> anyhow::Result<Vec<Step>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    parse(&source)
}

/// Parse a `--duration id=seconds` override
pub fn parse_duration(arg: &str) -> anyhow::Result<(String, f64)> {
    let (id, seconds) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("expected ID=SECONDS, got '{}'", arg))?;
    let seconds: f64 = seconds
        .trim()
        .parse()
        .with_context(|| format!("invalid duration '{}'", seconds))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        bail!("duration for '{}' must be positive", id);
    }
    Ok((id.trim().to_string(), seconds))
}
