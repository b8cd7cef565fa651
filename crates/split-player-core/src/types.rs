//! Core types for Split Player

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one video entry owned by a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Global player state.
///
/// The discriminants are the numeric codes used by embed hosts, returned by
/// [`PlayerState::code`]. Serialized forms use the snake_case names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i8)]
pub enum PlayerState {
    /// Stopped, or never started
    Unstarted = -1,
    /// The shared timeline reached its end
    Ended = 0,
    /// All videos are playing
    Playing = 1,
    /// All videos are paused
    Paused = 2,
    /// A video reported buffering
    Buffering = 3,
    /// Dependencies loaded, waiting for every video to become ready
    Loading = 6,
}

impl PlayerState {
    /// Numeric state code
    pub fn code(&self) -> i8 {
        *self as i8
    }

    /// Parse a numeric state code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(PlayerState::Unstarted),
            0 => Some(PlayerState::Ended),
            1 => Some(PlayerState::Playing),
            2 => Some(PlayerState::Paused),
            3 => Some(PlayerState::Buffering),
            6 => Some(PlayerState::Loading),
            _ => None,
        }
    }

    /// Whether the update ticker should be running in this state
    pub fn is_active(&self) -> bool {
        matches!(self, PlayerState::Playing)
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerState::Unstarted => write!(f, "unstarted"),
            PlayerState::Ended => write!(f, "ended"),
            PlayerState::Playing => write!(f, "playing"),
            PlayerState::Paused => write!(f, "paused"),
            PlayerState::Buffering => write!(f, "buffering"),
            PlayerState::Loading => write!(f, "loading"),
        }
    }
}

/// A video as declared in configuration: which embed to load and where its
/// shared timeline starts.
///
/// Equality is by value; `remove_video` locates entries with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDescriptor {
    /// Backend-specific video identifier, also the embed key under the mount
    pub video_id: String,
    /// Native time that maps to 0 on the shared timeline
    #[serde(default)]
    pub start_seconds: f64,
}

impl VideoDescriptor {
    pub fn new(video_id: impl Into<String>, start_seconds: f64) -> Self {
        Self {
            video_id: video_id.into(),
            start_seconds,
        }
    }
}

impl VideoDescriptor {
    /// Check for values no adapter can seek with
    pub fn validate(&self) -> Result<()> {
        if self.video_id.is_empty() {
            return Err(Error::InvalidConfig("videoId must not be empty".to_string()));
        }
        if !self.start_seconds.is_finite() || self.start_seconds < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "startSeconds of {} must be a non-negative number",
                self.video_id
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for VideoDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}s", self.video_id, self.start_seconds)
    }
}

/// State reported by a hosting backend for one embed, before normalization.
///
/// Codes follow the common embed convention: -1 unstarted, 0 ended,
/// 1 playing, 2 paused, 3 buffering, 5 cued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativeState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
    Other(i32),
}

impl NativeState {
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 => NativeState::Unstarted,
            0 => NativeState::Ended,
            1 => NativeState::Playing,
            2 => NativeState::Paused,
            3 => NativeState::Buffering,
            5 => NativeState::Cued,
            other => NativeState::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            NativeState::Unstarted => -1,
            NativeState::Ended => 0,
            NativeState::Playing => 1,
            NativeState::Paused => 2,
            NativeState::Buffering => 3,
            NativeState::Cued => 5,
            NativeState::Other(code) => *code,
        }
    }

    /// Normalized player state for this native state, if it is one the
    /// player reacts to
    pub fn normalize(&self) -> Option<PlayerState> {
        match self {
            NativeState::Buffering => Some(PlayerState::Buffering),
            NativeState::Playing => Some(PlayerState::Playing),
            NativeState::Paused => Some(PlayerState::Paused),
            NativeState::Ended => Some(PlayerState::Ended),
            NativeState::Unstarted | NativeState::Cued | NativeState::Other(_) => None,
        }
    }
}

impl std::str::FromStr for NativeState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unstarted" => Ok(NativeState::Unstarted),
            "ended" => Ok(NativeState::Ended),
            "playing" => Ok(NativeState::Playing),
            "paused" => Ok(NativeState::Paused),
            "buffering" => Ok(NativeState::Buffering),
            "cued" => Ok(NativeState::Cued),
            other => other
                .parse::<i32>()
                .map(NativeState::from_code)
                .map_err(|_| format!("unknown native state '{}'", other)),
        }
    }
}

/// Normalized signal sent from an adapter to its player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum AdapterSignal {
    /// The embed finished initializing
    Ready,
    /// The embed changed state
    StateChange { state: PlayerState },
}

/// Transport command issued to one adapter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AdapterCommand {
    Create,
    Play,
    Pause,
    SeekTo { seconds: f64 },
    Remove,
}

impl std::fmt::Display for AdapterCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterCommand::Create => write!(f, "create"),
            AdapterCommand::Play => write!(f, "play"),
            AdapterCommand::Pause => write!(f, "pause"),
            AdapterCommand::SeekTo { seconds } => write!(f, "seek_to({})", seconds),
            AdapterCommand::Remove => write!(f, "remove"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_state_codes() {
        for state in [
            PlayerState::Unstarted,
            PlayerState::Ended,
            PlayerState::Playing,
            PlayerState::Paused,
            PlayerState::Buffering,
            PlayerState::Loading,
        ] {
            assert_eq!(PlayerState::from_code(state.code() as i32), Some(state));
        }
        assert_eq!(PlayerState::Loading.code(), 6);
        assert_eq!(PlayerState::Unstarted as i8, -1);
        assert_eq!(PlayerState::from_code(4), None);
        assert_eq!(
            serde_json::to_string(&PlayerState::Unstarted).unwrap(),
            "\"unstarted\""
        );
    }

    #[test]
    fn test_descriptor_validation() {
        assert!(VideoDescriptor::new("a", 0.0).validate().is_ok());
        assert!(VideoDescriptor::new("a", 12.5).validate().is_ok());

        for start in [f64::NAN, f64::INFINITY, -1.0] {
            let err = VideoDescriptor::new("a", start).validate().unwrap_err();
            assert_eq!(err.error_code(), "INVALID_CONFIG");
        }
        assert!(VideoDescriptor::new("", 0.0).validate().is_err());
    }

    #[test]
    fn test_native_normalization() {
        assert_eq!(NativeState::Buffering.normalize(), Some(PlayerState::Buffering));
        assert_eq!(NativeState::Ended.normalize(), Some(PlayerState::Ended));
        assert_eq!(NativeState::Cued.normalize(), None);
        assert_eq!(NativeState::from_code(42).normalize(), None);
    }

    #[test]
    fn test_native_from_str() {
        assert_eq!("Playing".parse::<NativeState>(), Ok(NativeState::Playing));
        assert_eq!("5".parse::<NativeState>(), Ok(NativeState::Cued));
        assert_eq!("7".parse::<NativeState>(), Ok(NativeState::Other(7)));
        assert!("rewinding".parse::<NativeState>().is_err());
    }

    #[test]
    fn test_descriptor_wire_format() {
        let video: VideoDescriptor =
            serde_json::from_str(r#"{"videoId":"abc","startSeconds":5}"#).unwrap();
        assert_eq!(video, VideoDescriptor::new("abc", 5.0));

        let video: VideoDescriptor = serde_json::from_str(r#"{"videoId":"xyz"}"#).unwrap();
        assert_eq!(video.start_seconds, 0.0);
    }
}
