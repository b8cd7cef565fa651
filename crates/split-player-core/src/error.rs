//! Error types for Split Player Core

use crate::types::PlayerState;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Backend errors
    #[error("Unknown hosting backend: {hoster}")]
    UnknownBackend { hoster: String },

    #[error("Failed to load backend dependencies for {hoster}: {reason}")]
    DependencyLoad { hoster: String, reason: String },

    #[error("Backend failure: {0}")]
    Backend(String),

    #[error("Unknown video: {video_id}")]
    UnknownVideo { video_id: String },

    #[error("Player is no longer running")]
    PlayerClosed,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::DependencyLoad { .. } | Error::Io(_))
    }

    /// Returns the error code for diagnostics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::UnknownBackend { .. } => "UNKNOWN_BACKEND",
            Error::DependencyLoad { .. } => "DEPENDENCY_LOAD",
            Error::Backend(_) => "BACKEND",
            Error::UnknownVideo { .. } => "UNKNOWN_VIDEO",
            Error::PlayerClosed => "PLAYER_CLOSED",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::ConfigParse(_) => "CONFIG_PARSE",
            Error::Io(_) => "IO",
        }
    }
}

/// Why a transport or membership command was ignored.
///
/// None of these are failures: the command was a safe no-op and the caller
/// may retry whenever it likes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// `add_video` beyond the configured maximum
    CapacityReached { max_videos: usize },
    /// Not every video has completed its ready handshake
    NotReady { ready: usize, total: usize },
    /// The requested transition is already in effect
    Redundant { state: PlayerState },
    /// Pause requested while nothing is playing
    NotPlaying { state: PlayerState },
    /// No entry matches the given descriptor
    UnknownVideo { video_id: String },
    /// The state change has no global transition
    Unmapped { state: PlayerState },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::CapacityReached { max_videos } => {
                write!(f, "video limit reached, only {} allowed", max_videos)
            }
            Rejection::NotReady { ready, total } => {
                write!(f, "videos not ready yet ({}/{})", ready, total)
            }
            Rejection::Redundant { state } => write!(f, "already {}", state),
            Rejection::NotPlaying { state } => write!(f, "not playing ({})", state),
            Rejection::UnknownVideo { video_id } => write!(f, "no video {}", video_id),
            Rejection::Unmapped { state } => write!(f, "no transition for {}", state),
        }
    }
}

/// Result of a command that can never fail, only be ignored
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The command took effect
    Applied,
    /// Stored until backend dependencies finish loading
    Deferred,
    /// Ignored, with the reason
    Rejected(Rejection),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            CommandOutcome::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandOutcome::Applied => write!(f, "applied"),
            CommandOutcome::Deferred => write!(f, "deferred"),
            CommandOutcome::Rejected(rejection) => write!(f, "ignored: {}", rejection),
        }
    }
}

impl From<Rejection> for CommandOutcome {
    fn from(rejection: Rejection) -> Self {
        CommandOutcome::Rejected(rejection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = Error::UnknownBackend {
            hoster: "vimeo".to_string(),
        };
        assert_eq!(err.error_code(), "UNKNOWN_BACKEND");
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "Unknown hosting backend: vimeo");
    }

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection::NotReady { ready: 1, total: 3 };
        assert_eq!(rejection.to_string(), "videos not ready yet (1/3)");

        let outcome = CommandOutcome::from(Rejection::Redundant {
            state: PlayerState::Playing,
        });
        assert!(!outcome.is_applied());
        assert_eq!(outcome.rejection().unwrap().to_string(), "already playing");
        assert_eq!(outcome.to_string(), "ignored: already playing");
    }
}
