//! Player configuration
//!
//! The wire format is the one embedding pages already use:
//!
//! ```json
//! {
//!   "hoster": "simulated",
//!   "videos": [{ "videoId": "a1", "startSeconds": 5 }],
//!   "area": "#stage",
//!   "maxVideos": 4
//! }
//! ```

use crate::{types::VideoDescriptor, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default number of videos a player accepts
pub const DEFAULT_MAX_VIDEOS: usize = 4;

/// Default update tick period in milliseconds
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 200;

/// Split player configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerConfig {
    /// Hosting backend identifier, resolved against the backend registry
    pub hoster: String,
    /// Videos added once backend dependencies are loaded
    pub videos: Vec<VideoDescriptor>,
    /// Mount point selector; nothing is rendered when absent
    pub area: Option<String>,
    /// Maximum number of simultaneous videos
    pub max_videos: usize,
    /// Update tick period while playing
    pub update_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            hoster: "simulated".to_string(),
            videos: Vec::new(),
            area: None,
            max_videos: DEFAULT_MAX_VIDEOS,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
        }
    }
}

impl PlayerConfig {
    /// Config for a backend with the given initial videos
    pub fn new(hoster: impl Into<String>, videos: Vec<VideoDescriptor>) -> Self {
        Self {
            hoster: hoster.into(),
            videos,
            ..Default::default()
        }
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn with_max_videos(mut self, max_videos: usize) -> Self {
        self.max_videos = max_videos;
        self
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the configuration for values no player can work with
    pub fn validate(&self) -> Result<()> {
        if self.hoster.trim().is_empty() {
            return Err(Error::InvalidConfig("hoster must not be empty".to_string()));
        }
        if self.max_videos == 0 {
            return Err(Error::InvalidConfig("maxVideos must be at least 1".to_string()));
        }
        if self.update_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "updateIntervalMs must be at least 1".to_string(),
            ));
        }
        self.videos.iter().try_for_each(VideoDescriptor::validate)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.max_videos, 4);
        assert_eq!(config.update_interval(), Duration::from_millis(200));
        assert!(config.area.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let config = PlayerConfig::from_json_str(
            r#"{"hoster":"simulated","videos":[{"videoId":"a","startSeconds":5}],"maxVideos":2}"#,
        )
        .unwrap();
        assert_eq!(config.videos, vec![VideoDescriptor::new("a", 5.0)]);
        assert_eq!(config.max_videos, 2);
        assert_eq!(config.update_interval_ms, DEFAULT_UPDATE_INTERVAL_MS);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = PlayerConfig::from_json_str(r#"{"maxVideos":0}"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");

        let err = PlayerConfig::from_json_str(r#"{"videos":[{"videoId":"a","startSeconds":-1}]}"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = PlayerConfig::from_json_str("{not json").unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_PARSE");
    }
}
