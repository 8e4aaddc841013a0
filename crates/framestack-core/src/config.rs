//! Compose configuration.
//!
//! Every toggle that affects how a frame is composed lives here and is
//! passed into the compositor explicitly. Nothing reads process-wide state.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Immutable settings threaded through each compose call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Run effect shader passes. When false, effects are geometry-only.
    pub shaders_enabled: bool,

    /// Cache audio while scrubbing the playhead (not only during playback).
    pub audio_scrubbing: bool,

    /// How many consecutive frames a clip may show its last decoded frame
    /// while the decoder has nothing newer. Zero disables reuse.
    pub max_stale_frames: u32,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            shaders_enabled: true,
            audio_scrubbing: true,
            max_stale_frames: 8,
        }
    }
}

impl ComposeConfig {
    /// Parse from JSON. Missing keys take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file, falling back to defaults if it is missing or
    /// malformed.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_json(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse compose config at {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read compose config at {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ComposeConfig::from_json(r#"{ "shaders_enabled": false }"#).unwrap();
        assert!(!config.shaders_enabled);
        assert!(config.audio_scrubbing);
        assert_eq!(config.max_stale_frames, 8);
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(ComposeConfig::from_json("{ shaders_enabled: ").is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = ComposeConfig::load_or_default(Path::new("/nonexistent/framestack.json"));
        assert_eq!(config, ComposeConfig::default());
    }
}
