//! Settings of a render run.

use anyhow::{Context, Result};
use framestack_core::{ComposeConfig, FrameNumber, FrameRate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Software,
    Wgpu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    /// Sequence frames to render, one PNG each.
    pub frames: Vec<FrameNumber>,
    pub output_dir: PathBuf,
    pub backend: BackendKind,
    /// How often a frame is recomposed while clips are still loading.
    pub max_attempts: u32,
    pub compose: ComposeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            width: 640,
            height: 360,
            frame_rate: FrameRate::FPS_24,
            frames: vec![0, 6, 12, 30, 60, 100, 130],
            output_dir: PathBuf::from("framestack-out"),
            backend: BackendKind::Software,
            max_attempts: 20,
            compose: ComposeConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn frame_path(&self, frame: FrameNumber) -> PathBuf {
        self.output_dir.join(format!("frame_{frame:05}.png"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"width": 320, "backend": "wgpu", "compose": {"audio_scrubbing": false}}"#)
                .unwrap();
        assert_eq!(config.width, 320);
        assert_eq!(config.height, 360);
        assert_eq!(config.backend, BackendKind::Wgpu);
        assert!(!config.compose.audio_scrubbing);
        assert_eq!(config.compose.max_stale_frames, 8);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(AppConfig::load(Path::new("/nonexistent/framestack.json")).is_err());
    }

    #[test]
    fn test_frame_path() {
        let config = AppConfig::default();
        assert_eq!(config.frame_path(42), PathBuf::from("framestack-out/frame_00042.png"));
    }
}
