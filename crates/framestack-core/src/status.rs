//! Per-frame render issues.
//!
//! Nothing that goes wrong with a single clip aborts a compose. Problems are
//! collected into a [`FrameHealth`] which the driving loop inspects to decide
//! whether the frame should be drawn again once resources catch up.

use thiserror::Error;

/// A non-fatal problem encountered while composing one frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderIssue {
    #[error("media for clip '{clip}' is still loading")]
    NotReady { clip: String },

    #[error("clip '{clip}' references invalid media")]
    InvalidMedia { clip: String },

    #[error("no audio device available for clip '{clip}'")]
    NoAudioDevice { clip: String },

    #[error("no usable texture for '{source_name}'")]
    TextureAcquisitionFailed { source_name: String },

    #[error("shader for effect '{effect}' is not linked")]
    ShaderUnlinked { effect: String },

    #[error("sequence '{sequence}' is already being composed by an ancestor")]
    NestingCycle { sequence: String },

    #[error("clip '{clip}' dropped after {frames} stale frames")]
    StaleFrameDropped { clip: String, frames: u32 },
}

impl RenderIssue {
    /// Whether redrawing the same frame later may resolve the issue.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotReady { .. }
                | Self::TextureAcquisitionFailed { .. }
                | Self::StaleFrameDropped { .. }
        )
    }
}

/// Aggregated outcome of one compose call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameHealth {
    /// The frame is degraded and should be composed again.
    pub retry: bool,
    pub issues: Vec<RenderIssue>,
}

impl FrameHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, issue: RenderIssue) {
        self.retry |= issue.is_retryable();
        self.issues.push(issue);
    }

    /// Fold the issues of a nested compose into this one.
    pub fn merge(&mut self, other: FrameHealth) {
        self.retry |= other.retry;
        self.issues.extend(other.issues);
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn any(&self, predicate: impl Fn(&RenderIssue) -> bool) -> bool {
        self.issues.iter().any(predicate)
    }
}
