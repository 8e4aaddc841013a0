//! Framestack Core - Foundation types for the compositing engine
//!
//! This crate provides the types shared by every other Framestack crate:
//! - Frame-domain time, frame rates and cross-rate retiming
//! - Keyframed parameter tracks
//! - CPU frame buffers and pixel formats
//! - Compose configuration and the per-frame render-issue taxonomy

pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod keyframe;
pub mod status;
pub mod time;

pub use config::ComposeConfig;
pub use error::{FramestackError, Result};
pub use frame::{FrameBuffer, FramePlane, PixelFormat, SharedFrameBuffer};
pub use geometry::{Rect, Vec2};
pub use keyframe::{CubicBezier, EasingCurve, Keyframe, KeyframeTrack};
pub use status::{FrameHealth, RenderIssue};
pub use time::{retime_frame, FrameNumber, FrameRate, RationalTime};

/// Memory budget constants for decoded-frame caching.
pub mod memory_budget {
    /// Total frame cache budget (for decoded frames in RAM)
    pub const FRAME_CACHE_SIZE: usize = 512 * 1024 * 1024; // 512 MB

    /// Number of frames a decoder worker prefetches past the playhead
    pub const LOOKAHEAD_FRAMES: usize = 8;

    /// Upper bound on pooled intermediate images
    pub const IMAGE_POOL_BUDGET: usize = 256 * 1024 * 1024; // 256 MB
}
