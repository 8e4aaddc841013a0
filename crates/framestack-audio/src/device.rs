//! The audio-device contract.

use framestack_core::{FrameNumber, FrameRate};
use framestack_timeline::Clip;

/// One clip's worth of audio to cache at a playhead.
#[derive(Debug, Clone, Copy)]
pub struct CacheRequest<'a> {
    pub clip: &'a Clip,
    /// Frame of the clip's own sequence.
    pub playhead: FrameNumber,
    pub rate: FrameRate,
    /// Drop whatever was cached for the clip before this request (seek, stop).
    pub reset: bool,
    /// The playhead is being dragged rather than played.
    pub scrubbing: bool,
    pub playback_speed: f64,
}

/// The audio-output collaborator.
pub trait AudioDevice: Send + Sync {
    /// Whether an output device is present. Audio clips are skipped when
    /// this is false.
    fn is_available(&self) -> bool;

    fn cache_audio(&self, request: &CacheRequest<'_>);

    /// Called once per audio pass after every clip has been cached.
    fn flush(&self) {}
}

/// A device that is never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedDevice;

impl AudioDevice for DisconnectedDevice {
    fn is_available(&self) -> bool {
        false
    }

    fn cache_audio(&self, _request: &CacheRequest<'_>) {}
}
