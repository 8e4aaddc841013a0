//! Clip playback state shared with decoder and audio workers.

use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};

/// Open/close and audio flags of one clip.
///
/// The rendering thread and decoder workers both hold an `Arc` to this.
/// A clip is closed only once `finished_opening` is set, so an open still
/// in flight completes first.
#[derive(Debug, Default)]
pub struct PlaybackState {
    open: AtomicBool,
    finished_opening: AtomicBool,
    audio_reset: AtomicBool,
    cache_lock: Mutex<()>,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::Release);
    }

    pub fn finished_opening(&self) -> bool {
        self.finished_opening.load(Ordering::Acquire)
    }

    pub fn set_finished_opening(&self, finished: bool) {
        self.finished_opening.store(finished, Ordering::Release);
    }

    /// Ask the audio cacher to drop what it has buffered (seek or stop).
    pub fn request_audio_reset(&self) {
        self.audio_reset.store(true, Ordering::Release);
    }

    pub fn audio_reset_pending(&self) -> bool {
        self.audio_reset.load(Ordering::Acquire)
    }

    /// Consume a pending reset request.
    pub fn take_audio_reset(&self) -> bool {
        self.audio_reset.swap(false, Ordering::AcqRel)
    }

    /// Lock held while audio for this clip is being cached.
    pub fn cache_lock(&self) -> &Mutex<()> {
        &self.cache_lock
    }

    /// Take the cache lock without waiting.
    pub fn try_lock_cache(&self) -> Option<MutexGuard<'_, ()>> {
        self.cache_lock.try_lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_reset_is_consumed_once() {
        let state = PlaybackState::new();
        assert!(!state.take_audio_reset());
        state.request_audio_reset();
        assert!(state.audio_reset_pending());
        assert!(state.take_audio_reset());
        assert!(!state.take_audio_reset());
    }

    #[test]
    fn test_cache_lock_is_exclusive() {
        let state = PlaybackState::new();
        let held = state.try_lock_cache();
        assert!(held.is_some());
        assert!(state.try_lock_cache().is_none());
        drop(held);
        assert!(state.try_lock_cache().is_some());
    }
}
