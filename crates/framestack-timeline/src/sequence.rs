//! Sequences.

use framestack_core::{FrameNumber, FrameRate};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use uuid::Uuid;

use crate::clip::Clip;

/// A timeline of clips at a fixed size and frame rate.
#[derive(Debug)]
pub struct Sequence {
    id: Uuid,
    pub name: String,
    width: u32,
    height: u32,
    pub frame_rate: FrameRate,
    pub playhead: FrameNumber,
    pub clips: Vec<Clip>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, width: u32, height: u32, frame_rate: FrameRate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            width,
            height,
            frame_rate,
            playhead: 0,
            clips: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn add_clip(&mut self, clip: Clip) -> usize {
        self.clips.push(clip);
        self.clips.len() - 1
    }

    pub fn clip(&self, id: Uuid) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn clip_mut(&mut self, id: Uuid) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    /// End of the last clip, in frames.
    pub fn duration(&self) -> FrameNumber {
        self.clips
            .iter()
            .map(Clip::timeline_out_with_transition)
            .max()
            .unwrap_or(0)
    }

    /// Flag every clip, including those in nested sequences, to drop its
    /// cached audio. Called on seek and stop.
    ///
    /// A nested sequence that is already locked is being walked by a caller
    /// further up and is skipped.
    pub fn reset_audio(&self) {
        for clip in &self.clips {
            clip.playback.request_audio_reset();
            if let Some(nested) = clip.nested() {
                if let Some(sequence) = nested.try_lock() {
                    sequence.reset_audio();
                }
            }
        }
    }

    /// Wrap for use as nestable media.
    pub fn into_shared(self) -> SharedSequence {
        SharedSequence::new(self)
    }
}

/// A sequence that can be nested in others.
#[derive(Debug, Clone)]
pub struct SharedSequence {
    id: Uuid,
    inner: Arc<Mutex<Sequence>>,
}

impl SharedSequence {
    pub fn new(sequence: Sequence) -> Self {
        Self {
            id: sequence.id(),
            inner: Arc::new(Mutex::new(sequence)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn lock(&self) -> MutexGuard<'_, Sequence> {
        self.inner.lock()
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_, Sequence>> {
        self.inner.try_lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Media;
    use crate::track::TrackIndex;

    #[test]
    fn test_duration() {
        let mut seq = Sequence::new("s", 64, 36, FrameRate::FPS_24);
        assert_eq!(seq.duration(), 0);
        seq.add_clip(Clip::new("a", TrackIndex::video(1), 0, 30));
        seq.add_clip(Clip::new("b", TrackIndex::audio(1), 10, 50));
        assert_eq!(seq.duration(), 50);
    }

    #[test]
    fn test_reset_audio_reaches_nested_clips() {
        let mut inner = Sequence::new("inner", 64, 36, FrameRate::FPS_24);
        inner.add_clip(Clip::new("deep", TrackIndex::audio(1), 0, 10));
        let inner = inner.into_shared();

        let mut outer = Sequence::new("outer", 64, 36, FrameRate::FPS_24);
        outer.add_clip(
            Clip::new("nest", TrackIndex::video(1), 0, 10).with_media(Media::Sequence(inner.clone()), 0),
        );
        outer.reset_audio();

        assert!(outer.clips[0].playback.audio_reset_pending());
        assert!(inner.lock().clips[0].playback.audio_reset_pending());
    }

    #[test]
    fn test_reset_audio_survives_self_nesting() {
        let shared = Sequence::new("loop", 64, 36, FrameRate::FPS_24).into_shared();
        shared.lock().add_clip(
            Clip::new("self", TrackIndex::video(1), 0, 10).with_media(Media::Sequence(shared.clone()), 0),
        );
        let guard = shared.lock();
        guard.reset_audio();
        assert!(guard.clips[0].playback.audio_reset_pending());
    }
}
