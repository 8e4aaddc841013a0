//! What a clip plays: a footage stream or a nested sequence.

use framestack_core::{FrameRate, PixelFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::sequence::SharedSequence;

/// One stream of a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootageStream {
    /// Index of the stream inside the file.
    pub file_index: usize,
    pub video: bool,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub frame_rate: FrameRate,
    pub sample_rate: u32,
    pub channels: u16,
}

impl FootageStream {
    pub fn video(file_index: usize, width: u32, height: u32, frame_rate: FrameRate) -> Self {
        Self {
            file_index,
            video: true,
            width,
            height,
            format: PixelFormat::Rgba8,
            frame_rate,
            sample_rate: 0,
            channels: 0,
        }
    }

    pub fn audio(file_index: usize, sample_rate: u32, channels: u16) -> Self {
        Self {
            file_index,
            video: false,
            width: 0,
            height: 0,
            format: PixelFormat::Rgba8,
            frame_rate: FrameRate::default(),
            sample_rate,
            channels,
        }
    }
}

/// An imported media file.
///
/// `ready` and `invalid` are set by the decoder once probing finishes;
/// nothing renders from footage until it is ready and valid.
#[derive(Debug)]
pub struct Footage {
    pub name: String,
    pub path: PathBuf,
    /// Length in frames of the footage's own rate.
    pub length: i64,
    streams: Vec<FootageStream>,
    ready: AtomicBool,
    invalid: AtomicBool,
}

impl Footage {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, streams: Vec<FootageStream>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            length: 0,
            streams,
            ready: AtomicBool::new(false),
            invalid: AtomicBool::new(false),
        }
    }

    pub fn with_length(mut self, length: i64) -> Self {
        self.length = length;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid.load(Ordering::Acquire)
    }

    pub fn set_invalid(&self, invalid: bool) {
        self.invalid.store(invalid, Ordering::Release);
    }

    pub fn streams(&self) -> &[FootageStream] {
        &self.streams
    }

    /// The video or audio stream with the given file index.
    pub fn stream(&self, video: bool, file_index: usize) -> Option<&FootageStream> {
        self.streams
            .iter()
            .find(|s| s.video == video && s.file_index == file_index)
    }
}

/// Source of a clip.
#[derive(Clone)]
pub enum Media {
    Footage(Arc<Footage>),
    Sequence(SharedSequence),
}

impl Media {
    pub fn footage(footage: Footage) -> Self {
        Self::Footage(Arc::new(footage))
    }

    pub fn as_footage(&self) -> Option<&Arc<Footage>> {
        match self {
            Self::Footage(footage) => Some(footage),
            Self::Sequence(_) => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&SharedSequence> {
        match self {
            Self::Sequence(sequence) => Some(sequence),
            Self::Footage(_) => None,
        }
    }
}

impl fmt::Debug for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Footage(footage) => f.debug_tuple("Footage").field(&footage.name).finish(),
            Self::Sequence(sequence) => f.debug_tuple("Sequence").field(&sequence.id()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_lookup_by_kind_and_index() {
        let footage = Footage::new(
            "interview",
            "interview.mov",
            vec![
                FootageStream::video(0, 1920, 1080, FrameRate::FPS_25),
                FootageStream::audio(1, 48_000, 2),
            ],
        );
        assert_eq!(footage.stream(true, 0).map(|s| s.width), Some(1920));
        assert_eq!(footage.stream(false, 1).map(|s| s.channels), Some(2));
        assert!(footage.stream(true, 1).is_none());
        assert!(!footage.is_ready());
        footage.set_ready(true);
        assert!(footage.is_ready());
    }
}
