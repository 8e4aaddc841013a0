//! Where decoded pixels come from.

use framestack_core::{FrameBuffer, FrameNumber, FramestackError, Result};
use framestack_timeline::{Footage, FootageStream};
use tracing::info;

/// Demuxes and decodes footage. Called from decoder worker threads.
pub trait MediaSource: Send + Sync {
    /// Check that `footage` can be decoded at all.
    fn probe(&self, footage: &Footage) -> Result<()>;

    /// Decode one frame of a video stream as RGBA.
    fn decode(
        &self,
        footage: &Footage,
        stream: &FootageStream,
        frame: FrameNumber,
    ) -> Result<FrameBuffer>;
}

/// Generates colour bars instead of reading files. Each frame shifts the
/// bars one column left, so consecutive frames are distinguishable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestPatternSource;

impl TestPatternSource {
    pub fn new() -> Self {
        Self
    }

    /// The frame [`decode`](MediaSource::decode) produces for a
    /// `width`x`height` stream.
    pub fn frame(width: u32, height: u32, frame: FrameNumber) -> FrameBuffer {
        let mut buffer = FrameBuffer::test_pattern(width, height);
        if width == 0 {
            return buffer;
        }
        let shift = frame.rem_euclid(width as i64) as usize * 4;
        let plane = buffer.primary_plane_mut();
        for y in 0..height {
            plane.row_mut(y).rotate_left(shift);
        }
        buffer
    }
}

impl MediaSource for TestPatternSource {
    fn probe(&self, footage: &Footage) -> Result<()> {
        if footage.streams().is_empty() {
            return Err(FramestackError::Media(format!(
                "{}: no decodable streams",
                footage.name
            )));
        }
        info!("Probed {} ({} streams)", footage.name, footage.streams().len());
        Ok(())
    }

    fn decode(
        &self,
        footage: &Footage,
        stream: &FootageStream,
        frame: FrameNumber,
    ) -> Result<FrameBuffer> {
        if !stream.video {
            return Err(FramestackError::Decoder(format!(
                "{}: stream {} is not video",
                footage.name, stream.file_index
            )));
        }
        if footage.length > 0 && !(0..footage.length).contains(&frame) {
            return Err(FramestackError::InvalidParameter(format!(
                "Frame {} out of range (0-{})",
                frame,
                footage.length - 1
            )));
        }
        Ok(Self::frame(stream.width, stream.height, frame))
    }
}
