//! Fixtures shared by the integration tests.

use framestack_audio::{AudioDevice, DisconnectedDevice};
use framestack_core::{
    ComposeConfig, FrameBuffer, FrameNumber, FrameRate, FramestackError, Result,
};
use framestack_gpu::{GraphicsBackend, SoftwareBackend};
use framestack_media::{MediaSource, ThreadedDecoder};
use framestack_render::{AncestorChain, ComposeOutcome, Compositor, RenderMode};
use framestack_timeline::{Footage, FootageStream, Media, Sequence};
use std::sync::Arc;

/// Decodes every frame as a solid colour. Red and blue come from the
/// footage name, green is the frame index.
pub struct ColourSource;

pub fn colour(name: &str, frame: FrameNumber) -> [u8; 4] {
    let green = frame.rem_euclid(256) as u8;
    match name {
        "red" => [255, green, 0, 255],
        "blue" => [0, green, 255, 255],
        _ => [128, green, 128, 255],
    }
}

impl MediaSource for ColourSource {
    fn probe(&self, footage: &Footage) -> Result<()> {
        if footage.path.extension().is_some_and(|ext| ext == "bad") {
            return Err(FramestackError::Media(format!("{}: unreadable", footage.name)));
        }
        Ok(())
    }

    fn decode(
        &self,
        footage: &Footage,
        stream: &FootageStream,
        frame: FrameNumber,
    ) -> Result<FrameBuffer> {
        if !stream.video {
            return Err(FramestackError::Decoder("not a video stream".into()));
        }
        Ok(FrameBuffer::solid(stream.width, stream.height, colour(&footage.name, frame)))
    }
}

pub struct Harness {
    pub decoder: Arc<ThreadedDecoder>,
    pub compositor: Compositor,
    pub backend: SoftwareBackend,
    pub width: u32,
}

impl Harness {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_audio(width, height, Arc::new(DisconnectedDevice))
    }

    pub fn with_audio(width: u32, height: u32, audio: Arc<dyn AudioDevice>) -> Self {
        let decoder = Arc::new(ThreadedDecoder::with_workers(Arc::new(ColourSource), 2, 64 << 20));
        let compositor = Compositor::new(decoder.clone(), audio, ComposeConfig::default());
        Self {
            decoder,
            compositor,
            backend: SoftwareBackend::new(width, height),
            width,
        }
    }

    /// Probed footage with one 24 fps video stream.
    pub fn video(&self, name: &str, width: u32, height: u32) -> Media {
        self.video_at(name, width, height, FrameRate::FPS_24)
    }

    pub fn video_at(&self, name: &str, width: u32, height: u32, rate: FrameRate) -> Media {
        let footage = Footage::new(
            name,
            format!("{name}.mov"),
            vec![FootageStream::video(0, width, height, rate)],
        );
        self.decoder.probe_footage(&footage);
        Media::footage(footage)
    }

    pub fn sound(&self, name: &str) -> Media {
        let footage = Footage::new(name, format!("{name}.wav"), vec![FootageStream::audio(0, 48_000, 2)]);
        self.decoder.probe_footage(&footage);
        Media::footage(footage)
    }

    /// Clear the output and compose `sequence` at its playhead.
    pub fn compose(&mut self, sequence: &mut Sequence, mode: RenderMode) -> ComposeOutcome {
        let output = self.backend.output_framebuffer();
        self.backend.bind_framebuffer(output);
        self.backend.clear([0.0; 4]);
        self.compositor
            .compose_video_frame(sequence, &mut self.backend, &AncestorChain::root(), mode)
    }

    pub fn render(&mut self, sequence: &mut Sequence) -> ComposeOutcome {
        self.compose(sequence, RenderMode::Final)
    }

    pub fn output(&mut self) -> Vec<u8> {
        self.backend.read_output().unwrap()
    }

    pub fn pixel(&mut self, x: u32, y: u32) -> [u8; 4] {
        let data = self.output();
        let i = ((y * self.width + x) * 4) as usize;
        [data[i], data[i + 1], data[i + 2], data[i + 3]]
    }
}
