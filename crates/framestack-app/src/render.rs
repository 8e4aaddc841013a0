//! Frame-by-frame render to PNG.

use anyhow::{anyhow, Context, Result};
use framestack_audio::AudioEngine;
use framestack_core::FrameNumber;
use framestack_gpu::{FramebufferId, GraphicsBackend};
use framestack_render::{AncestorChain, AudioPass, ComposeOutcome, Compositor, RenderMode};
use framestack_timeline::Sequence;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::AppConfig;

const RETRY_DELAY: Duration = Duration::from_millis(10);

pub struct Renderer<'a> {
    pub compositor: &'a Compositor,
    pub audio: &'a AudioEngine,
    pub config: &'a AppConfig,
}

impl Renderer<'_> {
    /// Render every configured frame of `sequence` into `output` and save
    /// it. Returns the number of frames written.
    pub fn render_all(
        &self,
        sequence: &mut Sequence,
        backend: &mut dyn GraphicsBackend,
        output: FramebufferId,
    ) -> Result<usize> {
        std::fs::create_dir_all(&self.config.output_dir)
            .with_context(|| format!("creating {}", self.config.output_dir.display()))?;

        // A render starts from a seek
        sequence.reset_audio();

        for &frame in &self.config.frames {
            self.render_frame(sequence, backend, output, frame)?;
        }

        let pending = self.compositor.close_sequence(sequence, backend);
        if pending > 0 {
            warn!("{} clips still opening at shutdown", pending);
        }
        Ok(self.config.frames.len())
    }

    fn render_frame(
        &self,
        sequence: &mut Sequence,
        backend: &mut dyn GraphicsBackend,
        output: FramebufferId,
        frame: FrameNumber,
    ) -> Result<()> {
        sequence.playhead = frame;
        let outcome = self.compose_until_clean(sequence, backend, output);
        for issue in &outcome.health.issues {
            warn!(frame, "{}", issue);
        }

        let audio = self
            .compositor
            .compose_audio(sequence, AudioPass::playback(1.0).with_mode(RenderMode::Final));
        for issue in &audio.health.issues {
            warn!(frame, "{}", issue);
        }
        debug!(
            frame,
            cached = audio.cached,
            queued = self.audio.output_buffer().available_read(),
            "audio pass"
        );

        let texture = outcome
            .texture
            .or_else(|| backend.framebuffer_texture(output))
            .ok_or_else(|| anyhow!("output framebuffer has no texture"))?;
        let (width, height) = backend
            .texture_size(texture)
            .ok_or_else(|| anyhow!("output texture was released"))?;
        let pixels = backend.read_texture(texture)?;

        let path = self.config.frame_path(frame);
        image::save_buffer_with_format(
            &path,
            &pixels,
            width,
            height,
            image::ExtendedColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote frame {} to {}", frame, path.display());
        Ok(())
    }

    /// Compose one frame, composing again while a clip asks for a retry.
    fn compose_until_clean(
        &self,
        sequence: &mut Sequence,
        backend: &mut dyn GraphicsBackend,
        output: FramebufferId,
    ) -> ComposeOutcome {
        let mut attempt = 1;
        loop {
            backend.bind_framebuffer(output);
            backend.clear([0.0, 0.0, 0.0, 1.0]);
            let outcome =
                self.compositor
                    .compose_video_frame(sequence, backend, &AncestorChain::root(), RenderMode::Final);
            if !outcome.health.retry || attempt >= self.config.max_attempts {
                return outcome;
            }
            debug!(frame = sequence.playhead, attempt, "frame not ready, recomposing");
            attempt += 1;
            thread::sleep(RETRY_DELAY);
        }
    }
}
