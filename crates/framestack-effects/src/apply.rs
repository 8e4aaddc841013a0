//! Running one effect against a clip.
//!
//! Coordinate work mutates the clip's quad and never touches pixels. Shader
//! passes read the composite and write the other ping-pong buffer, then
//! swap. Superimposed images are drawn over the buffer that holds the
//! composite without clearing it.

use framestack_core::{ComposeConfig, FrameHealth, RationalTime, RenderIssue};
use framestack_gpu::{
    draw_clip, FramebufferId, GraphicsBackend, PingPong, ProgramGuard, ProgramId, TextureCoords,
    TextureId,
};
use tracing::{trace, warn};

use crate::effect::{Effect, EffectContext, TransitionRole};

/// When an effect is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectTime {
    /// Seconds into the clip, for keyframe evaluation.
    pub timecode: RationalTime,
    /// Transition progress in 0..1.
    pub progress: f32,
}

impl EffectTime {
    pub fn at(timecode: RationalTime) -> Self {
        Self {
            timecode,
            progress: 0.0,
        }
    }

    pub fn transition(timecode: RationalTime, progress: f32) -> Self {
        Self { timecode, progress }
    }
}

/// Brackets the pixel passes of one effect. Entering records the bindings
/// in place; leaving restores them, on every exit path.
struct EffectScope<'a> {
    backend: &'a mut dyn GraphicsBackend,
    effect: String,
    framebuffer: FramebufferId,
    program: Option<ProgramId>,
}

impl<'a> EffectScope<'a> {
    fn begin(backend: &'a mut dyn GraphicsBackend, effect: &str) -> Self {
        trace!(effect, "begin");
        Self {
            framebuffer: backend.current_framebuffer(),
            program: backend.current_program(),
            backend,
            effect: effect.to_string(),
        }
    }

    fn backend(&mut self) -> &mut dyn GraphicsBackend {
        &mut *self.backend
    }
}

impl Drop for EffectScope<'_> {
    fn drop(&mut self) {
        self.backend.bind_program(self.program);
        self.backend.bind_framebuffer(self.framebuffer);
        trace!(effect = %self.effect, "end");
    }
}

/// Apply `effect` to a clip.
///
/// `composite` is the texture holding the clip so far and is updated to
/// the result; `buffers` tracks which of the clip's framebuffers holds it.
/// Problems are reported to `health` and never abort the chain: a shader
/// that fails to link leaves the composite untouched, and a missing
/// superimposed image is skipped.
#[allow(clippy::too_many_arguments)]
pub fn apply_effect(
    backend: &mut dyn GraphicsBackend,
    config: &ComposeConfig,
    effect: &mut Effect,
    time: EffectTime,
    role: TransitionRole,
    coords: &mut TextureCoords,
    composite: &mut TextureId,
    buffers: &mut PingPong,
    health: &mut FrameHealth,
) {
    if !effect.enabled {
        return;
    }

    let caps = effect.capabilities();
    let values = effect.values_at(time.timecode);
    let ctx = EffectContext {
        time: time.timecode,
        progress: time.progress,
        role,
        values: &values,
        size: backend.texture_size(*composite).unwrap_or((0, 0)),
    };

    if caps.coords {
        effect.processor().process_coords(&ctx, coords);
    }

    let run_shader = caps.shader && config.shaders_enabled;
    if !run_shader && !caps.superimpose {
        return;
    }

    let mut scope = EffectScope::begin(backend, effect.name());

    if run_shader {
        match effect.ensure_program(scope.backend()) {
            Some(program) => {
                let uniforms = effect.processor().uniforms(&ctx);
                let mut bound = ProgramGuard::bind(scope.backend(), program);
                for (name, value) in uniforms {
                    bound.set_uniform(name, value);
                }
                match draw_clip(&mut *bound, buffers.next_fbo(), *composite, true) {
                    Some(texture) => {
                        *composite = texture;
                        buffers.swap();
                    }
                    None => warn!(effect = effect.name(), "shader pass target missing"),
                }
            }
            None => health.report(RenderIssue::ShaderUnlinked {
                effect: effect.name().to_string(),
            }),
        }
    }

    if caps.superimpose {
        match effect.superimpose_texture(scope.backend(), &ctx) {
            Some(texture) => {
                let target = buffers.current_fbo();
                if let Some(result) = draw_clip(scope.backend(), target, texture, false) {
                    *composite = result;
                }
            }
            None => {
                warn!(effect = effect.name(), "superimpose texture unavailable, retrying");
                health.report(RenderIssue::TextureAcquisitionFailed {
                    source_name: effect.name().to_string(),
                });
            }
        }
    }
}
