use framestack_gpu::{ShaderSource, Uniform};

use crate::effect::{Capabilities, EffectContext, EffectProcessor};
use crate::field::EffectRow;

const WGSL: &str = "
fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32> {
    return vec4<f32>(color.rgb * (1.0 - param(0).x), color.a);
}
";

/// Fades the clip from or to black.
#[derive(Debug, Clone, Copy, Default)]
pub struct DipToBlack;

impl EffectProcessor for DipToBlack {
    fn name(&self) -> &str {
        "Dip to Black"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SHADER
    }

    fn rows(&self) -> Vec<EffectRow> {
        Vec::new()
    }

    fn shader(&self) -> Option<ShaderSource> {
        Some(
            ShaderSource::new(self.name())
                .with_wgsl(WGSL)
                .with_uniforms(&["darken"])
                .with_cpu(|frag| {
                    let keep = 1.0 - frag.uniforms.float("darken");
                    let [r, g, b, a] = frag.color;
                    [r * keep, g * keep, b * keep, a]
                }),
        )
    }

    fn uniforms(&self, ctx: &EffectContext<'_>) -> Vec<(&'static str, Uniform)> {
        vec![("darken", Uniform::Float(1.0 - ctx.presence()))]
    }

    fn clone_box(&self) -> Box<dyn EffectProcessor> {
        Box::new(*self)
    }
}
