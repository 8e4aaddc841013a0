use framestack_gpu::{ShaderSource, Uniform};

use crate::effect::{Capabilities, EffectContext, EffectProcessor};
use crate::field::{EffectField, EffectRow};

const WGSL: &str = "
fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32> {
    let inverted = vec3<f32>(1.0) - color.rgb;
    return vec4<f32>(mix(color.rgb, inverted, param(0).x), color.a);
}
";

/// Inverts colour channels, leaving alpha alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct Invert;

impl EffectProcessor for Invert {
    fn name(&self) -> &str {
        "Invert"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SHADER
    }

    fn rows(&self) -> Vec<EffectRow> {
        vec![EffectRow::single(
            EffectField::new("amount", "Amount", 100.0).with_range(0.0, 100.0),
        )]
    }

    fn shader(&self) -> Option<ShaderSource> {
        Some(
            ShaderSource::new(self.name())
                .with_wgsl(WGSL)
                .with_uniforms(&["amount"])
                .with_cpu(|frag| {
                    let amount = frag.uniforms.float("amount");
                    let [r, g, b, a] = frag.color;
                    let mix = |c: f32| c + (1.0 - 2.0 * c) * amount;
                    [mix(r), mix(g), mix(b), a]
                }),
        )
    }

    fn uniforms(&self, ctx: &EffectContext<'_>) -> Vec<(&'static str, Uniform)> {
        vec![("amount", Uniform::Float(ctx.value("amount", 100.0) / 100.0))]
    }

    fn clone_box(&self) -> Box<dyn EffectProcessor> {
        Box::new(*self)
    }
}
