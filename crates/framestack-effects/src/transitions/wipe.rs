use framestack_gpu::{ShaderSource, Uniform};

use super::Direction;
use crate::effect::{Capabilities, EffectContext, EffectProcessor};
use crate::field::{EffectField, EffectRow};

const WGSL: &str = "
fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32> {
    let dir = i32(param(1).x);
    var t = 1.0 - uv.x;
    if (dir == 1) {
        t = uv.x;
    } else if (dir == 2) {
        t = 1.0 - uv.y;
    } else if (dir == 3) {
        t = uv.y;
    }
    if (t < param(0).x) {
        return color;
    }
    return vec4<f32>(color.rgb, 0.0);
}
";

/// Reveals or hides the clip behind a straight edge. The edge starts at
/// the side opposite its direction of travel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wipe;

impl Wipe {
    /// Position of `uv` along the wipe, 0 where the edge starts.
    pub fn along(direction: Direction, u: f32, v: f32) -> f32 {
        match direction {
            Direction::Left => 1.0 - u,
            Direction::Right => u,
            Direction::Up => 1.0 - v,
            Direction::Down => v,
        }
    }
}

impl EffectProcessor for Wipe {
    fn name(&self) -> &str {
        "Wipe"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SHADER
    }

    fn rows(&self) -> Vec<EffectRow> {
        vec![EffectRow::single(
            EffectField::new("direction", "Direction", 1.0).with_range(0.0, 3.0),
        )]
    }

    fn shader(&self) -> Option<ShaderSource> {
        Some(
            ShaderSource::new(self.name())
                .with_wgsl(WGSL)
                .with_uniforms(&["visible", "direction"])
                .with_cpu(|frag| {
                    let direction = Direction::from_index(frag.uniforms.float("direction"));
                    let t = Self::along(direction, frag.uv.x, frag.uv.y);
                    let mut out = frag.color;
                    if t >= frag.uniforms.float("visible") {
                        out[3] = 0.0;
                    }
                    out
                }),
        )
    }

    fn uniforms(&self, ctx: &EffectContext<'_>) -> Vec<(&'static str, Uniform)> {
        vec![
            ("visible", Uniform::Float(ctx.presence())),
            ("direction", Uniform::Float(ctx.value("direction", 1.0).round())),
        ]
    }

    fn clone_box(&self) -> Box<dyn EffectProcessor> {
        Box::new(*self)
    }
}
