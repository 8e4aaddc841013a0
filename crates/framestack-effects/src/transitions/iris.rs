use framestack_gpu::{ShaderSource, Uniform};
use serde::{Deserialize, Serialize};

use crate::effect::{Capabilities, EffectContext, EffectProcessor};
use crate::field::{EffectField, EffectRow};

const WGSL: &str = "
fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32> {
    let size = vec2<f32>(textureDimensions(src_tex));
    let mid = size * 0.5;
    let f = abs(uv * size - mid);
    let shape = i32(param(1).x);
    var dist = length(f) / length(mid);
    if (shape == 1) {
        dist = max(f.x / mid.x, f.y / mid.y);
    } else if (shape == 2) {
        dist = (f.x / mid.x + f.y / mid.y) * 0.5;
    }
    if (dist < param(0).x) {
        return color;
    }
    return vec4<f32>(color.rgb, 0.0);
}
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IrisShape {
    #[default]
    Circle,
    Rectangle,
    Diamond,
}

impl IrisShape {
    pub fn from_index(index: f32) -> Self {
        match index.round() as i32 {
            1 => Self::Rectangle,
            2 => Self::Diamond,
            _ => Self::Circle,
        }
    }

    /// Normalised distance from the centre: 1 at the far corner for a
    /// circle, at the edge midpoints for the other shapes.
    pub fn distance(self, x: f32, y: f32, width: f32, height: f32) -> f32 {
        let (cx, cy) = (width * 0.5, height * 0.5);
        let (fx, fy) = ((x - cx).abs(), (y - cy).abs());
        match self {
            Self::Circle => (fx * fx + fy * fy).sqrt() / (cx * cx + cy * cy).sqrt(),
            Self::Rectangle => (fx / cx).max(fy / cy),
            Self::Diamond => (fx / cx + fy / cy) * 0.5,
        }
    }
}

/// Reveals or hides the clip through a shape growing from the centre.
#[derive(Debug, Clone, Copy, Default)]
pub struct Iris;

impl EffectProcessor for Iris {
    fn name(&self) -> &str {
        "Iris"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SHADER
    }

    fn rows(&self) -> Vec<EffectRow> {
        vec![EffectRow::single(
            EffectField::new("shape", "Shape", 0.0).with_range(0.0, 2.0),
        )]
    }

    fn shader(&self) -> Option<ShaderSource> {
        Some(
            ShaderSource::new(self.name())
                .with_wgsl(WGSL)
                .with_uniforms(&["radius", "shape"])
                .with_cpu(|frag| {
                    let shape = IrisShape::from_index(frag.uniforms.float("shape"));
                    let p = frag.uv * frag.size;
                    let dist = shape.distance(p.x, p.y, frag.size.x, frag.size.y);
                    let mut out = frag.color;
                    if dist >= frag.uniforms.float("radius") {
                        out[3] = 0.0;
                    }
                    out
                }),
        )
    }

    fn uniforms(&self, ctx: &EffectContext<'_>) -> Vec<(&'static str, Uniform)> {
        vec![
            ("radius", Uniform::Float(ctx.presence())),
            ("shape", Uniform::Float(ctx.value("shape", 0.0).round())),
        ]
    }

    fn clone_box(&self) -> Box<dyn EffectProcessor> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_distances() {
        assert_eq!(IrisShape::Circle.distance(50.0, 50.0, 100.0, 100.0), 0.0);
        assert!((IrisShape::Circle.distance(100.0, 100.0, 100.0, 100.0) - 1.0).abs() < 1e-6);
        assert_eq!(IrisShape::Rectangle.distance(100.0, 75.0, 100.0, 100.0), 1.0);
        assert_eq!(IrisShape::Diamond.distance(100.0, 75.0, 100.0, 100.0), 0.75);
        assert_eq!(IrisShape::from_index(2.0), IrisShape::Diamond);
    }
}
