use framestack_gpu::{ShaderSource, Uniform};

use crate::effect::{Capabilities, EffectContext, EffectProcessor};
use crate::field::{EffectField, EffectRow};

const WGSL: &str = "
fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32> {
    let rgb = (color.rgb - vec3<f32>(0.5)) * param(1).x + vec3<f32>(0.5) + vec3<f32>(param(0).x);
    return vec4<f32>(clamp(rgb, vec3<f32>(0.0), vec3<f32>(1.0)), color.a);
}
";

/// Adds brightness and scales contrast about mid-grey. Both fields run
/// from -100 to 100.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrightnessContrast;

impl BrightnessContrast {
    pub fn apply(color: [f32; 4], brightness: f32, contrast: f32) -> [f32; 4] {
        let adjust = |c: f32| ((c - 0.5) * contrast + 0.5 + brightness).clamp(0.0, 1.0);
        [adjust(color[0]), adjust(color[1]), adjust(color[2]), color[3]]
    }
}

impl EffectProcessor for BrightnessContrast {
    fn name(&self) -> &str {
        "Brightness & Contrast"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SHADER
    }

    fn rows(&self) -> Vec<EffectRow> {
        vec![
            EffectRow::single(
                EffectField::new("brightness", "Brightness", 0.0).with_range(-100.0, 100.0),
            ),
            EffectRow::single(
                EffectField::new("contrast", "Contrast", 0.0).with_range(-100.0, 100.0),
            ),
        ]
    }

    fn shader(&self) -> Option<ShaderSource> {
        Some(
            ShaderSource::new(self.name())
                .with_wgsl(WGSL)
                .with_uniforms(&["brightness", "contrast"])
                .with_cpu(|frag| {
                    Self::apply(
                        frag.color,
                        frag.uniforms.float("brightness"),
                        frag.uniforms.float("contrast"),
                    )
                }),
        )
    }

    fn uniforms(&self, ctx: &EffectContext<'_>) -> Vec<(&'static str, Uniform)> {
        vec![
            ("brightness", Uniform::Float(ctx.value("brightness", 0.0) / 100.0)),
            ("contrast", Uniform::Float(1.0 + ctx.value("contrast", 0.0) / 100.0)),
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
    fn test_neutral() {
        let c = [0.2, 0.5, 0.9, 0.7];
        let out = BrightnessContrast::apply(c, 0.0, 1.0);
        assert!(out.iter().zip(c).all(|(a, b)| (a - b).abs() < 1e-6));
    }

    #[test]
    fn test_flat_contrast_is_grey() {
        let out = BrightnessContrast::apply([0.1, 0.9, 0.3, 1.0], 0.0, 0.0);
        assert_eq!(out, [0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_brightness_clamps() {
        let out = BrightnessContrast::apply([0.8, 0.8, 0.8, 1.0], 0.5, 1.0);
        assert_eq!(out[0], 1.0);
    }
}
