use framestack_gpu::{ShaderSource, Uniform};

use crate::effect::{Capabilities, EffectContext, EffectProcessor};
use crate::field::{EffectField, EffectRow};

const WGSL: &str = "
fn to_ycbcr(c: vec3<f32>) -> vec3<f32> {
    return vec3<f32>(
        dot(c, vec3<f32>(0.299, 0.587, 0.114)),
        dot(c, vec3<f32>(-0.168736, -0.331264, 0.5)),
        dot(c, vec3<f32>(0.5, -0.418688, -0.081312)),
    );
}

fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32> {
    let key = param(0).xyz;
    let tolerance = max(param(1).x, 0.001);
    let softness = max(param(2).x, 0.001);
    let spill = param(3).x;

    let d = to_ycbcr(color.rgb).yz - key.yz;
    let matte = clamp((length(d) - tolerance) / softness, 0.0, 1.0);

    var rgb = color.rgb;
    let amount = spill * (1.0 - matte);
    if (abs(key.y) > abs(key.z)) {
        let avg = (rgb.r + rgb.b) * 0.5;
        rgb.g = rgb.g - max(rgb.g - avg, 0.0) * amount;
    } else {
        let avg = (rgb.r + rgb.g) * 0.5;
        rgb.b = rgb.b - max(rgb.b - avg, 0.0) * amount;
    }
    return vec4<f32>(rgb, color.a * matte);
}
";

/// Convert straight RGB in 0..1 to BT.601 YCbCr with Cb/Cr centred on 0.
pub fn rgb_to_ycbcr(r: f32, g: f32, b: f32) -> [f32; 3] {
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = -0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let cr = 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    [y, cb, cr]
}

/// Keys out pixels close to a key colour in CbCr and suppresses its spill
/// on what remains.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromaKey;

impl ChromaKey {
    /// Key one straight-alpha pixel. `key` is the key colour in YCbCr;
    /// `tolerance`, `softness` and `spill` are in 0..1.
    pub fn key_pixel(
        color: [f32; 4],
        key: [f32; 3],
        tolerance: f32,
        softness: f32,
        spill: f32,
    ) -> [f32; 4] {
        let [r, g, b, a] = color;
        let ycbcr = rgb_to_ycbcr(r, g, b);
        let (dcb, dcr) = (ycbcr[1] - key[1], ycbcr[2] - key[2]);
        let dist = (dcb * dcb + dcr * dcr).sqrt();
        let tolerance = tolerance.max(0.001);
        let matte = ((dist - tolerance) / softness.max(0.001)).clamp(0.0, 1.0);

        let amount = spill * (1.0 - matte);
        let mut out = [r, g, b, a * matte];
        if key[1].abs() > key[2].abs() {
            let avg = (r + b) * 0.5;
            out[1] = g - (g - avg).max(0.0) * amount;
        } else {
            let avg = (r + g) * 0.5;
            out[2] = b - (b - avg).max(0.0) * amount;
        }
        out
    }
}

impl EffectProcessor for ChromaKey {
    fn name(&self) -> &str {
        "Chroma Key"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SHADER
    }

    fn rows(&self) -> Vec<EffectRow> {
        vec![
            EffectRow::new(
                "Key Color",
                vec![
                    EffectField::new("key_red", "Key Red", 0.0).with_range(0.0, 255.0),
                    EffectField::new("key_green", "Key Green", 255.0).with_range(0.0, 255.0),
                    EffectField::new("key_blue", "Key Blue", 0.0).with_range(0.0, 255.0),
                ],
            ),
            EffectRow::single(
                EffectField::new("tolerance", "Tolerance", 35.0).with_range(0.0, 100.0),
            ),
            EffectRow::single(EffectField::new("softness", "Softness", 10.0).with_range(0.0, 100.0)),
            EffectRow::single(
                EffectField::new("spill", "Spill Suppression", 60.0).with_range(0.0, 100.0),
            ),
        ]
    }

    fn shader(&self) -> Option<ShaderSource> {
        Some(
            ShaderSource::new(self.name())
                .with_wgsl(WGSL)
                .with_uniforms(&["key", "tolerance", "softness", "spill"])
                .with_cpu(|frag| {
                    let key = frag.uniforms.vec4("key");
                    Self::key_pixel(
                        frag.color,
                        [key[0], key[1], key[2]],
                        frag.uniforms.float("tolerance"),
                        frag.uniforms.float("softness"),
                        frag.uniforms.float("spill"),
                    )
                }),
        )
    }

    fn uniforms(&self, ctx: &EffectContext<'_>) -> Vec<(&'static str, Uniform)> {
        let [y, cb, cr] = rgb_to_ycbcr(
            ctx.value("key_red", 0.0) / 255.0,
            ctx.value("key_green", 255.0) / 255.0,
            ctx.value("key_blue", 0.0) / 255.0,
        );
        vec![
            ("key", Uniform::Vec4([y, cb, cr, 0.0])),
            ("tolerance", Uniform::Float(ctx.value("tolerance", 35.0) / 100.0)),
            ("softness", Uniform::Float(ctx.value("softness", 10.0) / 100.0)),
            ("spill", Uniform::Float(ctx.value("spill", 60.0) / 100.0)),
        ]
    }

    fn clone_box(&self) -> Box<dyn EffectProcessor> {
        Box::new(*self)
    }
}
