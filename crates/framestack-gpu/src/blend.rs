//! Blend modes for compositing a clip onto the layers beneath it.
//!
//! All modes are separable: the blend function is applied per colour
//! channel, then the result is composited source-over using the source
//! alpha scaled by the clip opacity. Colours are straight (not
//! premultiplied) RGBA in 0..1.

use serde::{Deserialize, Serialize};

/// Blend mode for compositing layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum BlendMode {
    // ── Normal ──────────────────────────────────
    #[default]
    Normal = 0,

    // ── Darken group ────────────────────────────
    Darken = 1,
    Multiply = 2,
    ColorBurn = 3,

    // ── Lighten group ───────────────────────────
    Lighten = 4,
    Screen = 5,
    ColorDodge = 6,
    Add = 7,

    // ── Contrast group ──────────────────────────
    Overlay = 8,
    SoftLight = 9,
    HardLight = 10,

    // ── Inversion group ─────────────────────────
    Difference = 11,
    Exclusion = 12,
    Subtract = 13,
}

impl BlendMode {
    /// All blend modes in display order. The position in this array is
    /// the value passed to the blend program's `blend_mode` uniform.
    pub const ALL: [BlendMode; 14] = [
        Self::Normal,
        Self::Darken,
        Self::Multiply,
        Self::ColorBurn,
        Self::Lighten,
        Self::Screen,
        Self::ColorDodge,
        Self::Add,
        Self::Overlay,
        Self::SoftLight,
        Self::HardLight,
        Self::Difference,
        Self::Exclusion,
        Self::Subtract,
    ];

    /// Look up a mode by its numeric index, e.g. from a keyframed field.
    pub fn from_index(index: i64) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    pub fn index(self) -> i32 {
        self as u32 as i32
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Darken => "Darken",
            Self::Multiply => "Multiply",
            Self::ColorBurn => "Color Burn",
            Self::Lighten => "Lighten",
            Self::Screen => "Screen",
            Self::ColorDodge => "Color Dodge",
            Self::Add => "Add",
            Self::Overlay => "Overlay",
            Self::SoftLight => "Soft Light",
            Self::HardLight => "Hard Light",
            Self::Difference => "Difference",
            Self::Exclusion => "Exclusion",
            Self::Subtract => "Subtract",
        }
    }

    /// Category for UI grouping.
    pub fn category(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Darken | Self::Multiply | Self::ColorBurn => "Darken",
            Self::Lighten | Self::Screen | Self::ColorDodge | Self::Add => "Lighten",
            Self::Overlay | Self::SoftLight | Self::HardLight => "Contrast",
            Self::Difference | Self::Exclusion | Self::Subtract => "Inversion",
        }
    }

    /// Blend one backdrop channel `b` with one source channel `s`.
    pub fn channel(self, b: f32, s: f32) -> f32 {
        match self {
            Self::Normal => s,
            Self::Darken => b.min(s),
            Self::Multiply => b * s,
            Self::ColorBurn => {
                if b >= 1.0 {
                    1.0
                } else if s <= 0.0 {
                    0.0
                } else {
                    1.0 - ((1.0 - b) / s).min(1.0)
                }
            }
            Self::Lighten => b.max(s),
            Self::Screen => b + s - b * s,
            Self::ColorDodge => {
                if b <= 0.0 {
                    0.0
                } else if s >= 1.0 {
                    1.0
                } else {
                    (b / (1.0 - s)).min(1.0)
                }
            }
            Self::Add => (b + s).min(1.0),
            Self::Overlay => Self::HardLight.channel(s, b),
            Self::SoftLight => {
                if s <= 0.5 {
                    b - (1.0 - 2.0 * s) * b * (1.0 - b)
                } else {
                    let d = if b <= 0.25 {
                        ((16.0 * b - 12.0) * b + 4.0) * b
                    } else {
                        b.sqrt()
                    };
                    b + (2.0 * s - 1.0) * (d - b)
                }
            }
            Self::HardLight => {
                if s <= 0.5 {
                    b * 2.0 * s
                } else {
                    Self::Screen.channel(b, 2.0 * s - 1.0)
                }
            }
            Self::Difference => (b - s).abs(),
            Self::Exclusion => b + s - 2.0 * b * s,
            Self::Subtract => (b - s).max(0.0),
        }
    }

    /// Composite straight-alpha `src` over `dst` with this mode.
    pub fn composite(self, dst: [f32; 4], src: [f32; 4], opacity: f32) -> [f32; 4] {
        let sa = src[3] * opacity.clamp(0.0, 1.0);
        if sa <= 0.0 {
            return dst;
        }
        let da = dst[3];
        let out_a = sa + da * (1.0 - sa);
        let mut out = [0.0, 0.0, 0.0, out_a];
        for i in 0..3 {
            let mixed = (1.0 - da) * src[i] + da * self.channel(dst[i], src[i]);
            let premul = sa * mixed + da * dst[i] * (1.0 - sa);
            out[i] = (premul / out_a).clamp(0.0, 1.0);
        }
        out
    }
}
