use framestack_core::FrameBuffer;

use crate::effect::{Capabilities, EffectContext, EffectProcessor};
use crate::field::{EffectField, EffectRow};

/// Fills the clip with a flat colour drawn over whatever it holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolidColor;

impl EffectProcessor for SolidColor {
    fn name(&self) -> &str {
        "Solid Color"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SUPERIMPOSE
    }

    fn rows(&self) -> Vec<EffectRow> {
        vec![
            EffectRow::new(
                "Color",
                vec![
                    EffectField::new("red", "Red", 255.0).with_range(0.0, 255.0),
                    EffectField::new("green", "Green", 255.0).with_range(0.0, 255.0),
                    EffectField::new("blue", "Blue", 255.0).with_range(0.0, 255.0),
                ],
            ),
            EffectRow::single(EffectField::new("opacity", "Opacity", 100.0).with_range(0.0, 100.0)),
        ]
    }

    fn superimpose(&self, ctx: &EffectContext<'_>) -> Option<FrameBuffer> {
        let (width, height) = ctx.size;
        if width == 0 || height == 0 {
            return None;
        }
        let channel = |id: &str| ctx.value(id, 255.0).round() as u8;
        let alpha = (ctx.value("opacity", 100.0) / 100.0 * 255.0).round() as u8;
        Some(FrameBuffer::solid(
            width,
            height,
            [channel("red"), channel("green"), channel("blue"), alpha],
        ))
    }

    fn clone_box(&self) -> Box<dyn EffectProcessor> {
        Box::new(*self)
    }
}
