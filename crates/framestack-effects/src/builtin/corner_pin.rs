use framestack_gpu::TextureCoords;
use glam::Vec2;

use crate::effect::{Capabilities, EffectContext, EffectProcessor};
use crate::field::{EffectField, EffectRow};
use crate::gizmo::Gizmo;

const CORNERS: [(&str, &str, &str); 4] = [
    ("Top Left", "top_left_x", "top_left_y"),
    ("Top Right", "top_right_x", "top_right_y"),
    ("Bottom Right", "bottom_right_x", "bottom_right_y"),
    ("Bottom Left", "bottom_left_x", "bottom_left_y"),
];

const GIZMO_IDS: [&str; 4] = ["top_left", "top_right", "bottom_right", "bottom_left"];

/// Grid the pinned quad is drawn with, so the image follows the corners
/// bilinearly instead of folding along one diagonal.
const GRID_SIZE: u32 = 16;

/// Moves each corner of the clip by a pixel offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct CornerPin;

impl CornerPin {
    fn offsets(ctx: &EffectContext<'_>) -> [Vec2; 4] {
        CORNERS.map(|(_, x, y)| Vec2::new(ctx.value(x, 0.0), ctx.value(y, 0.0)))
    }
}

impl EffectProcessor for CornerPin {
    fn name(&self) -> &str {
        "Corner Pin"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::COORDS | Capabilities::GIZMOS
    }

    fn rows(&self) -> Vec<EffectRow> {
        CORNERS
            .iter()
            .map(|(name, x, y)| {
                EffectRow::new(
                    *name,
                    vec![
                        EffectField::new(*x, format!("{name} X"), 0.0),
                        EffectField::new(*y, format!("{name} Y"), 0.0),
                    ],
                )
            })
            .collect()
    }

    fn process_coords(&self, ctx: &EffectContext<'_>, coords: &mut TextureCoords) {
        for (vertex, offset) in coords.vertices.iter_mut().zip(Self::offsets(ctx)) {
            *vertex += offset;
        }
        coords.grid_size = coords.grid_size.max(GRID_SIZE);
    }

    fn gizmos(&self, _ctx: &EffectContext<'_>, coords: &TextureCoords) -> Vec<Gizmo> {
        GIZMO_IDS
            .iter()
            .zip(coords.vertices)
            .map(|(id, at)| Gizmo::dot(*id, at))
            .collect()
    }

    fn clone_box(&self) -> Box<dyn EffectProcessor> {
        Box::new(*self)
    }
}
