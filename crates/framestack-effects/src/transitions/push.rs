use framestack_gpu::TextureCoords;

use super::Direction;
use crate::effect::{Capabilities, EffectContext, EffectProcessor, TransitionRole};
use crate::field::{EffectField, EffectRow};

/// Slides the clip in or out of frame.
///
/// Opening, the clip travels in the chosen direction from just outside the
/// frame to its resting place. Closing, it keeps travelling out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Push;

impl EffectProcessor for Push {
    fn name(&self) -> &str {
        "Push"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::COORDS
    }

    fn rows(&self) -> Vec<EffectRow> {
        vec![EffectRow::single(
            EffectField::new("direction", "Direction", 0.0).with_range(0.0, 3.0),
        )]
    }

    fn process_coords(&self, ctx: &EffectContext<'_>, coords: &mut TextureCoords) {
        let unit = Direction::from_index(ctx.value("direction", 0.0)).unit();
        let extent = unit.abs() * ctx.size_vec();
        let travel = match ctx.role {
            TransitionRole::Opening => ctx.progress - 1.0,
            TransitionRole::Closing => ctx.progress,
            TransitionRole::None => 0.0,
        };
        let offset = unit * extent * travel;
        coords.map_vertices(|v| v + offset);
    }

    fn clone_box(&self) -> Box<dyn EffectProcessor> {
        Box::new(*self)
    }
}
