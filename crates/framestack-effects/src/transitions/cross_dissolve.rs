use framestack_gpu::TextureCoords;

use crate::effect::{Capabilities, EffectContext, EffectProcessor};
use crate::field::EffectRow;

/// Fades the clip's opacity in or out.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossDissolve;

impl EffectProcessor for CrossDissolve {
    fn name(&self) -> &str {
        "Cross Dissolve"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::COORDS
    }

    fn rows(&self) -> Vec<EffectRow> {
        Vec::new()
    }

    fn process_coords(&self, ctx: &EffectContext<'_>, coords: &mut TextureCoords) {
        coords.opacity *= ctx.presence();
    }

    fn clone_box(&self) -> Box<dyn EffectProcessor> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::TransitionRole;
    use crate::field::FieldValues;
    use framestack_core::RationalTime;

    #[test]
    fn test_fades_by_role() {
        let values = FieldValues::new();
        for (role, expected) in [
            (TransitionRole::Opening, 0.2),
            (TransitionRole::Closing, 0.8),
        ] {
            let ctx = EffectContext {
                time: RationalTime::ZERO,
                progress: 0.2,
                role,
                values: &values,
                size: (8, 8),
            };
            let mut coords = TextureCoords::for_size(8, 8);
            CrossDissolve.process_coords(&ctx, &mut coords);
            assert!((coords.opacity - expected).abs() < 1e-6);
        }
    }
}
