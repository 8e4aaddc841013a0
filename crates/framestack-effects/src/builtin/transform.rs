use framestack_gpu::{BlendMode, TextureCoords};
use glam::Vec2;

use crate::effect::{Capabilities, EffectContext, EffectProcessor};
use crate::field::{EffectField, EffectRow};
use crate::gizmo::Gizmo;

/// Position, scale, rotation, opacity and blend mode of a clip.
///
/// Position is a pixel offset from the sequence centre, scale and opacity
/// are percentages, rotation is in degrees clockwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transform;

impl EffectProcessor for Transform {
    fn name(&self) -> &str {
        "Transform"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::COORDS | Capabilities::GIZMOS
    }

    fn rows(&self) -> Vec<EffectRow> {
        vec![
            EffectRow::new(
                "Position",
                vec![
                    EffectField::new("position_x", "Position X", 0.0),
                    EffectField::new("position_y", "Position Y", 0.0),
                ],
            ),
            EffectRow::single(EffectField::new("scale", "Scale", 100.0).with_range(0.0, 10_000.0)),
            EffectRow::single(EffectField::new("rotation", "Rotation", 0.0)),
            EffectRow::single(EffectField::new("opacity", "Opacity", 100.0).with_range(0.0, 100.0)),
            EffectRow::single(
                EffectField::new("blend_mode", "Blend Mode", 0.0)
                    .with_range(0.0, (BlendMode::ALL.len() - 1) as f64),
            ),
        ]
    }

    fn process_coords(&self, ctx: &EffectContext<'_>, coords: &mut TextureCoords) {
        let offset = Vec2::new(ctx.value("position_x", 0.0), ctx.value("position_y", 0.0));
        let scale = ctx.value("scale", 100.0) / 100.0;
        let rotation = Vec2::from_angle(ctx.value("rotation", 0.0).to_radians());

        coords.map_vertices(|v| rotation.rotate(v * scale) + offset);
        coords.opacity *= ctx.value("opacity", 100.0) / 100.0;
        coords.blend_mode = BlendMode::from_index(ctx.value("blend_mode", 0.0).round() as i64);
    }

    fn gizmos(&self, ctx: &EffectContext<'_>, coords: &TextureCoords) -> Vec<Gizmo> {
        let position = Vec2::new(ctx.value("position_x", 0.0), ctx.value("position_y", 0.0));
        vec![
            Gizmo::dot("position", position),
            Gizmo::polygon("bounds", &coords.vertices),
        ]
    }

    fn clone_box(&self) -> Box<dyn EffectProcessor> {
        Box::new(*self)
    }
}
