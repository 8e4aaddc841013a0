//! On-screen handles for editing an effect's parameters.
//!
//! Processors produce gizmos in clip space: pixels relative to the clip
//! centre, y down, the same space as [`TextureCoords`] vertices. The
//! compositor maps them into sequence space once the clip's final scale
//! and position are known.
//!
//! [`TextureCoords`]: framestack_gpu::TextureCoords

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoKind {
    /// A draggable point.
    Dot,
    /// A closed outline through its points.
    Polygon,
}

/// One handle. `world` holds clip-space points; `screen` is filled by
/// [`to_sequence`](Self::to_sequence).
#[derive(Debug, Clone, PartialEq)]
pub struct Gizmo {
    pub id: &'static str,
    pub kind: GizmoKind,
    pub world: Vec<Vec2>,
    pub screen: Vec<Vec2>,
}

impl Gizmo {
    pub fn dot(id: &'static str, at: Vec2) -> Self {
        Self {
            id,
            kind: GizmoKind::Dot,
            world: vec![at],
            screen: Vec::new(),
        }
    }

    pub fn polygon(id: &'static str, points: &[Vec2]) -> Self {
        Self {
            id,
            kind: GizmoKind::Polygon,
            world: points.to_vec(),
            screen: Vec::new(),
        }
    }

    /// Map world points into sequence pixels: scale about the clip centre,
    /// then move the centre to `origin`.
    pub fn to_sequence(&mut self, origin: Vec2, scale: f32) {
        self.screen = self.world.iter().map(|p| origin + *p * scale).collect();
    }

    /// Whether `point` (sequence pixels) is within `radius` of a screen
    /// point of this gizmo.
    pub fn hit(&self, point: Vec2, radius: f32) -> bool {
        self.screen.iter().any(|p| p.distance(point) <= radius)
    }
}
