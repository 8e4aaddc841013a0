//! Geometric primitives shared by the compositor and gizmo code.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// 2D vector.
pub type Vec2 = glam::Vec2;

/// Axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        Self {
            x: center.x - size.x * 0.5,
            y: center.y - size.y * 0.5,
            width: size.x,
            height: size.y,
        }
    }

    /// Smallest rectangle containing every point.
    pub fn bounding(points: &[Vec2]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    #[inline]
    pub fn contains(self, point: Vec2) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && point.x < self.x + self.width
            && point.y < self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box() {
        let rect = Rect::bounding(&[
            Vec2::new(4.0, -2.0),
            Vec2::new(-1.0, 3.0),
            Vec2::new(2.0, 0.0),
        ]);
        assert_eq!(rect, Rect::new(-1.0, -2.0, 5.0, 5.0));
        assert_eq!(Rect::bounding(&[]), Rect::default());
    }

    #[test]
    fn test_contains_is_half_open() {
        let rect = Rect::from_center_size(Vec2::ZERO, Vec2::splat(10.0));
        assert!(rect.contains(Vec2::new(-5.0, -5.0)));
        assert!(!rect.contains(Vec2::new(5.0, 0.0)));
        assert_eq!(rect.center(), Vec2::ZERO);
    }
}
