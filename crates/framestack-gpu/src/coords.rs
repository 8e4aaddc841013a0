//! Texture-coordinate quads and the meshes they expand into.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::blend::BlendMode;

/// One vertex of a draw: target pixel position and source texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct MeshVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: Vec2, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            uv: uv.to_array(),
        }
    }
}

/// A list of quads, each wound top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub quads: Vec<[MeshVertex; 4]>,
}

impl Mesh {
    /// One quad covering a `width` x `height` target with the full texture.
    pub fn fullscreen(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            quads: vec![[
                MeshVertex::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, 0.0)),
                MeshVertex::new(Vec2::new(w, 0.0), Vec2::new(1.0, 0.0)),
                MeshVertex::new(Vec2::new(w, h), Vec2::new(1.0, 1.0)),
                MeshVertex::new(Vec2::new(0.0, h), Vec2::new(0.0, 1.0)),
            ]],
        }
    }

    /// Split every quad into two triangles, `(0,1,2)` and `(0,2,3)`.
    pub fn triangles(&self) -> impl Iterator<Item = [MeshVertex; 3]> + '_ {
        self.quads
            .iter()
            .flat_map(|q| [[q[0], q[1], q[2]], [q[0], q[2], q[3]]])
    }

    pub fn vertex_count(&self) -> usize {
        self.quads.len() * 6
    }
}

/// The geometry a clip is drawn with, threaded through its effect chain.
///
/// Vertices are in pixels relative to the centre of the clip, y pointing
/// down, ordered top-left, top-right, bottom-right, bottom-left. Effects
/// move vertices and UVs, change the blend mode and opacity, or raise the
/// grid size so the final draw is subdivided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureCoords {
    pub vertices: [Vec2; 4],
    pub uvs: [Vec2; 4],
    pub blend_mode: BlendMode,
    pub opacity: f32,
    /// Subdivisions per side of the final draw; 1 draws a single quad.
    pub grid_size: u32,
}

impl TextureCoords {
    /// Untransformed quad for a clip of the given size.
    pub fn for_size(width: u32, height: u32) -> Self {
        let (hw, hh) = (width as f32 * 0.5, height as f32 * 0.5);
        Self {
            vertices: [
                Vec2::new(-hw, -hh),
                Vec2::new(hw, -hh),
                Vec2::new(hw, hh),
                Vec2::new(-hw, hh),
            ],
            uvs: [
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            blend_mode: BlendMode::Normal,
            opacity: 1.0,
            grid_size: 1,
        }
    }

    /// Apply `f` to every vertex.
    pub fn map_vertices(&mut self, f: impl Fn(Vec2) -> Vec2) {
        for v in &mut self.vertices {
            *v = f(*v);
        }
    }

    fn bilerp(corners: &[Vec2; 4], u: f32, v: f32) -> Vec2 {
        let top = corners[0].lerp(corners[1], u);
        let bottom = corners[3].lerp(corners[2], u);
        top.lerp(bottom, v)
    }

    /// Expand into a mesh placed at `origin` in target pixels, uniformly
    /// scaled by `scale`.
    pub fn to_mesh(&self, origin: Vec2, scale: f32) -> Mesh {
        let n = self.grid_size.max(1);
        let step = 1.0 / n as f32;
        let point = |i: u32, j: u32| {
            let (u, v) = (i as f32 * step, j as f32 * step);
            MeshVertex::new(
                origin + Self::bilerp(&self.vertices, u, v) * scale,
                Self::bilerp(&self.uvs, u, v),
            )
        };

        let mut quads = Vec::with_capacity((n * n) as usize);
        for j in 0..n {
            for i in 0..n {
                quads.push([
                    point(i, j),
                    point(i + 1, j),
                    point(i + 1, j + 1),
                    point(i, j + 1),
                ]);
            }
        }
        Mesh { quads }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_quad_covers_target() {
        let coords = TextureCoords::for_size(200, 100);
        let mesh = coords.to_mesh(Vec2::new(100.0, 50.0), 1.0);
        assert_eq!(mesh.quads.len(), 1);
        assert_eq!(mesh.quads[0][0].position, [0.0, 0.0]);
        assert_eq!(mesh.quads[0][2].position, [200.0, 100.0]);
        assert_eq!(mesh.quads[0][2].uv, [1.0, 1.0]);
    }

    #[test]
    fn test_scale_about_origin() {
        let coords = TextureCoords::for_size(100, 100);
        let mesh = coords.to_mesh(Vec2::new(50.0, 50.0), 0.5);
        assert_eq!(mesh.quads[0][0].position, [25.0, 25.0]);
        assert_eq!(mesh.quads[0][2].position, [75.0, 75.0]);
    }

    #[test]
    fn test_grid_interpolates_bilinearly() {
        let mut coords = TextureCoords::for_size(4, 4);
        coords.grid_size = 4;
        // Pull the top-right corner outward; interior points follow bilinearly
        coords.vertices[1] = Vec2::new(6.0, -2.0);
        let mesh = coords.to_mesh(Vec2::ZERO, 1.0);
        assert_eq!(mesh.quads.len(), 16);
        assert_eq!(mesh.vertex_count(), 96);

        // Centre of the grid is the average of all four corners
        let centre = mesh.quads[5][2];
        let expected = (Vec2::new(-2.0, -2.0)
            + Vec2::new(6.0, -2.0)
            + Vec2::new(2.0, 2.0)
            + Vec2::new(-2.0, 2.0))
            / 4.0;
        assert_eq!(Vec2::from(centre.position), expected);
        assert_eq!(centre.uv, [0.5, 0.5]);
    }

    #[test]
    fn test_triangles_split() {
        let mesh = Mesh::fullscreen(8, 8);
        let tris: Vec<_> = mesh.triangles().collect();
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[1][1].position, [8.0, 8.0]);
    }
}
