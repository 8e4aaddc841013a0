//! CPU implementation of [`GraphicsBackend`].
//!
//! Meshes are rasterised as triangles with a shared-edge fill rule, so
//! adjacent quads of a grid never cover a pixel twice. Rows of the target
//! are shaded in parallel with rayon. Programs are CPU fragment functions.
//!
//! Every draw is appended to a log, which is what the compositor tests use
//! to check pass ordering.

use framestack_core::{memory_budget, FrameBuffer, FramestackError, Result};
use glam::Vec2;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::{
    CpuShaderFn, Fragment, FramebufferId, GraphicsBackend, ProgramId, ShaderSource, TextureDesc,
    TextureFilter, TextureId, Uniform, Uniforms,
};
use crate::blend::BlendMode;
use crate::coords::{Mesh, MeshVertex};
use crate::pool::{ImagePool, Pixel};

struct Image {
    width: u32,
    height: u32,
    filter: TextureFilter,
    pixels: Vec<Pixel>,
}

impl Image {
    fn texel(&self, x: i64, y: i64) -> Pixel {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.pixels[y * self.width as usize + x]
    }

    /// Clamp-to-edge sample at a normalised coordinate.
    fn sample(&self, uv: Vec2) -> Pixel {
        if self.width == 0 || self.height == 0 {
            return [0.0; 4];
        }
        let (w, h) = (self.width as f32, self.height as f32);
        match self.filter {
            TextureFilter::Nearest => {
                self.texel((uv.x * w).floor() as i64, (uv.y * h).floor() as i64)
            }
            TextureFilter::Linear => {
                let x = uv.x * w - 0.5;
                let y = uv.y * h - 0.5;
                let (x0, y0) = (x.floor(), y.floor());
                let (fx, fy) = (x - x0, y - y0);
                let (x0, y0) = (x0 as i64, y0 as i64);
                let p00 = self.texel(x0, y0);
                let p10 = self.texel(x0 + 1, y0);
                let p01 = self.texel(x0, y0 + 1);
                let p11 = self.texel(x0 + 1, y0 + 1);
                let mut out = [0.0; 4];
                for i in 0..4 {
                    let top = p00[i] + (p10[i] - p00[i]) * fx;
                    let bottom = p01[i] + (p11[i] - p01[i]) * fx;
                    out[i] = top + (bottom - top) * fy;
                }
                out
            }
        }
    }
}

enum ProgramKind {
    Blend,
    Fragment(Arc<CpuShaderFn>),
}

struct Program {
    label: String,
    kind: ProgramKind,
    uniforms: Uniforms,
}

enum Shading<'a> {
    Passthrough,
    Blend { mode: BlendMode, opacity: f32 },
    Fragment { f: &'a CpuShaderFn, uniforms: &'a Uniforms },
}

/// One entry of the draw log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRecord {
    pub target: FramebufferId,
    pub source: TextureId,
    /// Label of the bound program, if any.
    pub program: Option<String>,
    pub quads: usize,
}

/// Rasterising backend running entirely on the CPU.
pub struct SoftwareBackend {
    textures: HashMap<TextureId, Image>,
    framebuffers: HashMap<FramebufferId, TextureId>,
    programs: HashMap<ProgramId, Program>,
    bound_fbo: FramebufferId,
    bound_program: Option<ProgramId>,
    output: FramebufferId,
    blend: ProgramId,
    next_id: u32,
    pool: ImagePool,
    rejected: HashSet<String>,
    draws: Vec<DrawRecord>,
}

impl SoftwareBackend {
    /// Create a backend whose output framebuffer is `width` x `height` and
    /// bound.
    pub fn new(width: u32, height: u32) -> Self {
        let mut backend = Self {
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            programs: HashMap::new(),
            bound_fbo: FramebufferId(0),
            bound_program: None,
            output: FramebufferId(0),
            blend: ProgramId(0),
            next_id: 1,
            pool: ImagePool::new(memory_budget::IMAGE_POOL_BUDGET),
            rejected: HashSet::new(),
            draws: Vec::new(),
        };

        backend.blend = ProgramId(backend.allocate_id());
        backend.programs.insert(
            backend.blend,
            Program {
                label: "blend".to_string(),
                kind: ProgramKind::Blend,
                uniforms: Uniforms::default(),
            },
        );
        backend.output = backend.new_framebuffer(width, height);
        backend.bound_fbo = backend.output;
        backend
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn new_image(&mut self, width: u32, height: u32, filter: TextureFilter) -> TextureId {
        let id = TextureId(self.allocate_id());
        let pixels = self.pool.acquire(width, height);
        self.textures.insert(
            id,
            Image {
                width,
                height,
                filter,
                pixels,
            },
        );
        id
    }

    fn new_framebuffer(&mut self, width: u32, height: u32) -> FramebufferId {
        let texture = self.new_image(width, height, TextureFilter::Linear);
        let fbo = FramebufferId(self.allocate_id());
        self.framebuffers.insert(fbo, texture);
        fbo
    }

    /// The framebuffer bound at creation, which receives the final frame.
    pub fn output_framebuffer(&self) -> FramebufferId {
        self.output
    }

    /// Read back the output framebuffer as packed RGBA8.
    pub fn read_output(&mut self) -> Result<Vec<u8>> {
        let texture = self
            .framebuffer_texture(self.output)
            .ok_or_else(|| FramestackError::Internal("output framebuffer missing".into()))?;
        self.read_texture(texture)
    }

    /// Make future links of programs with this label fail.
    pub fn reject_program(&mut self, label: impl Into<String>) {
        self.rejected.insert(label.into());
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn clear_draw_log(&mut self) {
        self.draws.clear();
    }

    /// Live textures, including framebuffer attachments.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    fn shading(&self) -> (Shading<'_>, Option<String>) {
        let Some(program) = self.bound_program.and_then(|id| self.programs.get(&id)) else {
            return (Shading::Passthrough, None);
        };
        let shading = match &program.kind {
            ProgramKind::Blend => Shading::Blend {
                mode: BlendMode::from_index(program.uniforms.float("blend_mode") as i64),
                opacity: program
                    .uniforms
                    .get("opacity")
                    .map(|u| u.to_vec4()[0])
                    .unwrap_or(1.0),
            },
            ProgramKind::Fragment(f) => Shading::Fragment {
                f: f.as_ref(),
                uniforms: &program.uniforms,
            },
        };
        (shading, Some(program.label.clone()))
    }
}

// ── Rasterisation ───────────────────────────────────────────────

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Shared-edge rule: of two triangles sharing an edge, which traverse it in
/// opposite directions, exactly one owns pixels lying on it.
fn owns_edge(w: f32, a: Vec2, b: Vec2) -> bool {
    if w != 0.0 {
        return w > 0.0;
    }
    let d = b - a;
    d.y > 0.0 || (d.y == 0.0 && d.x < 0.0)
}

struct Triangle {
    p: [Vec2; 3],
    uv: [Vec2; 3],
    area: f32,
    min: Vec2,
    max: Vec2,
}

impl Triangle {
    fn new(v: [MeshVertex; 3]) -> Option<Self> {
        let mut p = v.map(|v| Vec2::from(v.position));
        let mut uv = v.map(|v| Vec2::from(v.uv));
        let mut area = edge(p[0], p[1], p[2]);
        if area == 0.0 || !area.is_finite() {
            return None;
        }
        if area < 0.0 {
            p.swap(1, 2);
            uv.swap(1, 2);
            area = -area;
        }
        Some(Self {
            min: p[0].min(p[1]).min(p[2]),
            max: p[0].max(p[1]).max(p[2]),
            p,
            uv,
            area,
        })
    }

    fn uv_at(&self, pt: Vec2) -> Option<Vec2> {
        let [a, b, c] = self.p;
        let w0 = edge(b, c, pt);
        let w1 = edge(c, a, pt);
        let w2 = edge(a, b, pt);
        if !(owns_edge(w0, b, c) && owns_edge(w1, c, a) && owns_edge(w2, a, b)) {
            return None;
        }
        Some((self.uv[0] * w0 + self.uv[1] * w1 + self.uv[2] * w2) / self.area)
    }
}

fn rasterize(target: &mut Image, source: &Image, mesh: &Mesh, shading: &Shading<'_>) {
    let triangles: Vec<Triangle> = mesh.triangles().filter_map(Triangle::new).collect();
    let width = target.width as usize;
    if width == 0 || triangles.is_empty() {
        return;
    }
    let size = Vec2::new(source.width as f32, source.height as f32);
    let sample = |uv: Vec2| source.sample(uv);

    target
        .pixels
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let py = y as f32 + 0.5;
            for tri in &triangles {
                if py < tri.min.y || py > tri.max.y {
                    continue;
                }
                let x0 = tri.min.x.floor().max(0.0) as usize;
                let x1 = (tri.max.x.ceil().max(0.0) as usize).min(width);
                for (x, dst) in row.iter_mut().enumerate().take(x1).skip(x0) {
                    let Some(uv) = tri.uv_at(Vec2::new(x as f32 + 0.5, py)) else {
                        continue;
                    };
                    let color = source.sample(uv);
                    *dst = match shading {
                        Shading::Passthrough => BlendMode::Normal.composite(*dst, color, 1.0),
                        Shading::Blend { mode, opacity } => mode.composite(*dst, color, *opacity),
                        Shading::Fragment { f, uniforms } => {
                            let fragment = Fragment {
                                uv,
                                color,
                                size,
                                uniforms,
                                sample: &sample,
                            };
                            BlendMode::Normal.composite(*dst, f(&fragment), 1.0)
                        }
                    };
                }
            }
        });
}

impl GraphicsBackend for SoftwareBackend {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(FramestackError::InvalidParameter(format!(
                "texture '{}' has zero size",
                desc.label
            )));
        }
        Ok(self.new_image(desc.width, desc.height, desc.filter))
    }

    fn upload_texture(&mut self, texture: TextureId, frame: &FrameBuffer) -> Result<()> {
        let image = self
            .textures
            .get_mut(&texture)
            .ok_or_else(|| FramestackError::NotFound(format!("texture {:?}", texture)))?;
        if frame.width != image.width || frame.height != image.height {
            return Err(FramestackError::Gpu(format!(
                "Frame size {}x{} doesn't match texture size {}x{}",
                frame.width, frame.height, image.width, image.height
            )));
        }
        for (dst, src) in image.pixels.iter_mut().zip(frame.to_rgba8().chunks_exact(4)) {
            *dst = [
                src[0] as f32 / 255.0,
                src[1] as f32 / 255.0,
                src[2] as f32 / 255.0,
                src[3] as f32 / 255.0,
            ];
        }
        Ok(())
    }

    fn set_texture_filter(&mut self, texture: TextureId, filter: TextureFilter) {
        if let Some(image) = self.textures.get_mut(&texture) {
            image.filter = filter;
        }
    }

    fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&texture).map(|i| (i.width, i.height))
    }

    fn release_texture(&mut self, texture: TextureId) {
        if self.framebuffers.values().any(|t| *t == texture) {
            warn!("Refusing to release texture {:?} owned by a framebuffer", texture);
            return;
        }
        if let Some(image) = self.textures.remove(&texture) {
            self.pool.release(image.width, image.height, image.pixels);
        }
    }

    fn read_texture(&mut self, texture: TextureId) -> Result<Vec<u8>> {
        let image = self
            .textures
            .get(&texture)
            .ok_or_else(|| FramestackError::NotFound(format!("texture {:?}", texture)))?;
        Ok(image
            .pixels
            .iter()
            .flat_map(|p| p.map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8))
            .collect())
    }

    fn create_framebuffer(&mut self, width: u32, height: u32) -> Result<FramebufferId> {
        if width == 0 || height == 0 {
            return Err(FramestackError::InvalidParameter(
                "framebuffer has zero size".to_string(),
            ));
        }
        Ok(self.new_framebuffer(width, height))
    }

    fn framebuffer_texture(&self, fbo: FramebufferId) -> Option<TextureId> {
        self.framebuffers.get(&fbo).copied()
    }

    fn release_framebuffer(&mut self, fbo: FramebufferId) {
        if fbo == self.output {
            warn!("Refusing to release the output framebuffer");
            return;
        }
        let Some(texture) = self.framebuffers.remove(&fbo) else {
            return;
        };
        if let Some(image) = self.textures.remove(&texture) {
            self.pool.release(image.width, image.height, image.pixels);
        }
        if self.bound_fbo == fbo {
            self.bound_fbo = self.output;
        }
    }

    fn current_framebuffer(&self) -> FramebufferId {
        self.bound_fbo
    }

    fn bind_framebuffer(&mut self, fbo: FramebufferId) {
        self.bound_fbo = fbo;
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        let Some(texture) = self.framebuffers.get(&self.bound_fbo) else {
            warn!("clear with no valid framebuffer bound ({:?})", self.bound_fbo);
            return;
        };
        if let Some(image) = self.textures.get_mut(texture) {
            image.pixels.fill(rgba);
        }
    }

    fn link_program(&mut self, source: &ShaderSource) -> Result<ProgramId> {
        if self.rejected.contains(&source.label) {
            return Err(FramestackError::Shader(format!(
                "'{}' failed to link",
                source.label
            )));
        }
        let f = source.cpu.clone().ok_or_else(|| {
            FramestackError::Shader(format!("'{}' has no CPU fragment", source.label))
        })?;
        let id = ProgramId(self.allocate_id());
        self.programs.insert(
            id,
            Program {
                label: source.label.clone(),
                kind: ProgramKind::Fragment(f),
                uniforms: Uniforms::default(),
            },
        );
        debug!("Linked program '{}' as {:?}", source.label, id);
        Ok(id)
    }

    fn blend_program(&self) -> ProgramId {
        self.blend
    }

    fn current_program(&self) -> Option<ProgramId> {
        self.bound_program
    }

    fn bind_program(&mut self, program: Option<ProgramId>) {
        self.bound_program = program;
    }

    fn set_uniform(&mut self, name: &str, value: Uniform) {
        if let Some(program) = self.bound_program.and_then(|id| self.programs.get_mut(&id)) {
            program.uniforms.set(name, value);
        }
    }

    fn release_program(&mut self, program: ProgramId) {
        if program == self.blend {
            return;
        }
        self.programs.remove(&program);
        if self.bound_program == Some(program) {
            self.bound_program = None;
        }
    }

    fn draw_mesh(&mut self, texture: TextureId, mesh: &Mesh) {
        let target_fbo = self.bound_fbo;
        let Some(target_tex) = self.framebuffers.get(&target_fbo).copied() else {
            warn!("draw with no valid framebuffer bound ({:?})", target_fbo);
            return;
        };
        if target_tex == texture {
            warn!("Skipping draw that samples its own target {:?}", target_fbo);
            return;
        }
        if !self.textures.contains_key(&texture) {
            warn!("draw from unknown texture {:?}", texture);
            return;
        }
        let Some(mut target) = self.textures.remove(&target_tex) else {
            return;
        };

        let (shading, program) = self.shading();
        if let Some(source) = self.textures.get(&texture) {
            rasterize(&mut target, source, mesh, &shading);
        }
        self.textures.insert(target_tex, target);

        self.draws.push(DrawRecord {
            target: target_fbo,
            source: texture,
            program,
            quads: mesh.quads.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::TextureCoords;

    fn solid(backend: &mut SoftwareBackend, w: u32, h: u32, rgba: [u8; 4]) -> TextureId {
        let tex = backend.create_texture(&TextureDesc::new(w, h, "solid")).unwrap();
        backend.upload_texture(tex, &FrameBuffer::solid(w, h, rgba)).unwrap();
        tex
    }

    fn pixel(data: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * width + x) * 4) as usize;
        [data[i], data[i + 1], data[i + 2], data[i + 3]]
    }

    #[test]
    fn test_fullscreen_draw_copies_exactly() {
        let mut backend = SoftwareBackend::new(8, 8);
        let pattern = backend.create_texture(&TextureDesc::new(8, 8, "bars")).unwrap();
        backend
            .upload_texture(pattern, &FrameBuffer::test_pattern(8, 8))
            .unwrap();
        backend.draw_mesh(pattern, &Mesh::fullscreen(8, 8));

        let out = backend.read_output().unwrap();
        assert_eq!(out, FrameBuffer::test_pattern(8, 8).to_rgba8());
    }

    #[test]
    fn test_grid_covers_each_pixel_once() {
        // Half-transparent source: any pixel covered twice would come out darker
        let mut backend = SoftwareBackend::new(16, 16);
        let src = solid(&mut backend, 16, 16, [255, 255, 255, 128]);
        let mut coords = TextureCoords::for_size(16, 16);
        coords.grid_size = 4;
        backend.draw_mesh(src, &coords.to_mesh(Vec2::new(8.0, 8.0), 1.0));

        let out = backend.read_output().unwrap();
        let first = pixel(&out, 16, 0, 0);
        assert!(out.chunks_exact(4).all(|p| p == first));
        assert_eq!(first[3], 128);
    }

    #[test]
    fn test_partial_quad_leaves_rest_untouched() {
        let mut backend = SoftwareBackend::new(8, 8);
        backend.clear([0.0, 0.0, 1.0, 1.0]);
        let red = solid(&mut backend, 2, 2, [255, 0, 0, 255]);
        let coords = TextureCoords::for_size(4, 4);
        backend.draw_mesh(red, &coords.to_mesh(Vec2::new(2.0, 2.0), 1.0));

        let out = backend.read_output().unwrap();
        assert_eq!(pixel(&out, 8, 1, 1), [255, 0, 0, 255]);
        assert_eq!(pixel(&out, 8, 5, 5), [0, 0, 255, 255]);
    }

    #[test]
    fn test_blend_program_uses_uniforms() {
        let mut backend = SoftwareBackend::new(4, 4);
        backend.clear([0.0, 0.0, 0.0, 1.0]);
        let white = solid(&mut backend, 4, 4, [255, 255, 255, 255]);
        backend.bind_program(Some(backend.blend_program()));
        backend.set_uniform("blend_mode", Uniform::Int(BlendMode::Normal.index()));
        backend.set_uniform("opacity", Uniform::Float(0.5));
        backend.draw_mesh(white, &Mesh::fullscreen(4, 4));

        let out = backend.read_output().unwrap();
        assert_eq!(pixel(&out, 4, 2, 2), [128, 128, 128, 255]);
        assert_eq!(backend.draws()[0].program.as_deref(), Some("blend"));
    }

    #[test]
    fn test_fragment_program() {
        let mut backend = SoftwareBackend::new(4, 4);
        let src = solid(&mut backend, 4, 4, [255, 0, 0, 255]);
        let invert = ShaderSource::new("invert").with_cpu(|f: &Fragment<'_>| {
            [1.0 - f.color[0], 1.0 - f.color[1], 1.0 - f.color[2], f.color[3]]
        });
        let program = backend.link_program(&invert).unwrap();
        backend.bind_program(Some(program));
        backend.draw_mesh(src, &Mesh::fullscreen(4, 4));

        let out = backend.read_output().unwrap();
        assert_eq!(pixel(&out, 4, 0, 0), [0, 255, 255, 255]);
    }

    #[test]
    fn test_link_failures() {
        let mut backend = SoftwareBackend::new(4, 4);
        let no_cpu = ShaderSource::new("gpu-only").with_wgsl("fn effect() {}");
        assert!(backend.link_program(&no_cpu).is_err());

        backend.reject_program("broken");
        let broken = ShaderSource::new("broken").with_cpu(|f: &Fragment<'_>| f.color);
        assert!(matches!(
            backend.link_program(&broken),
            Err(FramestackError::Shader(_))
        ));
    }

    #[test]
    fn test_self_sampling_draw_is_skipped() {
        let mut backend = SoftwareBackend::new(4, 4);
        let fbo = backend.create_framebuffer(4, 4).unwrap();
        let tex = backend.framebuffer_texture(fbo).unwrap();
        backend.bind_framebuffer(fbo);
        backend.draw_mesh(tex, &Mesh::fullscreen(4, 4));
        assert!(backend.draws().is_empty());
    }

    #[test]
    fn test_release_returns_storage() {
        let mut backend = SoftwareBackend::new(4, 4);
        let before = backend.texture_count();
        let fbo = backend.create_framebuffer(8, 8).unwrap();
        backend.bind_framebuffer(fbo);
        backend.release_framebuffer(fbo);
        assert_eq!(backend.texture_count(), before);
        assert_eq!(backend.current_framebuffer(), backend.output_framebuffer());
        assert_eq!(backend.pool.buffer_count(), 1);
    }

    #[test]
    fn test_upload_size_mismatch() {
        let mut backend = SoftwareBackend::new(4, 4);
        let tex = backend.create_texture(&TextureDesc::new(4, 4, "t")).unwrap();
        assert!(backend
            .upload_texture(tex, &FrameBuffer::solid(2, 2, [0; 4]))
            .is_err());
    }
}
