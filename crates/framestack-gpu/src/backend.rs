//! The graphics backend seam.
//!
//! The compositor never talks to a GPU API directly. It drives an object
//! implementing [`GraphicsBackend`], which owns textures, framebuffers and
//! linked programs behind plain integer handles and keeps the "current
//! framebuffer" and "current program" bindings as mutable state.

use framestack_core::{FrameBuffer, Result};
use glam::Vec2;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::coords::Mesh;

/// Handle to a texture owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Handle to a framebuffer owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferId(pub u32);

/// Handle to a linked shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Texture sampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFilter {
    #[default]
    Linear,
    Nearest,
}

/// Parameters for [`GraphicsBackend::create_texture`]. Textures are RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub filter: TextureFilter,
    pub label: String,
}

impl TextureDesc {
    pub fn new(width: u32, height: u32, label: impl Into<String>) -> Self {
        Self {
            width,
            height,
            filter: TextureFilter::Linear,
            label: label.into(),
        }
    }
}

/// A value for a named program uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
}

impl Uniform {
    /// Pack into a vec4 slot, the layout the wgpu uniform block uses.
    pub fn to_vec4(self) -> [f32; 4] {
        match self {
            Self::Float(v) => [v, 0.0, 0.0, 0.0],
            Self::Int(v) => [v as f32, 0.0, 0.0, 0.0],
            Self::Vec2([x, y]) => [x, y, 0.0, 0.0],
            Self::Vec4(v) => v,
        }
    }
}

/// Uniform values currently set on a program.
#[derive(Debug, Clone, Default)]
pub struct Uniforms(HashMap<String, Uniform>);

impl Uniforms {
    pub fn set(&mut self, name: &str, value: Uniform) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<Uniform> {
        self.0.get(name).copied()
    }

    /// Scalar uniform, 0.0 when unset.
    pub fn float(&self, name: &str) -> f32 {
        self.get(name).map(|u| u.to_vec4()[0]).unwrap_or(0.0)
    }

    pub fn vec4(&self, name: &str) -> [f32; 4] {
        self.get(name).map(Uniform::to_vec4).unwrap_or([0.0; 4])
    }
}

/// Everything a CPU fragment function can see for one output pixel.
pub struct Fragment<'a> {
    /// Texture coordinate of this pixel in the source, 0..1.
    pub uv: Vec2,
    /// Source colour at `uv`, straight RGBA in 0..1.
    pub color: [f32; 4],
    /// Source texture size in pixels.
    pub size: Vec2,
    pub uniforms: &'a Uniforms,
    /// Sample the source texture at another coordinate.
    pub sample: &'a (dyn Fn(Vec2) -> [f32; 4] + Sync),
}

/// A fragment function evaluated by the software backend.
pub type CpuShaderFn = dyn Fn(&Fragment<'_>) -> [f32; 4] + Send + Sync;

/// Source for a program. Each backend links the variant it understands.
///
/// The WGSL body must define `fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32>`;
/// it may read the uniforms listed in `uniforms` as `param(i)` in list order.
#[derive(Clone)]
pub struct ShaderSource {
    pub label: String,
    pub wgsl: Option<String>,
    pub cpu: Option<Arc<CpuShaderFn>>,
    pub uniforms: Vec<String>,
}

impl ShaderSource {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            wgsl: None,
            cpu: None,
            uniforms: Vec::new(),
        }
    }

    pub fn with_wgsl(mut self, wgsl: impl Into<String>) -> Self {
        self.wgsl = Some(wgsl.into());
        self
    }

    pub fn with_cpu(
        mut self,
        f: impl Fn(&Fragment<'_>) -> [f32; 4] + Send + Sync + 'static,
    ) -> Self {
        self.cpu = Some(Arc::new(f));
        self
    }

    pub fn with_uniforms(mut self, names: &[&str]) -> Self {
        self.uniforms = names.iter().map(|n| n.to_string()).collect();
        self
    }
}

impl fmt::Debug for ShaderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderSource")
            .field("label", &self.label)
            .field("wgsl", &self.wgsl.is_some())
            .field("cpu", &self.cpu.is_some())
            .field("uniforms", &self.uniforms)
            .finish()
    }
}

/// Texture, framebuffer and program primitives the compositor is built on.
///
/// Draw calls target the currently bound framebuffer and shade with the
/// currently bound program. With no program bound, a draw samples the
/// texture and composites it source-over. The built-in
/// [`blend_program`](Self::blend_program) composites using its
/// `blend_mode` (int) and `opacity` (float) uniforms.
pub trait GraphicsBackend {
    // ── Textures ────────────────────────────────────────────────
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId>;

    /// Upload a decoded frame. The frame must match the texture size.
    fn upload_texture(&mut self, texture: TextureId, frame: &FrameBuffer) -> Result<()>;

    fn set_texture_filter(&mut self, texture: TextureId, filter: TextureFilter);

    fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)>;

    fn release_texture(&mut self, texture: TextureId);

    /// Read back tightly packed straight RGBA8.
    fn read_texture(&mut self, texture: TextureId) -> Result<Vec<u8>>;

    // ── Framebuffers ────────────────────────────────────────────
    fn create_framebuffer(&mut self, width: u32, height: u32) -> Result<FramebufferId>;

    /// The colour attachment of a framebuffer.
    fn framebuffer_texture(&self, fbo: FramebufferId) -> Option<TextureId>;

    fn framebuffer_size(&self, fbo: FramebufferId) -> Option<(u32, u32)> {
        self.framebuffer_texture(fbo)
            .and_then(|texture| self.texture_size(texture))
    }

    fn release_framebuffer(&mut self, fbo: FramebufferId);

    fn current_framebuffer(&self) -> FramebufferId;

    fn bind_framebuffer(&mut self, fbo: FramebufferId);

    /// Clear the bound framebuffer to a straight RGBA colour.
    fn clear(&mut self, rgba: [f32; 4]);

    // ── Programs ────────────────────────────────────────────────
    fn link_program(&mut self, source: &ShaderSource) -> Result<ProgramId>;

    fn blend_program(&self) -> ProgramId;

    fn current_program(&self) -> Option<ProgramId>;

    fn bind_program(&mut self, program: Option<ProgramId>);

    /// Set a uniform on the bound program. Ignored with no program bound.
    fn set_uniform(&mut self, name: &str, value: Uniform);

    fn release_program(&mut self, program: ProgramId);

    // ── Drawing ─────────────────────────────────────────────────
    /// Draw `texture` through `mesh` into the bound framebuffer.
    fn draw_mesh(&mut self, texture: TextureId, mesh: &Mesh);
}
