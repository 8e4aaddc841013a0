//! Framestack GPU - graphics backend seam and render-target plumbing
//!
//! The compositor draws through the [`GraphicsBackend`] trait. Two
//! implementations ship: [`SoftwareBackend`], a rayon rasteriser that runs
//! anywhere, and `WgpuBackend` behind the `wgpu` feature.

pub mod backend;
pub mod binding;
pub mod blend;
pub mod blit;
pub mod coords;
pub mod pingpong;
pub mod pool;
pub mod software;

#[cfg(feature = "wgpu")]
pub mod context;
#[cfg(feature = "wgpu")]
pub mod wgpu_backend;

pub use backend::{
    CpuShaderFn, Fragment, FramebufferId, GraphicsBackend, ProgramId, ShaderSource, TextureDesc,
    TextureFilter, TextureId, Uniform, Uniforms,
};
pub use binding::{FramebufferGuard, ProgramGuard};
pub use blend::BlendMode;
pub use blit::draw_clip;
pub use coords::{Mesh, MeshVertex, TextureCoords};
pub use pingpong::{Buffer, PingPong};
pub use software::{DrawRecord, SoftwareBackend};

#[cfg(feature = "wgpu")]
pub use context::GpuContext;
#[cfg(feature = "wgpu")]
pub use wgpu_backend::WgpuBackend;
