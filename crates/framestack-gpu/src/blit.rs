//! Whole-texture draws into a framebuffer.

use crate::backend::{FramebufferId, GraphicsBackend, TextureId};
use crate::binding::FramebufferGuard;
use crate::coords::Mesh;

/// Draw `texture` over the whole of `fbo` and return the framebuffer's
/// texture. The caller's framebuffer binding is preserved. With `clear` the
/// target is wiped to transparent first.
///
/// Returns `None` if `fbo` is unknown to the backend.
pub fn draw_clip(
    backend: &mut dyn GraphicsBackend,
    fbo: FramebufferId,
    texture: TextureId,
    clear: bool,
) -> Option<TextureId> {
    let (width, height) = backend.framebuffer_size(fbo)?;
    let mut target = FramebufferGuard::bind(backend, fbo);
    if clear {
        target.clear([0.0; 4]);
    }
    target.draw_mesh(texture, &Mesh::fullscreen(width, height));
    target.framebuffer_texture(fbo)
}
