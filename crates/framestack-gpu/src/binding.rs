//! Scoped framebuffer and program bindings.
//!
//! The bound framebuffer and program are shared mutable state on the
//! backend. Every draw in the compositor happens through one of these
//! guards so the caller's binding is back in place when the guard drops,
//! whichever way the scope is left.

use std::ops::{Deref, DerefMut};

use crate::backend::{FramebufferId, GraphicsBackend, ProgramId};

/// Binds a framebuffer for the guard's lifetime.
pub struct FramebufferGuard<'a> {
    backend: &'a mut dyn GraphicsBackend,
    previous: FramebufferId,
}

impl<'a> FramebufferGuard<'a> {
    pub fn bind(backend: &'a mut dyn GraphicsBackend, target: FramebufferId) -> Self {
        let previous = backend.current_framebuffer();
        backend.bind_framebuffer(target);
        Self { backend, previous }
    }

    /// The binding that will be restored.
    pub fn previous(&self) -> FramebufferId {
        self.previous
    }
}

impl<'a> Deref for FramebufferGuard<'a> {
    type Target = dyn GraphicsBackend + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.backend
    }
}

impl<'a> DerefMut for FramebufferGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.backend
    }
}

impl Drop for FramebufferGuard<'_> {
    fn drop(&mut self) {
        self.backend.bind_framebuffer(self.previous);
    }
}

/// Binds a program for the guard's lifetime.
pub struct ProgramGuard<'a> {
    backend: &'a mut dyn GraphicsBackend,
    previous: Option<ProgramId>,
}

impl<'a> ProgramGuard<'a> {
    pub fn bind(backend: &'a mut dyn GraphicsBackend, program: ProgramId) -> Self {
        let previous = backend.current_program();
        backend.bind_program(Some(program));
        Self { backend, previous }
    }
}

impl<'a> Deref for ProgramGuard<'a> {
    type Target = dyn GraphicsBackend + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.backend
    }
}

impl<'a> DerefMut for ProgramGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.backend
    }
}

impl Drop for ProgramGuard<'_> {
    fn drop(&mut self) {
        self.backend.bind_program(self.previous);
    }
}
