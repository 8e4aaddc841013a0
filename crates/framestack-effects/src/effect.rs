//! Effects and the processor trait behind them.

use framestack_core::{FrameBuffer, RationalTime};
use framestack_gpu::{
    GraphicsBackend, ProgramId, ShaderSource, TextureCoords, TextureDesc, TextureId, Uniform,
};
use glam::Vec2;
use std::fmt;
use std::ops::BitOr;
use tracing::{debug, warn};

use crate::field::{EffectField, EffectRow, FieldValues};
use crate::gizmo::Gizmo;

/// What an effect does to a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Moves vertices or UVs, or changes blend mode, opacity or grid size.
    pub coords: bool,
    /// Runs a fragment program over the composite.
    pub shader: bool,
    /// Draws a generated texture over the composite.
    pub superimpose: bool,
    /// Exposes on-screen handles.
    pub gizmos: bool,
}

impl Capabilities {
    pub const NONE: Self = Self {
        coords: false,
        shader: false,
        superimpose: false,
        gizmos: false,
    };
    pub const COORDS: Self = Self {
        coords: true,
        ..Self::NONE
    };
    pub const SHADER: Self = Self {
        shader: true,
        ..Self::NONE
    };
    pub const SUPERIMPOSE: Self = Self {
        superimpose: true,
        ..Self::NONE
    };
    pub const GIZMOS: Self = Self {
        gizmos: true,
        ..Self::NONE
    };

    pub const fn union(self, other: Self) -> Self {
        Self {
            coords: self.coords || other.coords,
            shader: self.shader || other.shader,
            superimpose: self.superimpose || other.superimpose,
            gizmos: self.gizmos || other.gizmos,
        }
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// How a transition's progress is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionRole {
    /// A regular effect in the chain.
    #[default]
    None,
    /// Playing in at the start of a clip.
    Opening,
    /// Playing out at the end of a clip.
    Closing,
}

/// Inputs to a processor for one application.
pub struct EffectContext<'a> {
    /// Seconds into the clip.
    pub time: RationalTime,
    /// Transition progress in 0..1; 0 for regular effects.
    pub progress: f32,
    pub role: TransitionRole,
    pub values: &'a FieldValues,
    /// Size of the clip's composite in pixels.
    pub size: (u32, u32),
}

impl EffectContext<'_> {
    pub fn value(&self, id: &str, default: f32) -> f32 {
        self.values.f32(id, default)
    }

    pub fn size_vec(&self) -> Vec2 {
        Vec2::new(self.size.0 as f32, self.size.1 as f32)
    }

    /// How much of the effect is visible: rises 0→1 over an opening
    /// transition and falls 1→0 over a closing one.
    pub fn presence(&self) -> f32 {
        match self.role {
            TransitionRole::Opening => self.progress,
            TransitionRole::Closing => 1.0 - self.progress,
            TransitionRole::None => 1.0,
        }
    }
}

/// The behaviour of an effect. Stateless; parameters arrive through
/// [`EffectContext::values`].
pub trait EffectProcessor: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Parameter layout with default values.
    fn rows(&self) -> Vec<EffectRow>;

    fn process_coords(&self, _ctx: &EffectContext<'_>, _coords: &mut TextureCoords) {}

    /// Program source, linked lazily the first time the shader pass runs.
    fn shader(&self) -> Option<ShaderSource> {
        None
    }

    /// Uniform values for the shader pass.
    fn uniforms(&self, _ctx: &EffectContext<'_>) -> Vec<(&'static str, Uniform)> {
        Vec::new()
    }

    /// Generate the superimposed image, or `None` if it is unavailable.
    fn superimpose(&self, _ctx: &EffectContext<'_>) -> Option<FrameBuffer> {
        None
    }

    /// Handles in clip space, given the clip's final coordinates.
    fn gizmos(&self, _ctx: &EffectContext<'_>, _coords: &TextureCoords) -> Vec<Gizmo> {
        Vec::new()
    }

    fn clone_box(&self) -> Box<dyn EffectProcessor>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgramState {
    Unlinked,
    Linked(ProgramId),
    Failed,
}

/// An effect instance in a clip's chain.
pub struct Effect {
    processor: Box<dyn EffectProcessor>,
    pub enabled: bool,
    /// Selected in the effect controls; gizmo editing goes to this effect.
    pub selected: bool,
    rows: Vec<EffectRow>,
    program: ProgramState,
    superimposed: Option<TextureId>,
}

impl Effect {
    pub fn new(processor: impl EffectProcessor + 'static) -> Self {
        Self::from_boxed(Box::new(processor))
    }

    pub fn from_boxed(processor: Box<dyn EffectProcessor>) -> Self {
        let rows = processor.rows();
        Self {
            processor,
            enabled: true,
            selected: false,
            rows,
            program: ProgramState::Unlinked,
            superimposed: None,
        }
    }

    pub fn name(&self) -> &str {
        self.processor.name()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.processor.capabilities()
    }

    pub fn processor(&self) -> &dyn EffectProcessor {
        self.processor.as_ref()
    }

    pub fn rows(&self) -> &[EffectRow] {
        &self.rows
    }

    pub fn fields(&self) -> impl Iterator<Item = &EffectField> {
        self.rows.iter().flat_map(|r| r.fields.iter())
    }

    pub fn field(&self, id: &str) -> Option<&EffectField> {
        self.fields().find(|f| f.id() == id)
    }

    pub fn field_mut(&mut self, id: &str) -> Option<&mut EffectField> {
        self.rows
            .iter_mut()
            .flat_map(|r| r.fields.iter_mut())
            .find(|f| f.id() == id)
    }

    /// Set a field to a constant. Returns false if there is no such field.
    pub fn set_value(&mut self, id: &str, value: f64) -> bool {
        match self.field_mut(id) {
            Some(field) => {
                field.set_constant(value);
                true
            }
            None => false,
        }
    }

    /// Builder form of [`set_value`](Self::set_value).
    pub fn with_value(mut self, id: &str, value: f64) -> Self {
        self.set_value(id, value);
        self
    }

    pub fn values_at(&self, time: RationalTime) -> FieldValues {
        let mut values = FieldValues::new();
        for field in self.fields() {
            values.insert(field.id(), field.value_at(time));
        }
        values
    }

    /// Refresh the live value of every field at `time`.
    pub fn refresh(&mut self, time: RationalTime) {
        for field in self.rows.iter_mut().flat_map(|r| r.fields.iter_mut()) {
            field.refresh(time);
        }
    }

    /// Whether the shader program is linked. False until the first shader
    /// pass, and after a failed link.
    pub fn is_shader_linked(&self) -> bool {
        matches!(self.program, ProgramState::Linked(_))
    }

    /// Link the program on first use. A failed link is not retried until
    /// [`release`](Self::release).
    pub(crate) fn ensure_program(&mut self, backend: &mut dyn GraphicsBackend) -> Option<ProgramId> {
        match self.program {
            ProgramState::Linked(id) => return Some(id),
            ProgramState::Failed => return None,
            ProgramState::Unlinked => {}
        }

        let Some(source) = self.processor.shader() else {
            self.program = ProgramState::Failed;
            return None;
        };
        match backend.link_program(&source) {
            Ok(id) => {
                debug!(effect = self.name(), "linked shader program {:?}", id);
                self.program = ProgramState::Linked(id);
                Some(id)
            }
            Err(e) => {
                warn!(effect = self.name(), "shader link failed: {}", e);
                self.program = ProgramState::Failed;
                None
            }
        }
    }

    /// Generate and upload the superimposed image. The texture is kept and
    /// reused while its size is unchanged.
    pub(crate) fn superimpose_texture(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        ctx: &EffectContext<'_>,
    ) -> Option<TextureId> {
        let frame = self.processor.superimpose(ctx)?;
        let size = (frame.width, frame.height);

        let texture = match self.superimposed {
            Some(texture) if backend.texture_size(texture) == Some(size) => texture,
            stale => {
                if let Some(texture) = stale {
                    backend.release_texture(texture);
                }
                self.superimposed = None;
                let desc = TextureDesc::new(size.0, size.1, format!("{} superimpose", self.name()));
                match backend.create_texture(&desc) {
                    Ok(texture) => texture,
                    Err(e) => {
                        warn!(effect = self.name(), "superimpose texture: {}", e);
                        return None;
                    }
                }
            }
        };
        self.superimposed = Some(texture);

        if let Err(e) = backend.upload_texture(texture, &frame) {
            warn!(effect = self.name(), "superimpose upload: {}", e);
            return None;
        }
        Some(texture)
    }

    /// Handles at `time` for a clip drawn with `coords`.
    pub fn gizmos(&self, time: RationalTime, size: (u32, u32), coords: &TextureCoords) -> Vec<Gizmo> {
        if !self.capabilities().gizmos {
            return Vec::new();
        }
        let values = self.values_at(time);
        let ctx = EffectContext {
            time,
            progress: 0.0,
            role: TransitionRole::None,
            values: &values,
            size,
        };
        self.processor.gizmos(&ctx, coords)
    }

    /// Release the program and textures this effect holds. The next shader
    /// pass links again.
    pub fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        if let ProgramState::Linked(id) = self.program {
            backend.release_program(id);
        }
        if let Some(texture) = self.superimposed.take() {
            backend.release_texture(texture);
        }
        self.program = ProgramState::Unlinked;
    }
}

/// Copies parameters and keyframes. GPU state is not shared; the copy
/// links its own program on first use.
impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            processor: self.processor.clone_box(),
            enabled: self.enabled,
            selected: self.selected,
            rows: self.rows.clone(),
            program: ProgramState::Unlinked,
            superimposed: None,
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("name", &self.name())
            .field("enabled", &self.enabled)
            .field("selected", &self.selected)
            .field("program", &self.program)
            .finish()
    }
}
