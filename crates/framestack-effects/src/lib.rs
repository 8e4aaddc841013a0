//! Framestack Effects - effect chains, transitions and built-ins
//!
//! An [`Effect`] wraps an [`EffectProcessor`] together with its keyframed
//! parameter rows and the GPU state it owns. [`apply_effect`] runs one
//! effect against a clip's texture-coordinate quad and ping-pong buffers.
//! A [`Transition`] is an effect with a length, applied with a progress
//! value at the start or end of a clip.

pub mod apply;
pub mod builtin;
pub mod effect;
pub mod field;
pub mod gizmo;
pub mod registry;
pub mod transition;
pub mod transitions;

pub use apply::{apply_effect, EffectTime};
pub use effect::{Capabilities, Effect, EffectContext, EffectProcessor, TransitionRole};
pub use field::{EffectField, EffectRow, FieldValues};
pub use gizmo::{Gizmo, GizmoKind};
pub use registry::EffectRegistry;
pub use transition::{transition_progress, Transition, TransitionRegistry};
