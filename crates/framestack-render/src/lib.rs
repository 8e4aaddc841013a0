//! Framestack Render - turns a sequence into a frame
//!
//! Per output frame the surrounding application calls two things on a
//! [`Compositor`]:
//! - [`Compositor::compose_video_frame`]: select the active video clips,
//!   composite them back to front (recursing into nested sequences) and
//!   leave the result in the bound framebuffer
//! - [`Compositor::compose_audio`]: select the audible clips and have the
//!   audio device cache their samples
//!
//! Neither returns an error. Per-clip problems come back in a
//! [`FrameHealth`](framestack_core::FrameHealth) whose `retry` flag says
//! the frame should be composed again.

pub mod activation;
pub mod audio;
pub mod compose;
pub mod params;

pub use activation::{is_clip_active, select_active_clips, Activation};
pub use audio::{AudioOutcome, AudioPass};
pub use compose::{autoscale_factor, ActiveGizmo, ComposeOutcome, Compositor};
pub use params::{Ancestor, AncestorChain, PassKind, RenderMode};
