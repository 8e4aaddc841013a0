//! Framestack Timeline - sequences, clips and the media they reference
//!
//! A [`Sequence`] owns its clips. Each [`Clip`] sits on a signed
//! [`TrackIndex`] (negative for video, non-negative for audio) and points
//! at [`Media`]: a footage stream or another sequence nested inside it.

pub mod clip;
pub mod media;
pub mod playback;
pub mod sequence;
pub mod track;

pub use clip::{Clip, ClipResources};
pub use media::{Footage, FootageStream, Media};
pub use playback::PlaybackState;
pub use sequence::{Sequence, SharedSequence};
pub use track::TrackIndex;
