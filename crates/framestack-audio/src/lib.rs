//! Framestack Audio - the audio side of the compositor
//!
//! The compositor asks an [`AudioDevice`] to cache audio for every audible
//! clip at the playhead. [`AudioEngine`] is the shipped device:
//! - `SampleSource`: produces samples for a clip
//! - `Mixer`: combines tracks with volume/pan/solo/mute
//! - `RingBuffer`: lock-free SPSC buffer between the mixer and the output callback

pub mod device;
pub mod engine;
pub mod mixer;
pub mod ring_buffer;
pub mod source;

pub use device::{AudioDevice, CacheRequest, DisconnectedDevice};
pub use engine::AudioEngine;
pub use mixer::{Mixer, MixerChannel};
pub use ring_buffer::RingBuffer;
pub use source::{SampleSource, Silence, Tone};

/// Whether the host has a default output device.
#[cfg(feature = "cpal")]
pub fn probe_output_device() -> bool {
    use cpal::traits::HostTrait;
    let found = cpal::default_host().default_output_device().is_some();
    tracing::info!("Default audio output device present: {}", found);
    found
}
