//! Sample producers.

use framestack_timeline::Clip;
use std::f64::consts::TAU;

/// Produces interleaved stereo samples for a clip.
pub trait SampleSource: Send + Sync {
    /// Fill `out` with samples of `clip` starting `position` seconds into
    /// its media.
    fn read(&self, clip: &Clip, position: f64, sample_rate: u32, out: &mut [f32]);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl SampleSource for Silence {
    fn read(&self, _clip: &Clip, _position: f64, _sample_rate: u32, out: &mut [f32]) {
        out.fill(0.0);
    }
}

/// A sine wave, the same on both channels. Phase follows the media
/// position, so consecutive reads join up.
#[derive(Debug, Clone, Copy)]
pub struct Tone {
    pub frequency: f64,
    pub amplitude: f32,
}

impl Tone {
    pub fn new(frequency: f64, amplitude: f32) -> Self {
        Self {
            frequency,
            amplitude,
        }
    }
}

impl Default for Tone {
    fn default() -> Self {
        Self::new(440.0, 0.25)
    }
}

impl SampleSource for Tone {
    fn read(&self, _clip: &Clip, position: f64, sample_rate: u32, out: &mut [f32]) {
        let rate = f64::from(sample_rate.max(1));
        for (i, frame) in out.chunks_exact_mut(2).enumerate() {
            let t = position + i as f64 / rate;
            let s = (TAU * self.frequency * t).sin() as f32 * self.amplitude;
            frame[0] = s;
            frame[1] = s;
        }
    }
}
