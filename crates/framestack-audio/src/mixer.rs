//! Track mixer. One channel per audio track, mixed down to interleaved
//! stereo and queued for output.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ring_buffer::RingBuffer;

/// Settings of one audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerChannel {
    /// Linear gain, 0..1.
    pub volume: f32,
    /// -1 full left, 0 centre, 1 full right.
    pub pan: f32,
    pub muted: bool,
    pub solo: bool,
}

impl Default for MixerChannel {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pan: 0.0,
            muted: false,
            solo: false,
        }
    }
}

impl MixerChannel {
    /// Left/right gain under constant-power panning.
    pub fn stereo_gain(&self) -> (f32, f32) {
        if self.muted {
            return (0.0, 0.0);
        }
        let angle = (self.pan.clamp(-1.0, 1.0) + 1.0) * std::f32::consts::FRAC_PI_4;
        (self.volume * angle.cos(), self.volume * angle.sin())
    }
}

pub struct Mixer {
    channels: Vec<MixerChannel>,
    pub master_volume: f32,
    /// Hard-clip the mix to `limiter_threshold`.
    pub limiter_enabled: bool,
    pub limiter_threshold: f32,
    pub output_buffer: Arc<RingBuffer>,
    scratch: Vec<f32>,
    peak: f32,
}

impl Mixer {
    /// A mixer with `num_channels` tracks and room for `buffer_size`
    /// queued samples.
    pub fn new(num_channels: usize, buffer_size: usize) -> Self {
        Self {
            channels: vec![MixerChannel::default(); num_channels],
            master_volume: 1.0,
            limiter_enabled: true,
            limiter_threshold: 1.0,
            output_buffer: Arc::new(RingBuffer::new(buffer_size)),
            scratch: Vec::new(),
            peak: 0.0,
        }
    }

    pub fn channel(&self, index: usize) -> Option<&MixerChannel> {
        self.channels.get(index)
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut MixerChannel> {
        self.channels.get_mut(index)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Grow to at least `count` channels. New channels take defaults.
    pub fn ensure_channels(&mut self, count: usize) {
        if self.channels.len() < count {
            self.channels.resize(count, MixerChannel::default());
        }
    }

    /// Loudest absolute sample of the last mix.
    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Mix `frame_count` stereo frames and queue them for output.
    ///
    /// `sources[i]` is interleaved stereo for channel `i`; short or missing
    /// sources contribute silence. Returns the number of samples queued,
    /// which is less than `frame_count * 2` when the output is full.
    pub fn mix(&mut self, sources: &[&[f32]], frame_count: usize) -> usize {
        let len = frame_count * 2;
        self.scratch.clear();
        self.scratch.resize(len, 0.0);

        let any_solo = self.channels.iter().any(|c| c.solo);
        for (channel, source) in self.channels.iter().zip(sources) {
            if any_solo && !channel.solo {
                continue;
            }
            let (left, right) = channel.stereo_gain();
            for (out, frame) in self.scratch.chunks_exact_mut(2).zip(source.chunks_exact(2)) {
                out[0] += frame[0] * left;
                out[1] += frame[1] * right;
            }
        }

        let threshold = self.limiter_threshold;
        let mut peak = 0.0f32;
        for s in &mut self.scratch {
            *s *= self.master_volume;
            if self.limiter_enabled {
                *s = s.clamp(-threshold, threshold);
            }
            peak = peak.max(s.abs());
        }
        self.peak = peak;

        self.output_buffer.write(&self.scratch)
    }
}
