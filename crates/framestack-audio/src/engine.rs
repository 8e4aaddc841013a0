//! The shipped audio device.

use framestack_core::{FrameNumber, FrameRate};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::device::{AudioDevice, CacheRequest};
use crate::mixer::Mixer;
use crate::ring_buffer::RingBuffer;
use crate::source::SampleSource;

struct EngineState {
    mixer: Mixer,
    /// Samples cached this pass, per audio track.
    staged: BTreeMap<usize, Vec<f32>>,
    /// Last playhead cached per clip.
    last_cached: HashMap<Uuid, FrameNumber>,
}

/// Caches one sequence frame of audio per clip and request, mixes the
/// tracks on [`flush`](AudioDevice::flush) and queues the result for the
/// output callback.
pub struct AudioEngine {
    sample_rate: u32,
    available: bool,
    source: Arc<dyn SampleSource>,
    state: Mutex<EngineState>,
}

impl AudioEngine {
    pub fn new(source: Arc<dyn SampleSource>) -> Self {
        Self::with_sample_rate(source, 48_000)
    }

    pub fn with_sample_rate(source: Arc<dyn SampleSource>, sample_rate: u32) -> Self {
        info!("Initializing audio engine at {} Hz", sample_rate);
        // A second of stereo
        let buffer_samples = sample_rate as usize * 2;
        Self {
            sample_rate,
            available: true,
            source,
            state: Mutex::new(EngineState {
                mixer: Mixer::new(0, buffer_samples),
                staged: BTreeMap::new(),
                last_cached: HashMap::new(),
            }),
        }
    }

    /// Report whether an output device exists. Defaults to present.
    pub fn with_availability(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Probe the host for an output device.
    #[cfg(feature = "cpal")]
    pub fn with_device_probe(self) -> Self {
        self.with_availability(crate::probe_output_device())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Stereo frames per frame of a sequence at `rate`.
    pub fn samples_per_frame(&self, rate: FrameRate) -> usize {
        let num = u64::from(rate.numerator.max(1));
        let den = u64::from(rate.denominator);
        ((u64::from(self.sample_rate) * den + num / 2) / num) as usize
    }

    pub fn output_buffer(&self) -> Arc<RingBuffer> {
        Arc::clone(&self.state.lock().mixer.output_buffer)
    }

    /// Run `f` with the mixer, e.g. to set track volumes.
    pub fn with_mixer<R>(&self, f: impl FnOnce(&mut Mixer) -> R) -> R {
        f(&mut self.state.lock().mixer)
    }

    /// Drop everything queued and forget what was cached.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.staged.clear();
        state.last_cached.clear();
        state.mixer.output_buffer.clear();
        info!("Audio engine stopped");
    }
}

impl AudioDevice for AudioEngine {
    fn is_available(&self) -> bool {
        self.available
    }

    fn cache_audio(&self, request: &CacheRequest<'_>) {
        let clip = request.clip;
        let mut state = self.state.lock();

        if request.reset {
            debug!(clip = %clip.name, "audio reset");
            state.last_cached.remove(&clip.id);
            state.staged.clear();
            state.mixer.output_buffer.clear();
        }
        if state.last_cached.get(&clip.id) == Some(&request.playhead) {
            return;
        }
        state.last_cached.insert(clip.id, request.playhead);

        let mut frames = self.samples_per_frame(request.rate);
        if request.scrubbing {
            // A short grain is enough to hear where the playhead is
            frames = (frames / 4).max(1);
        }
        let mut samples = vec![0.0f32; frames * 2];
        let position = clip.source_seconds(request.playhead, request.rate);
        self.source.read(clip, position, self.sample_rate, &mut samples);
        if request.playback_speed < 0.0 {
            reverse_frames(&mut samples);
        }

        let track = usize::try_from(clip.track.0).unwrap_or(0);
        let staged = state.staged.entry(track).or_default();
        if staged.len() < samples.len() {
            staged.resize(samples.len(), 0.0);
        }
        for (out, s) in staged.iter_mut().zip(&samples) {
            *out += s;
        }
    }

    fn flush(&self) {
        let mut state = self.state.lock();
        let staged = std::mem::take(&mut state.staged);
        let Some(&last_track) = staged.keys().next_back() else {
            return;
        };
        let frame_count = staged.values().map(|s| s.len() / 2).max().unwrap_or(0);

        state.mixer.ensure_channels(last_track + 1);
        let mut sources: Vec<&[f32]> = vec![&[]; last_track + 1];
        for (&track, samples) in &staged {
            sources[track] = samples.as_slice();
        }
        let queued = state.mixer.mix(&sources, frame_count);
        debug!(tracks = staged.len(), frame_count, queued, "mixed audio");
    }
}

/// Reverse the order of stereo frames, keeping channels in place.
fn reverse_frames(samples: &mut [f32]) {
    let frames = samples.len() / 2;
    for i in 0..frames / 2 {
        let j = frames - 1 - i;
        samples.swap(2 * i, 2 * j);
        samples.swap(2 * i + 1, 2 * j + 1);
    }
}
