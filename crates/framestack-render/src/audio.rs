//! The audio path.
//!
//! Walks the audio tracks the way the compositor walks video tracks, but
//! instead of drawing it asks the audio device to cache a frame's worth of
//! samples per clip. Clips whose cache lock is held by a decoder worker are
//! skipped for this pass rather than waited on.

use framestack_audio::CacheRequest;
use framestack_core::{FrameHealth, FrameNumber, FrameRate, RenderIssue};
use framestack_timeline::{Clip, Sequence};
use tracing::{debug, trace};

use crate::activation::select_active_clips;
use crate::compose::Compositor;
use crate::params::{Ancestor, AncestorChain, PassKind, RenderMode};

/// How an audio pass was triggered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioPass {
    /// Transport is playing (or rendering); cache every audible clip.
    pub render_audio: bool,
    pub playback_speed: f64,
    /// The playhead is being dragged. Only caches when scrubbing is enabled
    /// in the config.
    pub scrubbing: bool,
    pub mode: RenderMode,
}

impl AudioPass {
    pub fn playback(playback_speed: f64) -> Self {
        Self {
            render_audio: true,
            playback_speed,
            scrubbing: false,
            mode: RenderMode::Preview,
        }
    }

    pub fn scrub() -> Self {
        Self {
            render_audio: false,
            playback_speed: 1.0,
            scrubbing: true,
            mode: RenderMode::Preview,
        }
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioOutcome {
    /// Active clips on audio tracks, nested sequences included.
    pub active_clips: usize,
    /// Clips handed to the audio device.
    pub cached: usize,
    /// Clips skipped because their cache lock was busy.
    pub skipped_locked: usize,
    /// Nothing is audible, so the playback clock has to be driven by
    /// something else.
    pub wake_playback: bool,
    pub health: FrameHealth,
}

impl Compositor {
    /// Cache the audio of every audible clip of `sequence` at its playhead.
    pub fn compose_audio(&self, sequence: &mut Sequence, pass: AudioPass) -> AudioOutcome {
        let mut outcome = AudioOutcome::default();
        let root_playhead = sequence.playhead;
        self.audio_sequence(
            sequence,
            root_playhead,
            pass,
            root_playhead,
            &AncestorChain::root(),
            &mut outcome,
        );

        if outcome.cached > 0 {
            self.audio.flush();
        }
        outcome.wake_playback = outcome.active_clips == 0;
        debug!(
            sequence = %sequence.name,
            playhead = root_playhead,
            active = outcome.active_clips,
            cached = outcome.cached,
            skipped = outcome.skipped_locked,
            "composed audio"
        );
        outcome
    }

    /// `playhead` is in `sequence`'s own rate. Nested sequences are walked
    /// at their mapped playhead and keep the one they were left at.
    fn audio_sequence(
        &self,
        sequence: &mut Sequence,
        playhead: FrameNumber,
        pass: AudioPass,
        root_playhead: FrameNumber,
        ancestors: &AncestorChain<'_>,
        outcome: &mut AudioOutcome,
    ) {
        let activation = select_active_clips(
            sequence,
            playhead,
            PassKind::Audio,
            pass.mode,
            self.decoder.as_ref(),
            self.audio.is_available(),
            &mut outcome.health,
        );
        outcome.active_clips += activation.audio_clips;

        let (id, rate) = (sequence.id(), sequence.frame_rate);
        for &index in &activation.active {
            let clip = &mut sequence.clips[index];
            let audible = pass.render_audio
                || (self.config.audio_scrubbing && pass.scrubbing && root_playhead > clip.timeline_in);

            if audible {
                if let Some(shared) = clip.nested().cloned() {
                    if shared.id() == id || ancestors.contains_sequence(shared.id()) {
                        outcome.health.report(RenderIssue::NestingCycle {
                            sequence: clip.name.clone(),
                        });
                    } else if let Some(mut inner) = shared.try_lock() {
                        let nested_playhead = clip.nested_playhead(playhead, rate, inner.frame_rate);
                        let chain = ancestors.extend(Ancestor {
                            sequence: id,
                            clip: clip.id,
                            target: None,
                        });
                        self.audio_sequence(&mut inner, nested_playhead, pass, root_playhead, &chain, outcome);
                    } else {
                        // Held by another thread, not by this walk
                        trace!(clip = %clip.name, "nested sequence busy, skipping");
                        outcome.health.report(RenderIssue::NotReady {
                            clip: clip.name.clone(),
                        });
                    }
                } else {
                    self.cache_clip(clip, playhead, rate, pass, outcome);
                }
            }

            // Keyframe readouts only matter for the sequence on screen
            if ancestors.is_root() {
                let timecode = clip.timecode(playhead, rate);
                clip.refresh_keyframes(timecode);
            }
        }
    }

    fn cache_clip(
        &self,
        clip: &Clip,
        playhead: FrameNumber,
        rate: FrameRate,
        pass: AudioPass,
        outcome: &mut AudioOutcome,
    ) {
        let Some(_lock) = clip.playback.try_lock_cache() else {
            trace!(clip = %clip.name, "cache lock busy, skipping");
            outcome.skipped_locked += 1;
            return;
        };
        self.audio.cache_audio(&CacheRequest {
            clip,
            playhead,
            rate,
            reset: clip.playback.take_audio_reset(),
            scrubbing: !pass.render_audio,
            playback_speed: pass.playback_speed,
        });
        outcome.cached += 1;
    }
}
