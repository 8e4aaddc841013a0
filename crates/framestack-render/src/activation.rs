//! Which clips take part in a pass.

use framestack_core::{FrameHealth, FrameNumber, RenderIssue};
use framestack_media::{close_clip, open_clip, Decoder};
use framestack_timeline::{Clip, Sequence};
use tracing::trace;

use crate::params::{PassKind, RenderMode};

/// Result of [`select_active_clips`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activation {
    /// Indices into the sequence's clips, ascending by track so the back
    /// track comes first. Clips on the same track keep timeline order.
    pub active: Vec<usize>,
    /// Clips closed by this call. Their GPU resources can be released.
    pub closed: Vec<usize>,
    /// Active clips on audio tracks.
    pub audio_clips: usize,
}

/// Whether `clip` is enabled and covers `playhead`, transitions included.
pub fn is_clip_active(clip: &Clip, playhead: FrameNumber) -> bool {
    clip.is_active_at(playhead)
}

/// Select the clips of one pass at `playhead`, opening clips that became
/// active and closing those that stopped being active.
///
/// Footage that is invalid, or audio with no device to play it, is skipped
/// without being opened. Footage still loading is skipped and flags the
/// frame for a retry. Only clips covering the playhead report issues.
pub fn select_active_clips(
    sequence: &Sequence,
    playhead: FrameNumber,
    pass: PassKind,
    mode: RenderMode,
    decoder: &dyn Decoder,
    audio_available: bool,
    health: &mut FrameHealth,
) -> Activation {
    let mut activation = Activation::default();

    for (index, clip) in sequence.clips.iter().enumerate() {
        if clip.track.is_video() != pass.is_video() {
            continue;
        }
        let in_range = is_clip_active(clip, playhead);

        let active = match clip.footage() {
            Some(footage) => {
                if footage.is_invalid() {
                    if in_range {
                        health.report(RenderIssue::InvalidMedia {
                            clip: clip.name.clone(),
                        });
                    }
                    continue;
                }
                if clip.track.is_audio() && !audio_available {
                    if in_range {
                        health.report(RenderIssue::NoAudioDevice {
                            clip: clip.name.clone(),
                        });
                    }
                    continue;
                }
                if !decoder.is_stream_ready(footage) {
                    if in_range {
                        health.report(RenderIssue::NotReady {
                            clip: clip.name.clone(),
                        });
                    }
                    continue;
                }
                in_range
                    && footage
                        .stream(clip.track.is_video(), clip.media_stream)
                        .is_some()
            }
            None => in_range,
        };

        if active {
            open_clip(decoder, clip, mode.open_mode());
            activation.active.push(index);
        } else if close_clip(decoder, clip, false) {
            activation.closed.push(index);
        }
    }

    // Stable, so clips sharing a track keep timeline order
    activation
        .active
        .sort_by_key(|&index| sequence.clips[index].track);
    activation.audio_clips = activation
        .active
        .iter()
        .filter(|&&index| sequence.clips[index].track.is_audio())
        .count();

    trace!(
        playhead,
        ?pass,
        active = activation.active.len(),
        closed = activation.closed.len(),
        "selected clips"
    );
    activation
}
