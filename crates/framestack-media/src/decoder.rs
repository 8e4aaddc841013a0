//! The decoder contract and the open/close lifecycle around it.

use framestack_core::{FrameNumber, FrameRate, SharedFrameBuffer};
use framestack_timeline::{Clip, Footage, FootageStream};
use tracing::debug;

/// How a clip is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Return only once the clip can serve frames. Used for final renders.
    Blocking,
    /// Return immediately; the decoder finishes opening on its own thread.
    Background,
}

impl OpenMode {
    pub fn for_render(final_render: bool) -> Self {
        if final_render {
            Self::Blocking
        } else {
            Self::Background
        }
    }
}

/// A request for the frame a clip shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRequest {
    /// Frame of the owning sequence.
    pub playhead: FrameNumber,
    /// Rate of the owning sequence.
    pub rate: FrameRate,
    /// Playback speed of the transport, negative when playing backwards.
    pub playback_speed: f64,
}

/// Result of [`Decoder::retrieve_frame`].
#[derive(Debug, Clone)]
pub enum FrameFetch {
    Ready {
        frame: SharedFrameBuffer,
        /// Frame index in the footage's own rate.
        source_frame: FrameNumber,
    },
    /// Nothing decoded yet. The caller should try again on a later frame.
    NotReady,
}

impl FrameFetch {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// The decode collaborator.
///
/// All methods take `&self`: decoders run their own threads and keep their
/// state behind locks, and the compositor calls them while it holds the
/// sequence mutably.
pub trait Decoder: Send + Sync {
    /// Start decoding for `clip`. Implementations must eventually set the
    /// clip's `finished_opening` flag, before returning for
    /// [`OpenMode::Blocking`].
    fn open(&self, clip: &Clip, mode: OpenMode);

    /// Stop decoding for `clip` and drop its cached frames. With `wait`,
    /// return only once in-flight work for the clip has finished.
    fn close(&self, clip: &Clip, wait: bool);

    fn is_open(&self, clip: &Clip) -> bool {
        clip.playback.is_open()
    }

    fn retrieve_frame(&self, clip: &Clip, request: &FrameRequest) -> FrameFetch;

    fn is_stream_ready(&self, footage: &Footage) -> bool {
        footage.is_ready() && !footage.is_invalid()
    }
}

/// Open `clip` unless it is already open. Returns whether an open was issued.
pub fn open_clip(decoder: &dyn Decoder, clip: &Clip, mode: OpenMode) -> bool {
    if decoder.is_open(clip) {
        return false;
    }
    debug!(clip = %clip.name, ?mode, "opening clip");
    clip.playback.set_finished_opening(false);
    clip.playback.set_open(true);
    decoder.open(clip, mode);
    true
}

/// Close `clip` if it is open and has finished opening. A clip still
/// opening in the background is left alone and closed on a later call.
/// Returns whether a close was issued.
pub fn close_clip(decoder: &dyn Decoder, clip: &Clip, wait: bool) -> bool {
    if !decoder.is_open(clip) || !clip.playback.finished_opening() {
        return false;
    }
    debug!(clip = %clip.name, wait, "closing clip");
    decoder.close(clip, wait);
    clip.playback.set_open(false);
    clip.playback.set_finished_opening(false);
    true
}

/// Index of the frame in `stream` shown by `clip` at the request's playhead.
/// Clamped to the footage's length when it is known.
pub fn source_frame(
    clip: &Clip,
    footage: &Footage,
    stream: &FootageStream,
    request: &FrameRequest,
) -> FrameNumber {
    let seconds = clip.source_seconds(request.playhead, request.rate);
    // Nudge so exact frame boundaries do not floor into the previous frame
    let frame = (seconds * stream.frame_rate.to_fps_f64() + 1e-6).floor() as FrameNumber;
    let frame = frame.max(0);
    if footage.length > 0 {
        frame.min(footage.length - 1)
    } else {
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framestack_timeline::TrackIndex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and finishes opens only when told to.
    #[derive(Default)]
    struct Recording {
        opens: AtomicUsize,
        closes: AtomicUsize,
    }

    impl Decoder for Recording {
        fn open(&self, clip: &Clip, mode: OpenMode) {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if mode == OpenMode::Blocking {
                clip.playback.set_finished_opening(true);
            }
        }

        fn close(&self, _clip: &Clip, _wait: bool) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }

        fn retrieve_frame(&self, _clip: &Clip, _request: &FrameRequest) -> FrameFetch {
            FrameFetch::NotReady
        }
    }

    #[test]
    fn test_open_is_idempotent() {
        let decoder = Recording::default();
        let clip = Clip::new("a", TrackIndex::video(1), 0, 10);
        assert!(open_clip(&decoder, &clip, OpenMode::Blocking));
        assert!(!open_clip(&decoder, &clip, OpenMode::Blocking));
        assert_eq!(decoder.opens.load(Ordering::SeqCst), 1);
        assert!(clip.playback.is_open());
    }

    #[test]
    fn test_close_waits_for_finished_opening() {
        let decoder = Recording::default();
        let clip = Clip::new("a", TrackIndex::video(1), 0, 10);
        open_clip(&decoder, &clip, OpenMode::Background);

        assert!(!close_clip(&decoder, &clip, false));
        assert_eq!(decoder.closes.load(Ordering::SeqCst), 0);
        assert!(clip.playback.is_open());

        clip.playback.set_finished_opening(true);
        assert!(close_clip(&decoder, &clip, false));
        assert_eq!(decoder.closes.load(Ordering::SeqCst), 1);
        assert!(!clip.playback.is_open());
        assert!(!close_clip(&decoder, &clip, false));
    }

    #[test]
    fn test_source_frame_across_rates() {
        let footage = Footage::new(
            "f",
            "f.mov",
            vec![FootageStream::video(0, 4, 4, FrameRate::FPS_25)],
        )
        .with_length(100);
        let stream = &footage.streams()[0];
        let clip = Clip::new("a", TrackIndex::video(1), 0, 200).with_clip_in(24);
        let request = |playhead| FrameRequest {
            playhead,
            rate: FrameRate::FPS_24,
            playback_speed: 1.0,
        };

        // One second in at 24 fps is frame 25 at 25 fps
        assert_eq!(source_frame(&clip, &footage, stream, &request(0)), 25);
        assert_eq!(source_frame(&clip, &footage, stream, &request(24)), 50);
        // Clamped to the last frame
        assert_eq!(source_frame(&clip, &footage, stream, &request(190)), 99);
    }

    #[test]
    fn test_open_mode_for_render() {
        assert_eq!(OpenMode::for_render(true), OpenMode::Blocking);
        assert_eq!(OpenMode::for_render(false), OpenMode::Background);
    }
}
