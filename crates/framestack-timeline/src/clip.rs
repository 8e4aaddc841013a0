//! Clips and their render-side state.

use framestack_core::{FrameNumber, FrameRate, RationalTime};
use framestack_effects::{Effect, Transition};
use framestack_gpu::{FramebufferId, GraphicsBackend, TextureId};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::media::{Footage, Media};
use crate::playback::PlaybackState;
use crate::sequence::SharedSequence;
use crate::track::TrackIndex;

/// GPU objects a clip allocates while it is open. Allocated lazily on the
/// first frame that needs them, released when the clip closes.
#[derive(Debug, Default)]
pub struct ClipResources {
    /// Ping-pong framebuffers, sized to the clip's native resolution.
    pub fbos: Option<[FramebufferId; 2]>,
    /// Texture the decoded frame is uploaded into.
    pub texture: Option<TextureId>,
    /// Source frame currently held by `texture`.
    pub texture_frame: Option<FrameNumber>,
    /// Consecutive frames drawn from a stale upload.
    pub stale_frames: u32,
}

impl ClipResources {
    pub fn is_allocated(&self) -> bool {
        self.fbos.is_some() || self.texture.is_some()
    }

    pub fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        if let Some([a, b]) = self.fbos.take() {
            backend.release_framebuffer(a);
            backend.release_framebuffer(b);
        }
        if let Some(texture) = self.texture.take() {
            backend.release_texture(texture);
        }
        self.texture_frame = None;
        self.stale_frames = 0;
    }
}

/// A clip on the timeline.
///
/// Positions are frames in the owning sequence's rate. The clip occupies
/// `timeline_in..timeline_out`; `clip_in` is the first source frame shown.
/// Transitions may overlap neighbouring clips, which widens the range the
/// clip is active over (see the `*_with_transition` accessors).
#[derive(Debug)]
pub struct Clip {
    pub id: Uuid,
    pub name: String,
    pub track: TrackIndex,
    pub enabled: bool,
    pub reversed: bool,
    /// Scale to fit the sequence when the native size differs.
    pub autoscale: bool,
    pub speed: f64,
    /// Selected in the timeline.
    pub selected: bool,
    pub clip_in: FrameNumber,
    pub timeline_in: FrameNumber,
    pub timeline_out: FrameNumber,
    pub media: Option<Media>,
    /// File index of the stream played from `media`.
    pub media_stream: usize,
    pub effects: Vec<Effect>,
    pub opening_transition: Option<Transition>,
    pub closing_transition: Option<Transition>,
    pub playback: Arc<PlaybackState>,
    pub resources: ClipResources,
}

impl Clip {
    pub fn new(
        name: impl Into<String>,
        track: TrackIndex,
        timeline_in: FrameNumber,
        timeline_out: FrameNumber,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            track,
            enabled: true,
            reversed: false,
            autoscale: true,
            speed: 1.0,
            selected: false,
            clip_in: 0,
            timeline_in,
            timeline_out,
            media: None,
            media_stream: 0,
            effects: Vec::new(),
            opening_transition: None,
            closing_transition: None,
            playback: Arc::new(PlaybackState::new()),
            resources: ClipResources::default(),
        }
    }

    pub fn with_media(mut self, media: Media, stream: usize) -> Self {
        self.media = Some(media);
        self.media_stream = stream;
        self
    }

    pub fn with_clip_in(mut self, clip_in: FrameNumber) -> Self {
        self.clip_in = clip_in;
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_opening(mut self, transition: Transition) -> Self {
        self.opening_transition = Some(transition);
        self
    }

    pub fn with_closing(mut self, transition: Transition) -> Self {
        self.closing_transition = Some(transition);
        self
    }

    pub fn footage(&self) -> Option<&Arc<Footage>> {
        self.media.as_ref().and_then(Media::as_footage)
    }

    pub fn nested(&self) -> Option<&SharedSequence> {
        self.media.as_ref().and_then(Media::as_sequence)
    }

    fn opening_overlap(&self) -> FrameNumber {
        self.opening_transition
            .as_ref()
            .map_or(0, Transition::overlap)
    }

    fn closing_overlap(&self) -> FrameNumber {
        self.closing_transition
            .as_ref()
            .map_or(0, Transition::overlap)
    }

    pub fn timeline_in_with_transition(&self) -> FrameNumber {
        self.timeline_in - self.opening_overlap()
    }

    pub fn timeline_out_with_transition(&self) -> FrameNumber {
        self.timeline_out + self.closing_overlap()
    }

    pub fn clip_in_with_transition(&self) -> FrameNumber {
        self.clip_in - self.opening_overlap()
    }

    /// Length on the timeline, transitions included.
    pub fn length(&self) -> FrameNumber {
        self.timeline_out_with_transition() - self.timeline_in_with_transition()
    }

    /// Whether the clip is enabled and covers `playhead`.
    pub fn is_active_at(&self, playhead: FrameNumber) -> bool {
        self.enabled
            && self.timeline_in_with_transition() <= playhead
            && playhead < self.timeline_out_with_transition()
    }

    /// Time into the clip at `playhead`, for keyframe evaluation.
    pub fn timecode(&self, playhead: FrameNumber, rate: FrameRate) -> RationalTime {
        RationalTime::from_frames(
            playhead - self.timeline_in_with_transition() + self.clip_in_with_transition(),
            rate,
        )
    }

    /// Position in the source media, in seconds, shown at `playhead`.
    /// Speed scales the distance travelled from the in point; a reversed
    /// clip plays its range backwards.
    pub fn source_seconds(&self, playhead: FrameNumber, rate: FrameRate) -> f64 {
        let offset = playhead - self.timeline_in_with_transition();
        let offset = if self.reversed {
            self.length() - 1 - offset
        } else {
            offset
        };
        rate.frames_to_seconds(self.clip_in_with_transition())
            + rate.frames_to_seconds(offset) * self.speed
    }

    /// Playhead inside a nested sequence running at `nested_rate`, when
    /// this clip's sequence is at `playhead` in `rate`.
    pub fn nested_playhead(
        &self,
        playhead: FrameNumber,
        rate: FrameRate,
        nested_rate: FrameRate,
    ) -> FrameNumber {
        framestack_core::retime_frame(
            playhead + self.clip_in - self.timeline_in_with_transition(),
            rate,
            nested_rate,
        )
    }

    /// A copy with its own id, effects and transitions. Playback state and
    /// GPU resources start fresh.
    pub fn duplicate(&self) -> Self {
        debug!(clip = %self.name, "duplicating clip");
        Self {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            track: self.track,
            enabled: self.enabled,
            reversed: self.reversed,
            autoscale: self.autoscale,
            speed: self.speed,
            selected: false,
            clip_in: self.clip_in,
            timeline_in: self.timeline_in,
            timeline_out: self.timeline_out,
            media: self.media.clone(),
            media_stream: self.media_stream,
            effects: self.effects.clone(),
            opening_transition: self.opening_transition.clone(),
            closing_transition: self.closing_transition.clone(),
            playback: Arc::new(PlaybackState::new()),
            resources: ClipResources::default(),
        }
    }

    /// Release framebuffers, the decode texture and every effect's GPU
    /// state.
    pub fn release_resources(&mut self, backend: &mut dyn GraphicsBackend) {
        self.resources.release(backend);
        for effect in &mut self.effects {
            effect.release(backend);
        }
        for transition in [&mut self.opening_transition, &mut self.closing_transition]
            .into_iter()
            .flatten()
        {
            transition.effect.release(backend);
        }
    }

    /// Refresh the live value of every keyframed field at `time`.
    pub fn refresh_keyframes(&mut self, time: RationalTime) {
        for effect in &mut self.effects {
            effect.refresh(time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framestack_effects::transitions::CrossDissolve;
    use framestack_gpu::SoftwareBackend;
    use proptest::prelude::*;

    fn dissolve(length: FrameNumber, overlap: FrameNumber) -> Transition {
        Transition::new(Effect::new(CrossDissolve), length).with_overlap(overlap)
    }

    #[test]
    fn test_transition_inclusive_bounds() {
        let clip = Clip::new("a", TrackIndex::video(1), 10, 20)
            .with_clip_in(5)
            .with_opening(dissolve(4, 2))
            .with_closing(dissolve(4, 3));
        assert_eq!(clip.timeline_in_with_transition(), 8);
        assert_eq!(clip.timeline_out_with_transition(), 23);
        assert_eq!(clip.clip_in_with_transition(), 3);
        assert_eq!(clip.length(), 15);
    }

    #[test]
    fn test_active_range_is_half_open() {
        let mut clip = Clip::new("a", TrackIndex::video(1), 10, 20);
        assert!(!clip.is_active_at(9));
        assert!(clip.is_active_at(10));
        assert!(clip.is_active_at(19));
        assert!(!clip.is_active_at(20));
        clip.enabled = false;
        assert!(!clip.is_active_at(15));
    }

    #[test]
    fn test_timecode() {
        let clip = Clip::new("a", TrackIndex::video(1), 24, 72).with_clip_in(12);
        assert_eq!(
            clip.timecode(36, FrameRate::FPS_24),
            RationalTime::new(1, 1)
        );
    }

    #[test]
    fn test_source_seconds_speed_and_reverse() {
        let mut clip = Clip::new("a", TrackIndex::video(1), 0, 48).with_clip_in(24);
        clip.speed = 2.0;
        assert_eq!(clip.source_seconds(12, FrameRate::FPS_24), 2.0);
        clip.speed = 1.0;
        clip.reversed = true;
        assert_eq!(clip.source_seconds(0, FrameRate::FPS_24), 1.0 + 47.0 / 24.0);
        assert_eq!(clip.source_seconds(47, FrameRate::FPS_24), 1.0);
    }

    #[test]
    fn test_nested_playhead_retimes() {
        let clip = Clip::new("nest", TrackIndex::video(1), 100, 200).with_clip_in(10);
        // 30 parent frames in at 30 fps is 1 second; at 24 fps that is frame 24
        let p = clip.nested_playhead(120, FrameRate::FPS_30, FrameRate::FPS_24);
        assert_eq!(p, 24);
    }

    #[test]
    fn test_duplicate_is_deep_and_fresh() {
        let mut backend = SoftwareBackend::new(4, 4);
        let mut clip = Clip::new("a", TrackIndex::video(1), 0, 10)
            .with_effect(Effect::new(framestack_effects::builtin::Transform))
            .with_opening(dissolve(5, 0));
        clip.playback.set_open(true);
        clip.resources.fbos = Some([
            backend.create_framebuffer(2, 2).unwrap(),
            backend.create_framebuffer(2, 2).unwrap(),
        ]);
        clip.effects[0].set_value("scale", 50.0);

        let mut copy = clip.duplicate();
        assert_ne!(copy.id, clip.id);
        assert!(!copy.playback.is_open());
        assert!(!copy.resources.is_allocated());
        assert_eq!(copy.opening_transition.as_ref().map(Transition::length), Some(5));

        copy.effects[0].set_value("scale", 25.0);
        let scale = |c: &Clip| c.effects[0].values_at(RationalTime::ZERO).get("scale");
        assert_eq!(scale(&clip), Some(50.0));
        assert_eq!(scale(&copy), Some(25.0));
    }

    #[test]
    fn test_release_resources() {
        let mut backend = SoftwareBackend::new(4, 4);
        let baseline = backend.framebuffer_count();
        let mut clip = Clip::new("a", TrackIndex::video(1), 0, 10);
        clip.resources.fbos = Some([
            backend.create_framebuffer(2, 2).unwrap(),
            backend.create_framebuffer(2, 2).unwrap(),
        ]);
        clip.resources.texture_frame = Some(3);
        clip.release_resources(&mut backend);
        assert_eq!(backend.framebuffer_count(), baseline);
        assert!(!clip.resources.is_allocated());
        assert_eq!(clip.resources.texture_frame, None);
    }

    proptest! {
        #[test]
        fn prop_active_iff_within_bounds(
            tin in -100i64..100,
            len in 1i64..100,
            open_overlap in 0i64..10,
            close_overlap in 0i64..10,
            t in -200i64..300,
        ) {
            let clip = Clip::new("p", TrackIndex::video(1), tin, tin + len)
                .with_opening(dissolve(3, open_overlap))
                .with_closing(dissolve(3, close_overlap));
            let expected = tin - open_overlap <= t && t < tin + len + close_overlap;
            prop_assert_eq!(clip.is_active_at(t), expected);
        }
    }
}
