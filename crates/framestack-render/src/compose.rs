//! The recursive video compositor.
//!
//! Each active clip is drawn into the first of its two framebuffers, run
//! through its effect chain and transitions (ping-ponging between the pair)
//! and finally blended into the sequence's target with the quad's blend
//! mode and opacity. A clip holding a nested sequence composes that
//! sequence into its own framebuffer first and uses the result as source.

use framestack_audio::AudioDevice;
use framestack_core::{ComposeConfig, FrameHealth, FrameNumber, FrameRate, RenderIssue};
use framestack_effects::{apply_effect, EffectTime, Gizmo, TransitionRole};
use framestack_gpu::{
    draw_clip, FramebufferGuard, FramebufferId, GraphicsBackend, PingPong, ProgramGuard,
    TextureCoords, TextureDesc, TextureFilter, TextureId, Uniform,
};
use framestack_media::{close_clip, Decoder, FrameFetch, FrameRequest};
use framestack_timeline::{Clip, Footage, Sequence};
use glam::Vec2;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::activation::select_active_clips;
use crate::params::{Ancestor, AncestorChain, PassKind, RenderMode};

/// Gizmos of the effect being edited, in sequence pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveGizmo {
    pub clip: Uuid,
    /// Index into the clip's effect chain.
    pub effect: usize,
    pub gizmos: Vec<Gizmo>,
}

#[derive(Debug, Default)]
pub struct ComposeOutcome {
    /// Texture of the framebuffer the sequence was composed into.
    pub texture: Option<TextureId>,
    pub health: FrameHealth,
    pub gizmos: Option<ActiveGizmo>,
}

/// Uniform scale that fits a `native` sized clip inside `sequence`, or 1
/// when autoscale is off or the sizes already match.
pub fn autoscale_factor(enabled: bool, native: (u32, u32), sequence: (u32, u32)) -> f32 {
    if !enabled || native == sequence || native.0 == 0 || native.1 == 0 {
        return 1.0;
    }
    let width = sequence.0 as f32 / native.0 as f32;
    let height = sequence.1 as f32 / native.1 as f32;
    width.min(height)
}

/// Drives the decoder, the graphics backend and the audio device for one
/// sequence at a time.
pub struct Compositor {
    pub(crate) decoder: Arc<dyn Decoder>,
    pub(crate) audio: Arc<dyn AudioDevice>,
    pub(crate) config: ComposeConfig,
    playback_speed: f64,
}

impl Compositor {
    pub fn new(decoder: Arc<dyn Decoder>, audio: Arc<dyn AudioDevice>, config: ComposeConfig) -> Self {
        Self {
            decoder,
            audio,
            config,
            playback_speed: 1.0,
        }
    }

    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ComposeConfig) {
        self.config = config;
    }

    pub fn decoder(&self) -> &Arc<dyn Decoder> {
        &self.decoder
    }

    pub fn playback_speed(&self) -> f64 {
        self.playback_speed
    }

    /// Transport speed passed to the decoder with each frame request.
    /// Negative while playing backwards.
    pub fn set_playback_speed(&mut self, speed: f64) {
        self.playback_speed = speed;
    }

    /// Composite `sequence` at its playhead.
    ///
    /// With a root `ancestors` chain the result is drawn over whatever the
    /// backend has bound, which is left for the caller to clear. When the
    /// chain ends in an ancestor with a target framebuffer, that target is
    /// cleared and composed into instead.
    pub fn compose_video_frame(
        &self,
        sequence: &mut Sequence,
        backend: &mut dyn GraphicsBackend,
        ancestors: &AncestorChain<'_>,
        mode: RenderMode,
    ) -> ComposeOutcome {
        let playhead = sequence.playhead;
        let mut pass = VideoPass {
            compositor: self,
            backend,
            mode,
            health: FrameHealth::new(),
            gizmo: None,
        };
        let texture = pass.compose_sequence(sequence, playhead, ancestors);
        debug!(
            sequence = %sequence.name,
            playhead,
            retry = pass.health.retry,
            issues = pass.health.issues.len(),
            "composed video frame"
        );
        ComposeOutcome {
            texture,
            health: pass.health,
            gizmos: pass.gizmo,
        }
    }

    /// Close every open clip of `sequence` and nested sequences, waiting for
    /// their decoders, and release their GPU resources.
    ///
    /// Clips still opening in the background cannot be closed yet. They keep
    /// their resources and are counted in the return value; call again once
    /// they finish.
    pub fn close_sequence(&self, sequence: &mut Sequence, backend: &mut dyn GraphicsBackend) -> usize {
        let mut pending = 0;
        for clip in &mut sequence.clips {
            if let Some(nested) = clip.nested().cloned() {
                if let Some(mut inner) = nested.try_lock() {
                    pending += self.close_sequence(&mut inner, backend);
                }
            }
            if clip.playback.is_open() && !close_clip(self.decoder.as_ref(), clip, true) {
                pending += 1;
                continue;
            }
            clip.release_resources(backend);
        }
        if pending > 0 {
            debug!(sequence = %sequence.name, pending, "clips still opening");
        }
        pending
    }
}

/// The sequence a clip is being composed into.
#[derive(Debug, Clone, Copy)]
struct SequenceFrame {
    id: Uuid,
    width: u32,
    height: u32,
    rate: FrameRate,
    playhead: FrameNumber,
    target: FramebufferId,
}

impl SequenceFrame {
    fn centre(&self) -> Vec2 {
        Vec2::new(self.width as f32 * 0.5, self.height as f32 * 0.5)
    }
}

/// State of one `compose_video_frame` call, shared by every level of
/// nesting.
struct VideoPass<'c, 'b> {
    compositor: &'c Compositor,
    backend: &'b mut dyn GraphicsBackend,
    mode: RenderMode,
    health: FrameHealth,
    gizmo: Option<ActiveGizmo>,
}

impl VideoPass<'_, '_> {
    /// `playhead` is in `sequence`'s own rate. A nested sequence is composed
    /// at its mapped playhead without moving the one it was left at.
    fn compose_sequence(
        &mut self,
        sequence: &mut Sequence,
        playhead: FrameNumber,
        ancestors: &AncestorChain<'_>,
    ) -> Option<TextureId> {
        let nested_target = ancestors.last().and_then(|a| a.target);
        let target = nested_target.unwrap_or_else(|| self.backend.current_framebuffer());
        if let Some(fbo) = nested_target {
            FramebufferGuard::bind(&mut *self.backend, fbo).clear([0.0; 4]);
        }

        let activation = select_active_clips(
            sequence,
            playhead,
            PassKind::Video,
            self.mode,
            self.compositor.decoder.as_ref(),
            self.compositor.audio.is_available(),
            &mut self.health,
        );
        for &index in &activation.closed {
            sequence.clips[index].release_resources(&mut *self.backend);
        }

        let frame = SequenceFrame {
            id: sequence.id(),
            width: sequence.width(),
            height: sequence.height(),
            rate: sequence.frame_rate,
            playhead,
            target,
        };
        for &index in &activation.active {
            self.compose_clip(&frame, &mut sequence.clips[index], ancestors);
        }

        self.backend.framebuffer_texture(target)
    }

    fn compose_clip(&mut self, frame: &SequenceFrame, clip: &mut Clip, ancestors: &AncestorChain<'_>) {
        let footage = clip.footage().cloned();
        if footage.is_some() && !clip.playback.finished_opening() {
            warn!(clip = %clip.name, "clip is active but still opening");
            self.texture_failed(&clip.name);
            return;
        }
        if frame.playhead < clip.timeline_in_with_transition() {
            return;
        }

        let nested = clip.nested().cloned();
        let mut nested_guard = None;
        let (width, height) = if let Some(footage) = &footage {
            match footage.stream(true, clip.media_stream) {
                Some(stream) => (stream.width, stream.height),
                None => return,
            }
        } else if let Some(shared) = &nested {
            if shared.id() == frame.id || ancestors.contains_sequence(shared.id()) {
                warn!(clip = %clip.name, "nested sequence is already being composed");
                self.health.report(RenderIssue::NestingCycle {
                    sequence: clip.name.clone(),
                });
                return;
            }
            let Some(inner) = shared.try_lock() else {
                debug!(clip = %clip.name, "nested sequence is locked elsewhere");
                self.health.report(RenderIssue::NotReady {
                    clip: clip.name.clone(),
                });
                return;
            };
            let size = (inner.width(), inner.height());
            nested_guard = Some(inner);
            size
        } else {
            (frame.width, frame.height)
        };

        let Some(mut buffers) = self.framebuffers(clip, width, height) else {
            return;
        };

        let composite = if let Some(footage) = &footage {
            self.footage_texture(frame, clip, footage, (width, height))
                .and_then(|texture| draw_clip(&mut *self.backend, buffers.current_fbo(), texture, true))
        } else if let Some(inner) = nested_guard.as_mut() {
            let playhead = clip.nested_playhead(frame.playhead, frame.rate, inner.frame_rate);
            let chain = ancestors.extend(Ancestor {
                sequence: frame.id,
                clip: clip.id,
                target: Some(buffers.current_fbo()),
            });
            let nested_texture = self.compose_sequence(&mut **inner, playhead, &chain);
            buffers.swap();
            nested_texture
                .and_then(|texture| draw_clip(&mut *self.backend, buffers.current_fbo(), texture, true))
        } else {
            let fbo = buffers.current_fbo();
            FramebufferGuard::bind(&mut *self.backend, fbo).clear([0.0; 4]);
            self.backend.framebuffer_texture(fbo)
        };
        drop(nested_guard);

        let Some(mut composite) = composite else {
            if footage.is_none() {
                self.texture_failed(&clip.name);
            }
            return;
        };

        let compositor = self.compositor;
        let config = &compositor.config;
        let timecode = clip.timecode(frame.playhead, frame.rate);
        let mut coords = TextureCoords::for_size(width, height);

        let mut first_gizmo = None;
        let mut selected = None;
        for (index, effect) in clip.effects.iter_mut().enumerate() {
            apply_effect(
                &mut *self.backend,
                config,
                effect,
                EffectTime::at(timecode),
                TransitionRole::None,
                &mut coords,
                &mut composite,
                &mut buffers,
                &mut self.health,
            );
            if effect.enabled && effect.capabilities().gizmos {
                first_gizmo.get_or_insert(index);
                if effect.selected {
                    selected = Some(index);
                }
            }
        }

        let in_wt = clip.timeline_in_with_transition();
        let out_wt = clip.timeline_out_with_transition();
        if let Some(transition) = clip.opening_transition.as_mut() {
            if let Some(progress) = transition.progress(frame.playhead - in_wt) {
                apply_effect(
                    &mut *self.backend,
                    config,
                    &mut transition.effect,
                    EffectTime::transition(timecode, progress),
                    TransitionRole::Opening,
                    &mut coords,
                    &mut composite,
                    &mut buffers,
                    &mut self.health,
                );
            }
        }
        if let Some(transition) = clip.closing_transition.as_mut() {
            let elapsed = frame.playhead - (out_wt - transition.length());
            if let Some(progress) = transition.progress(elapsed) {
                apply_effect(
                    &mut *self.backend,
                    config,
                    &mut transition.effect,
                    EffectTime::transition(timecode, progress),
                    TransitionRole::Closing,
                    &mut coords,
                    &mut composite,
                    &mut buffers,
                    &mut self.health,
                );
            }
        }

        let scale = autoscale_factor(clip.autoscale, (width, height), (frame.width, frame.height));
        let origin = frame.centre();
        {
            let mut target = FramebufferGuard::bind(&mut *self.backend, frame.target);
            let blend = target.blend_program();
            let mut program = ProgramGuard::bind(&mut *target, blend);
            program.set_uniform("blend_mode", Uniform::Int(coords.blend_mode.index()));
            program.set_uniform("opacity", Uniform::Float(coords.opacity));
            program.set_texture_filter(composite, TextureFilter::Linear);
            program.draw_mesh(composite, &coords.to_mesh(origin, scale));
        }
        trace!(
            clip = %clip.name,
            track = %clip.track,
            swaps = buffers.swaps(),
            scale,
            "blended clip"
        );

        // Handles only make sense in the sequence the user is looking at
        let slot = selected.or(if clip.selected { first_gizmo } else { None });
        if let Some(index) = slot.filter(|_| ancestors.is_root()) {
            let mut gizmos = clip.effects[index].gizmos(timecode, (width, height), &coords);
            for gizmo in &mut gizmos {
                gizmo.to_sequence(origin, scale);
            }
            self.gizmo = Some(ActiveGizmo {
                clip: clip.id,
                effect: index,
                gizmos,
            });
        }
    }

    /// The clip's framebuffer pair, allocated on first use.
    fn framebuffers(&mut self, clip: &mut Clip, width: u32, height: u32) -> Option<PingPong> {
        if let Some(fbos) = clip.resources.fbos {
            return Some(PingPong::new(fbos));
        }
        let first = self.backend.create_framebuffer(width, height);
        let pair = first.and_then(|a| match self.backend.create_framebuffer(width, height) {
            Ok(b) => Ok([a, b]),
            Err(e) => {
                self.backend.release_framebuffer(a);
                Err(e)
            }
        });
        match pair {
            Ok(fbos) => {
                debug!(clip = %clip.name, width, height, "allocated clip framebuffers");
                clip.resources.fbos = Some(fbos);
                Some(PingPong::new(fbos))
            }
            Err(e) => {
                warn!(clip = %clip.name, "framebuffer allocation failed: {}", e);
                self.texture_failed(&clip.name);
                None
            }
        }
    }

    /// Upload the clip's current frame, or fall back to the last upload
    /// while the decoder catches up.
    fn footage_texture(
        &mut self,
        frame: &SequenceFrame,
        clip: &mut Clip,
        footage: &Footage,
        size: (u32, u32),
    ) -> Option<TextureId> {
        let texture = match clip.resources.texture {
            Some(texture) if self.backend.texture_size(texture) == Some(size) => texture,
            stale => {
                if let Some(texture) = stale {
                    self.backend.release_texture(texture);
                }
                clip.resources.texture = None;
                clip.resources.texture_frame = None;
                let desc = TextureDesc::new(size.0, size.1, footage.name.clone());
                match self.backend.create_texture(&desc) {
                    Ok(texture) => {
                        clip.resources.texture = Some(texture);
                        texture
                    }
                    Err(e) => {
                        warn!(clip = %clip.name, "texture creation failed: {}", e);
                        self.texture_failed(&clip.name);
                        return None;
                    }
                }
            }
        };

        let request = FrameRequest {
            playhead: frame.playhead.max(clip.timeline_in),
            rate: frame.rate,
            playback_speed: self.compositor.playback_speed,
        };
        match self.compositor.decoder.retrieve_frame(clip, &request) {
            FrameFetch::Ready {
                frame: image,
                source_frame,
            } => {
                if clip.resources.texture_frame != Some(source_frame) {
                    if let Err(e) = self.backend.upload_texture(texture, &image) {
                        warn!(clip = %clip.name, "upload failed: {}", e);
                        self.texture_failed(&clip.name);
                        return None;
                    }
                    clip.resources.texture_frame = Some(source_frame);
                }
                clip.resources.stale_frames = 0;
                Some(texture)
            }
            FrameFetch::NotReady if clip.resources.texture_frame.is_none() => {
                self.texture_failed(&clip.name);
                None
            }
            FrameFetch::NotReady => {
                clip.resources.stale_frames += 1;
                let frames = clip.resources.stale_frames;
                if frames > self.compositor.config.max_stale_frames {
                    warn!(clip = %clip.name, frames, "no fresh frame, dropping clip");
                    self.health.report(RenderIssue::StaleFrameDropped {
                        clip: clip.name.clone(),
                        frames,
                    });
                    return None;
                }
                debug!(clip = %clip.name, frames, "reusing last frame");
                self.texture_failed(&clip.name);
                Some(texture)
            }
        }
    }

    fn texture_failed(&mut self, clip: &str) {
        self.health.report(RenderIssue::TextureAcquisitionFailed {
            source_name: clip.to_string(),
        });
    }
}
