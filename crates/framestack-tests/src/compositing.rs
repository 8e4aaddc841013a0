//! Layering, autoscale, effect passes and transitions through the shipped
//! backend and decoder.

use framestack_core::{FrameRate, RenderIssue};
use framestack_effects::builtin::Invert;
use framestack_effects::transitions::{CrossDissolve, DipToBlack};
use framestack_effects::{Effect, Transition};
use framestack_gpu::GraphicsBackend;
use framestack_timeline::{Clip, Footage, FootageStream, Media, Sequence, TrackIndex};

use crate::common::{colour, Harness};

fn sequence(clips: Vec<Clip>, playhead: i64) -> Sequence {
    let mut seq = Sequence::new("Main", 8, 8, FrameRate::FPS_24);
    for clip in clips {
        seq.add_clip(clip);
    }
    seq.playhead = playhead;
    seq
}

#[test]
fn back_track_drawn_first_front_on_top() {
    let mut h = Harness::new(8, 8);
    let front = Clip::new("front", TrackIndex::video(1), 0, 100).with_media(h.video("red", 8, 8), 0);
    let back = Clip::new("back", TrackIndex::video(2), 0, 100).with_media(h.video("blue", 8, 8), 0);
    let mut seq = sequence(vec![front, back], 10);

    let outcome = h.render(&mut seq);
    assert!(outcome.health.is_clean());
    assert_eq!(h.pixel(4, 4), colour("red", 10));

    let output = h.backend.output_framebuffer();
    let blended: Vec<_> = h
        .backend
        .draws()
        .iter()
        .filter(|d| d.target == output)
        .map(|d| d.source)
        .collect();
    let back_fbo = seq.clips[1].resources.fbos.unwrap()[0];
    let front_fbo = seq.clips[0].resources.fbos.unwrap()[0];
    assert_eq!(
        blended,
        vec![
            h.backend.framebuffer_texture(back_fbo).unwrap(),
            h.backend.framebuffer_texture(front_fbo).unwrap(),
        ]
    );
}

#[test]
fn autoscale_fills_the_frame() {
    let mut h = Harness::new(8, 8);
    let clip = Clip::new("small", TrackIndex::video(1), 0, 100).with_media(h.video("red", 4, 4), 0);
    let mut seq = sequence(vec![clip], 0);

    h.render(&mut seq);
    assert_eq!(h.pixel(0, 0), colour("red", 0));
    assert_eq!(h.pixel(7, 7), colour("red", 0));

    seq.clips[0].autoscale = false;
    h.render(&mut seq);
    assert_eq!(h.pixel(0, 0), [0, 0, 0, 0]);
    assert_eq!(h.pixel(4, 4), colour("red", 0));
}

#[test]
fn shader_passes_never_read_their_target() {
    let mut h = Harness::new(8, 8);
    let clip = Clip::new("a", TrackIndex::video(1), 0, 100)
        .with_media(h.video("red", 8, 8), 0)
        .with_effect(Effect::new(Invert))
        .with_effect(Effect::new(Invert))
        .with_effect(Effect::new(Invert));
    let mut seq = sequence(vec![clip], 5);

    let outcome = h.render(&mut seq);
    assert!(outcome.health.is_clean());

    let [a, b] = seq.clips[0].resources.fbos.unwrap();
    let targets: Vec<_> = h.backend.draws().iter().map(|d| d.target).collect();
    // Upload into A, then three passes
    assert_eq!(&targets[..4], &[a, b, a, b]);
    for draw in h.backend.draws() {
        assert_ne!(Some(draw.source), h.backend.framebuffer_texture(draw.target));
    }

    let [r, g, b, alpha] = colour("red", 5);
    assert_eq!(h.pixel(2, 2), [255 - r, 255 - g, 255 - b, alpha]);
}

#[test]
fn unlinked_shader_degrades_to_geometry() {
    let mut h = Harness::new(8, 8);
    h.backend.reject_program("Invert");
    let clip = Clip::new("a", TrackIndex::video(1), 0, 100)
        .with_media(h.video("red", 8, 8), 0)
        .with_effect(Effect::new(Invert));
    let mut seq = sequence(vec![clip], 5);

    let outcome = h.render(&mut seq);
    assert!(!outcome.health.retry);
    assert!(outcome
        .health
        .any(|i| matches!(i, RenderIssue::ShaderUnlinked { .. })));
    assert_eq!(h.pixel(2, 2), colour("red", 5));
}

#[test]
fn opening_transition_edges() {
    let mut h = Harness::new(8, 8);
    let clip = Clip::new("a", TrackIndex::video(1), 10, 100)
        .with_media(h.video("red", 8, 8), 0)
        .with_opening(Transition::new(Effect::new(CrossDissolve), 4));
    let mut seq = sequence(vec![clip], 10);

    h.render(&mut seq);
    assert_eq!(h.pixel(4, 4)[3], 0);

    seq.playhead = 13;
    h.render(&mut seq);
    let alpha = h.pixel(4, 4)[3];
    assert!(alpha > 0 && alpha < 255, "alpha {alpha} on the last transition frame");

    seq.playhead = 14;
    h.render(&mut seq);
    assert_eq!(h.pixel(4, 4)[3], 255);
}

#[test]
fn closing_transition_edges() {
    let mut h = Harness::new(8, 8);
    let clip = Clip::new("a", TrackIndex::video(1), 10, 40)
        .with_media(h.video("red", 8, 8), 0)
        .with_closing(Transition::new(Effect::new(CrossDissolve), 4));
    let mut seq = sequence(vec![clip], 35);

    h.render(&mut seq);
    assert_eq!(h.pixel(4, 4)[3], 255);

    seq.playhead = 36;
    h.render(&mut seq);
    assert_eq!(h.pixel(4, 4)[3], 255);

    seq.playhead = 38;
    h.render(&mut seq);
    let alpha = h.pixel(4, 4)[3];
    assert!(alpha > 64 && alpha < 192, "alpha {alpha} halfway out");

    seq.playhead = 39;
    h.render(&mut seq);
    let alpha = h.pixel(4, 4)[3];
    assert!(alpha > 0 && alpha < 128, "alpha {alpha} on the last frame");
}

#[test]
fn closing_shader_runs_only_inside_its_window() {
    let mut h = Harness::new(8, 8);
    let clip = Clip::new("a", TrackIndex::video(1), 10, 40)
        .with_media(h.video("red", 8, 8), 0)
        .with_closing(Transition::new(Effect::new(DipToBlack), 4));
    let mut seq = sequence(vec![clip], 35);

    let dips = |h: &Harness| {
        h.backend
            .draws()
            .iter()
            .filter(|d| d.program.as_deref() == Some("Dip to Black"))
            .count()
    };

    h.render(&mut seq);
    assert_eq!(dips(&h), 0);

    h.backend.clear_draw_log();
    seq.playhead = 36;
    let outcome = h.render(&mut seq);
    assert!(outcome.health.is_clean());
    assert_eq!(dips(&h), 1);
}

#[test]
fn zero_length_transition_is_skipped() {
    let mut h = Harness::new(8, 8);
    let clip = Clip::new("a", TrackIndex::video(1), 10, 100)
        .with_media(h.video("red", 8, 8), 0)
        .with_opening(Transition::new(Effect::new(CrossDissolve), 0));
    let mut seq = sequence(vec![clip], 10);

    let outcome = h.render(&mut seq);
    assert!(outcome.health.is_clean());
    assert_eq!(h.pixel(4, 4), colour("red", 0));
}

#[test]
fn invalid_footage_is_skipped_without_retry() {
    let mut h = Harness::new(8, 8);
    let footage = Footage::new(
        "broken",
        "broken.bad",
        vec![FootageStream::video(0, 8, 8, FrameRate::FPS_24)],
    );
    h.decoder.probe_footage(&footage);
    let clip = Clip::new("broken", TrackIndex::video(1), 0, 100)
        .with_media(Media::footage(footage), 0);
    let mut seq = sequence(vec![clip], 3);

    let outcome = h.render(&mut seq);
    assert!(!outcome.health.retry);
    assert_eq!(
        outcome.health.issues,
        vec![RenderIssue::InvalidMedia {
            clip: "broken".into()
        }]
    );
    assert_eq!(h.pixel(4, 4), [0, 0, 0, 0]);
}
