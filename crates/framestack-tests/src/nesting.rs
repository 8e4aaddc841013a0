//! Nested sequences against their flattened equivalents.

use framestack_core::{retime_frame, FrameRate, RenderIssue};
use framestack_effects::builtin::Invert;
use framestack_effects::Effect;
use framestack_timeline::{Clip, Media, Sequence, TrackIndex};

use crate::common::{colour, Harness};

/// A 24 fps main sequence holding one clip of 24 fps footage, either
/// directly or inside a 30 fps sequence.
fn build(h: &Harness, nested: bool) -> Sequence {
    let footage = h.video("red", 8, 8);
    let mut main = Sequence::new("Main", 8, 8, FrameRate::FPS_24);
    if nested {
        let mut inner = Sequence::new("Inner", 8, 8, FrameRate::FPS_30);
        inner.add_clip(
            Clip::new("red", TrackIndex::video(1), 0, 200)
                .with_media(footage, 0)
                .with_effect(Effect::new(Invert)),
        );
        main.add_clip(
            Clip::new("nest", TrackIndex::video(1), 0, 100).with_media(Media::Sequence(inner.into_shared()), 0),
        );
    } else {
        main.add_clip(
            Clip::new("red", TrackIndex::video(1), 0, 100)
                .with_media(footage, 0)
                .with_effect(Effect::new(Invert)),
        );
    }
    main
}

#[test]
fn nested_matches_flattened() {
    let mut flat_h = Harness::new(8, 8);
    let mut nested_h = Harness::new(8, 8);
    let mut flat = build(&flat_h, false);
    let mut nested = build(&nested_h, true);

    // Multiples of four map to whole frames at 30 fps
    for playhead in [0, 4, 8, 12, 40] {
        flat.playhead = playhead;
        nested.playhead = playhead;
        let a = flat_h.render(&mut flat);
        let b = nested_h.render(&mut nested);
        assert!(a.health.is_clean() && b.health.is_clean());
        assert_eq!(flat_h.output(), nested_h.output(), "playhead {playhead}");
    }

    let [r, g, b, a] = colour("red", 12);
    nested.playhead = 12;
    nested_h.render(&mut nested);
    assert_eq!(nested_h.pixel(1, 1), [255 - r, 255 - g, 255 - b, a]);
}

#[test]
fn nested_playhead_is_retimed() {
    let mut h = Harness::new(8, 8);
    let mut main = build(&h, true);
    main.playhead = 12;
    h.render(&mut main);

    let Some(Media::Sequence(inner)) = main.clips[0].media.clone() else {
        panic!("nesting clip lost its sequence");
    };
    let inner = inner.lock();
    let nested_frame = retime_frame(12, FrameRate::FPS_24, FrameRate::FPS_30);
    assert_eq!(nested_frame, 15);
    // The footage runs at 24 fps, so frame 15 at 30 fps shows source frame 12
    assert_eq!(inner.clips[0].resources.texture_frame, Some(12));
    // Composing the parent leaves the nested sequence where it was
    assert_eq!(inner.playhead, 0);
}

#[test]
fn locked_nested_sequence_asks_for_a_redraw() {
    let mut h = Harness::new(8, 8);
    let mut main = build(&h, true);
    main.playhead = 12;
    let Some(Media::Sequence(inner)) = main.clips[0].media.clone() else {
        panic!("nesting clip lost its sequence");
    };

    let held = inner.lock();
    let outcome = h.render(&mut main);
    assert!(outcome.health.retry);
    assert_eq!(
        outcome.health.issues,
        vec![RenderIssue::NotReady { clip: "nest".into() }]
    );
    drop(held);

    let outcome = h.render(&mut main);
    assert!(outcome.health.is_clean());
    let [r, g, b, a] = colour("red", 12);
    assert_eq!(h.pixel(1, 1), [255 - r, 255 - g, 255 - b, a]);
}

#[test]
fn nested_cycle_is_reported() {
    let mut h = Harness::new(8, 8);
    let a = Sequence::new("A", 8, 8, FrameRate::FPS_24).into_shared();
    let b = Sequence::new("B", 8, 8, FrameRate::FPS_24).into_shared();
    a.lock()
        .add_clip(Clip::new("to b", TrackIndex::video(1), 0, 50).with_media(Media::Sequence(b.clone()), 0));
    b.lock()
        .add_clip(Clip::new("to a", TrackIndex::video(1), 0, 50).with_media(Media::Sequence(a.clone()), 0));

    let mut main = Sequence::new("Main", 8, 8, FrameRate::FPS_24);
    main.add_clip(Clip::new("a", TrackIndex::video(1), 0, 50).with_media(Media::Sequence(a), 0));
    main.playhead = 5;

    let outcome = h.render(&mut main);
    assert!(outcome
        .health
        .any(|i| matches!(i, RenderIssue::NestingCycle { .. })));
}
