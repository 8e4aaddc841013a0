//! Open/close lifecycle against the threaded decoder.

use framestack_core::{FrameHealth, FrameRate};
use framestack_media::Decoder;
use framestack_render::{select_active_clips, PassKind, RenderMode};
use framestack_timeline::{Clip, Sequence, TrackIndex};
use std::thread;
use std::time::Duration;

use crate::common::{colour, Harness};

fn single_clip(h: &Harness) -> Sequence {
    let mut seq = Sequence::new("Main", 8, 8, FrameRate::FPS_24);
    seq.add_clip(Clip::new("a", TrackIndex::video(1), 0, 100).with_media(h.video("red", 8, 8), 0));
    seq
}

#[test]
fn clip_opens_in_range_and_closes_after() {
    let h = Harness::new(8, 8);
    let seq = single_clip(&h);
    let decoder: &dyn Decoder = h.decoder.as_ref();
    let mut health = FrameHealth::new();
    let mut select = |playhead| {
        select_active_clips(&seq, playhead, PassKind::Video, RenderMode::Final, decoder, false, &mut health)
    };

    let inside = select(50);
    assert_eq!(inside.active, vec![0]);
    assert!(seq.clips[0].playback.finished_opening());
    assert!(decoder.is_open(&seq.clips[0]));

    let after = select(150);
    assert!(after.active.is_empty());
    assert_eq!(after.closed, vec![0]);
    assert!(!decoder.is_open(&seq.clips[0]));

    // Nothing left to close
    assert!(select(150).closed.is_empty());
}

#[test]
fn preview_retries_until_the_decoder_catches_up() {
    let mut h = Harness::new(8, 8);
    let mut seq = single_clip(&h);
    seq.playhead = 7;

    let mut attempts = 0;
    let outcome = loop {
        attempts += 1;
        let outcome = h.compose(&mut seq, RenderMode::Preview);
        if !outcome.health.retry || attempts == 400 {
            break outcome;
        }
        thread::sleep(Duration::from_millis(5));
    };

    assert!(!outcome.health.retry, "still retrying after {attempts} attempts");
    assert_eq!(h.pixel(4, 4), colour("red", 7));
}

#[test]
fn close_sequence_releases_everything() {
    let mut h = Harness::new(8, 8);
    let mut seq = single_clip(&h);
    seq.playhead = 3;
    h.render(&mut seq);
    assert!(seq.clips[0].resources.is_allocated());

    let pending = h.compositor.close_sequence(&mut seq, &mut h.backend);
    assert_eq!(pending, 0);
    assert!(!seq.clips[0].resources.is_allocated());
    assert!(!seq.clips[0].playback.is_open());
    // Only the output framebuffer remains
    assert_eq!(h.backend.framebuffer_count(), 1);
}
