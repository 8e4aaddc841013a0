//! The audio pass feeding the shipped audio engine.

use framestack_audio::{AudioEngine, Tone};
use framestack_core::{FrameRate, RenderIssue};
use framestack_render::AudioPass;
use framestack_timeline::{Clip, Media, Sequence, TrackIndex};
use std::sync::Arc;

use crate::common::Harness;

/// 2400 Hz keeps a 24 fps frame at 100 stereo frames.
fn engine() -> Arc<AudioEngine> {
    Arc::new(AudioEngine::with_sample_rate(Arc::new(Tone::new(100.0, 0.5)), 2400))
}

fn with_tone(h: &Harness, playhead: i64) -> Sequence {
    let mut seq = Sequence::new("Main", 8, 8, FrameRate::FPS_24);
    seq.add_clip(Clip::new("tone", TrackIndex::audio(1), 0, 100).with_media(h.sound("tone"), 0));
    seq.playhead = playhead;
    seq
}

#[test]
fn playback_queues_one_frame_of_audio() {
    let engine = engine();
    let h = Harness::with_audio(8, 8, engine.clone());
    let mut seq = with_tone(&h, 3);

    let outcome = h.compositor.compose_audio(&mut seq, AudioPass::playback(1.0));
    assert_eq!(outcome.cached, 1);
    assert!(outcome.health.is_clean());
    assert_eq!(engine.output_buffer().available_read(), 200);
}

#[test]
fn busy_clip_is_skipped_not_waited_on() {
    let engine = engine();
    let h = Harness::with_audio(8, 8, engine.clone());
    let mut seq = with_tone(&h, 3);
    let playback = Arc::clone(&seq.clips[0].playback);

    {
        let _worker = playback.try_lock_cache().unwrap();
        let outcome = h.compositor.compose_audio(&mut seq, AudioPass::playback(1.0));
        assert_eq!(outcome.skipped_locked, 1);
        assert_eq!(engine.output_buffer().available_read(), 0);
    }

    h.compositor.compose_audio(&mut seq, AudioPass::playback(1.0));
    assert_eq!(engine.output_buffer().available_read(), 200);
}

#[test]
fn nested_audio_reaches_the_engine() {
    let engine = engine();
    let h = Harness::with_audio(8, 8, engine.clone());
    let inner = with_tone(&h, 0);
    let mut main = Sequence::new("Main", 8, 8, FrameRate::FPS_24);
    main.add_clip(
        Clip::new("nest", TrackIndex::audio(2), 0, 100).with_media(Media::Sequence(inner.into_shared()), 0),
    );
    main.playhead = 10;

    let outcome = h.compositor.compose_audio(&mut main, AudioPass::playback(1.0));
    assert_eq!(outcome.active_clips, 2);
    assert_eq!(outcome.cached, 1);
    assert!(!outcome.wake_playback);
    assert_eq!(engine.output_buffer().available_read(), 200);
}

#[test]
fn missing_device_skips_audio_only() {
    let engine = Arc::new(
        AudioEngine::with_sample_rate(Arc::new(Tone::default()), 2400).with_availability(false),
    );
    let mut h = Harness::with_audio(8, 8, engine.clone());
    let mut seq = with_tone(&h, 3);
    seq.add_clip(Clip::new("picture", TrackIndex::video(1), 0, 100).with_media(h.video("red", 8, 8), 0));

    let audio = h.compositor.compose_audio(&mut seq, AudioPass::playback(1.0));
    assert_eq!(audio.cached, 0);
    assert!(audio.wake_playback);
    assert!(!audio.health.retry);
    assert!(audio
        .health
        .any(|i| matches!(i, RenderIssue::NoAudioDevice { .. })));

    let video = h.render(&mut seq);
    assert!(video.health.is_clean());
    assert_eq!(engine.output_buffer().available_read(), 0);
}
