//! The timeline the headless renderer draws.
//!
//! Two layers of colour bars, a nested title sequence running at a
//! different rate, and a tone on the first audio track. Enough to exercise
//! autoscale, effect chains, transitions and nesting in one pass.

use framestack_core::{EasingCurve, FrameRate, RationalTime};
use framestack_effects::{EffectRegistry, TransitionRegistry};
use framestack_media::ThreadedDecoder;
use framestack_timeline::{Clip, Footage, FootageStream, Media, Sequence, SharedSequence, TrackIndex};
use tracing::{info, warn};

use crate::config::AppConfig;

const FOOTAGE_LENGTH: i64 = 240;

pub fn build_sequence(config: &AppConfig, decoder: &ThreadedDecoder) -> Sequence {
    let effects = EffectRegistry::new();
    let transitions = TransitionRegistry::new();
    let (width, height, rate) = (config.width, config.height, config.frame_rate);

    let bars = footage(decoder, "bars", width, height, rate);
    // Half size, so autoscale has something to do
    let inset = footage(decoder, "inset", (width / 2).max(1), (height / 2).max(1), rate);

    let mut background = Clip::new("background", TrackIndex::video(2), 0, 144).with_media(bars, 0);
    if let Some(effect) = effects.create("Brightness & Contrast") {
        background = background.with_effect(effect.with_value("contrast", 20.0));
    }

    let mut foreground = Clip::new("inset", TrackIndex::video(1), 24, 120)
        .with_media(inset, 0)
        .with_clip_in(12);
    foreground.autoscale = false;
    if let Some(mut transform) = effects.create("Transform") {
        if let Some(field) = transform.field_mut("position_x") {
            let track = field.track_mut();
            track.set(RationalTime::ZERO, -(width as f64) / 4.0, EasingCurve::Linear);
            track.set(RationalTime::from_frames(96, rate), width as f64 / 4.0, EasingCurve::Linear);
        }
        foreground = foreground.with_effect(transform);
    }
    if let Some(opening) = transitions.create("Cross Dissolve", 12) {
        foreground = foreground.with_opening(opening);
    }
    if let Some(closing) = transitions.create("Dip to Black", 12) {
        foreground = foreground.with_closing(closing);
    }

    let title = title_sequence(&effects, width, height);
    let mut nest = Clip::new("title", TrackIndex::video(1), 120, 144).with_media(Media::Sequence(title), 0);
    if let Some(opening) = transitions.create("Wipe", 8) {
        nest = nest.with_opening(opening);
    }

    let tone = tone_footage(decoder);
    let music = Clip::new("tone", TrackIndex::audio(1), 0, 144).with_media(tone, 0);

    let mut sequence = Sequence::new("Demo", width, height, rate);
    for clip in [background, foreground, nest, music] {
        sequence.add_clip(clip);
    }
    info!(
        "Built demo sequence: {} clips, {} frames at {}x{}",
        sequence.clips.len(),
        sequence.duration(),
        width,
        height
    );
    sequence
}

fn footage(decoder: &ThreadedDecoder, name: &str, width: u32, height: u32, rate: FrameRate) -> Media {
    let footage = Footage::new(
        name,
        format!("{name}.mov"),
        vec![FootageStream::video(0, width, height, rate)],
    )
    .with_length(FOOTAGE_LENGTH);
    decoder.probe_footage(&footage);
    if footage.is_invalid() {
        warn!("Footage {} failed to probe", name);
    }
    Media::footage(footage)
}

fn tone_footage(decoder: &ThreadedDecoder) -> Media {
    let footage = Footage::new("tone", "tone.wav", vec![FootageStream::audio(0, 48_000, 2)])
        .with_length(FOOTAGE_LENGTH);
    decoder.probe_footage(&footage);
    Media::footage(footage)
}

/// A 30 fps sequence holding an inverted solid, nested into the 24 fps
/// main sequence.
fn title_sequence(effects: &EffectRegistry, width: u32, height: u32) -> SharedSequence {
    let mut title = Sequence::new("Title", width, height, FrameRate::FPS_30);
    let mut card = Clip::new("card", TrackIndex::video(1), 0, 60);
    if let Some(solid) = effects.create("Solid Color") {
        card = card.with_effect(solid.with_value("blue", 64.0));
    }
    if let Some(invert) = effects.create("Invert") {
        card = card.with_effect(invert.with_value("amount", 50.0));
    }
    title.add_clip(card);
    title.into_shared()
}
