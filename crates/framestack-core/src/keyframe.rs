//! Keyframed parameter tracks.
//!
//! Effect fields are stored as tracks of keyframes evaluated against the
//! clip-local timecode. Easing between keys uses a cubic Bézier solved with
//! Newton-Raphson.

use serde::{Deserialize, Serialize};

use crate::time::RationalTime;

// ── Easing curves ───────────────────────────────────────────────

/// Cubic Bézier control points for easing (x1, y1, x2, y2).
/// The curve goes from (0,0) to (1,1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CubicBezier {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    fn sample(t: f64, p1: f64, p2: f64) -> f64 {
        let mt = 1.0 - t;
        3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t
    }

    fn sample_dx(&self, t: f64) -> f64 {
        let mt = 1.0 - t;
        3.0 * mt * mt * self.x1 + 6.0 * mt * t * (self.x2 - self.x1) + 3.0 * t * t * (1.0 - self.x2)
    }

    /// Map an input fraction `x` in 0..1 to the eased output fraction.
    pub fn evaluate(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }

        let mut t = x;
        for _ in 0..8 {
            let err = Self::sample(t, self.x1, self.x2) - x;
            if err.abs() < 1e-10 {
                break;
            }
            let dx = self.sample_dx(t);
            if dx.abs() < 1e-12 {
                break;
            }
            t = (t - err / dx).clamp(0.0, 1.0);
        }

        Self::sample(t, self.y1, self.y2)
    }

    pub const LINEAR: Self = Self::new(0.0, 0.0, 1.0, 1.0);
    pub const EASE_IN: Self = Self::new(0.42, 0.0, 1.0, 1.0);
    pub const EASE_OUT: Self = Self::new(0.0, 0.0, 0.58, 1.0);
    pub const EASE_IN_OUT: Self = Self::new(0.42, 0.0, 0.58, 1.0);
}

/// How to interpolate from one keyframe to the next.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum EasingCurve {
    /// Hold the value until the next keyframe.
    Hold,
    #[default]
    Linear,
    Bezier(CubicBezier),
}

// ── Keyframe ────────────────────────────────────────────────────

/// A single keyframe, timed relative to the clip start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: RationalTime,
    pub value: f64,
    /// Easing used when interpolating towards the next keyframe.
    pub easing: EasingCurve,
}

// ── Keyframe track ──────────────────────────────────────────────

/// A track of keyframes for a single animated parameter.
///
/// Besides pure evaluation the track remembers the value it was last
/// refreshed to, which is what parameter displays read between frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyframeTrack {
    pub name: String,
    keyframes: Vec<Keyframe>,
    #[serde(skip)]
    live: Option<f64>,
}

impl KeyframeTrack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keyframes: Vec::new(),
            live: None,
        }
    }

    /// Create a track with a constant value (single keyframe at t=0).
    pub fn constant(name: impl Into<String>, value: f64) -> Self {
        let mut track = Self::new(name);
        track.set(RationalTime::ZERO, value, EasingCurve::Hold);
        track
    }

    /// Insert or update a keyframe, keeping keys sorted by time.
    pub fn set(&mut self, time: RationalTime, value: f64, easing: EasingCurve) {
        match self.keyframes.binary_search_by(|kf| kf.time.cmp(&time)) {
            Ok(pos) => {
                let kf = &mut self.keyframes[pos];
                kf.value = value;
                kf.easing = easing;
            }
            Err(pos) => self.keyframes.insert(
                pos,
                Keyframe {
                    time,
                    value,
                    easing,
                },
            ),
        }
    }

    /// Remove the keyframe at the given time.
    pub fn remove(&mut self, time: RationalTime) -> bool {
        match self.keyframes.binary_search_by(|kf| kf.time.cmp(&time)) {
            Ok(pos) => {
                self.keyframes.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Evaluate the track at a given time. Values clamp to the first and
    /// last keyframe outside the keyed range.
    pub fn evaluate(&self, time: RationalTime) -> f64 {
        let (first, last) = match (self.keyframes.first(), self.keyframes.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }
        let idx = self
            .keyframes
            .partition_point(|kf| kf.time <= time)
            .saturating_sub(1);
        Self::interpolate(&self.keyframes[idx], &self.keyframes[idx + 1], time)
    }

    fn interpolate(a: &Keyframe, b: &Keyframe, time: RationalTime) -> f64 {
        let t_start = a.time.to_seconds_f64();
        let span = b.time.to_seconds_f64() - t_start;
        if span <= 0.0 {
            return a.value;
        }
        let t = ((time.to_seconds_f64() - t_start) / span).clamp(0.0, 1.0);

        let eased = match a.easing {
            EasingCurve::Hold => return a.value,
            EasingCurve::Linear => t,
            EasingCurve::Bezier(bezier) => bezier.evaluate(t),
        };
        a.value + (b.value - a.value) * eased
    }

    /// Re-evaluate at `time` and store the result as the live value.
    pub fn refresh(&mut self, time: RationalTime) -> f64 {
        let value = self.evaluate(time);
        self.live = Some(value);
        value
    }

    /// Value stored by the most recent [`refresh`](Self::refresh).
    pub fn live_value(&self) -> Option<f64> {
        self.live
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Whether this track has more than one keyframe.
    pub fn is_animated(&self) -> bool {
        self.keyframes.len() > 1
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_interpolation() {
        let mut track = KeyframeTrack::new("opacity");
        track.set(RationalTime::new(0, 1), 0.0, EasingCurve::Linear);
        track.set(RationalTime::new(1, 1), 1.0, EasingCurve::Linear);

        assert!((track.evaluate(RationalTime::new(1, 2)) - 0.5).abs() < 0.001);
        assert!((track.evaluate(RationalTime::new(1, 1)) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_hold_interpolation() {
        let mut track = KeyframeTrack::new("visible");
        track.set(RationalTime::new(0, 1), 0.0, EasingCurve::Hold);
        track.set(RationalTime::new(1, 1), 1.0, EasingCurve::Hold);

        assert!((track.evaluate(RationalTime::new(1, 2)) - 0.0).abs() < 0.001);
        assert!((track.evaluate(RationalTime::new(1, 1)) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_bezier_ease_in_out() {
        let mut track = KeyframeTrack::new("position");
        track.set(
            RationalTime::new(0, 1),
            0.0,
            EasingCurve::Bezier(CubicBezier::EASE_IN_OUT),
        );
        track.set(RationalTime::new(1, 1), 100.0, EasingCurve::Linear);

        let mid = track.evaluate(RationalTime::new(1, 2));
        assert!((mid - 50.0).abs() < 5.0);
        assert!(track.evaluate(RationalTime::new(1, 10)) < 10.0);
    }

    #[test]
    fn test_cubic_bezier_linear() {
        for i in 0..=10 {
            let x = i as f64 / 10.0;
            let y = CubicBezier::LINEAR.evaluate(x);
            assert!((y - x).abs() < 0.001, "x={} y={}", x, y);
        }
    }

    #[test]
    fn test_clamps_outside_keyed_range() {
        let mut track = KeyframeTrack::new("scale");
        track.set(RationalTime::new(1, 1), 10.0, EasingCurve::Linear);
        track.set(RationalTime::new(3, 1), 30.0, EasingCurve::Linear);

        assert!((track.evaluate(RationalTime::ZERO) - 10.0).abs() < 0.001);
        assert!((track.evaluate(RationalTime::new(5, 1)) - 30.0).abs() < 0.001);
    }

    #[test]
    fn test_overwrite_and_remove() {
        let mut track = KeyframeTrack::new("x");
        track.set(RationalTime::ZERO, 0.0, EasingCurve::Linear);
        track.set(RationalTime::ZERO, 5.0, EasingCurve::Hold);
        assert_eq!(track.len(), 1);
        assert!((track.evaluate(RationalTime::ZERO) - 5.0).abs() < 0.001);

        assert!(track.remove(RationalTime::ZERO));
        assert!(!track.remove(RationalTime::ZERO));
        assert!(track.is_empty());
        assert_eq!(track.evaluate(RationalTime::ZERO), 0.0);
    }

    #[test]
    fn test_refresh_updates_live_value() {
        let mut track = KeyframeTrack::new("opacity");
        track.set(RationalTime::ZERO, 0.0, EasingCurve::Linear);
        track.set(RationalTime::new(2, 1), 1.0, EasingCurve::Linear);
        assert_eq!(track.live_value(), None);

        track.refresh(RationalTime::new(1, 1));
        assert!((track.live_value().unwrap_or_default() - 0.5).abs() < 0.001);
    }
}
