//! Time representation for frame-accurate compositing
//!
//! Sequence positions are integer frame counts in the sequence's own rate.
//! Rational numbers are used wherever a value crosses into another rate
//! domain, so repeated conversions through nested sequences never drift.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Frame index in a sequence's own frame-rate domain.
pub type FrameNumber = i64;

/// A rational time value in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RationalTime {
    value: Rational64,
}

impl RationalTime {
    /// Create a new RationalTime of `numerator / denominator` seconds.
    #[inline]
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            value: Rational64::new(numerator, denominator),
        }
    }

    /// Create a RationalTime from a frame number and frame rate.
    #[inline]
    pub fn from_frames(frames: FrameNumber, rate: FrameRate) -> Self {
        Self {
            value: Rational64::new(frames * rate.denominator as i64, rate.numerator as i64),
        }
    }

    /// Create a RationalTime from seconds as a float.
    /// Note: May introduce small precision errors.
    pub fn from_seconds_f64(seconds: f64) -> Self {
        const PRECISION: i64 = 1_000_000;
        Self {
            value: Rational64::new((seconds * PRECISION as f64).round() as i64, PRECISION),
        }
    }

    /// Convert to seconds as f64.
    #[inline]
    pub fn to_seconds_f64(self) -> f64 {
        *self.value.numer() as f64 / *self.value.denom() as f64
    }

    /// Convert to the frame containing this time at the given rate.
    #[inline]
    pub fn to_frames(self, rate: FrameRate) -> FrameNumber {
        let frames = self.value * Rational64::new(rate.numerator as i64, rate.denominator as i64);
        frames.floor().to_integer()
    }

    /// Zero time constant.
    pub const ZERO: Self = Self {
        value: Rational64::new_raw(0, 1),
    };

    /// Check if this time is zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        *self.value.numer() == 0
    }
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for RationalTime {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
        }
    }
}

impl Sub for RationalTime {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
        }
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.to_seconds_f64())
    }
}

/// Frame rate as a rational number (e.g., 24000/1001 for 23.976 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 24000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Duration of a single frame.
    #[inline]
    pub fn frame_duration(self) -> RationalTime {
        RationalTime::new(self.denominator as i64, self.numerator as i64)
    }

    /// Length of `frames` frames in seconds.
    #[inline]
    pub fn frames_to_seconds(self, frames: FrameNumber) -> f64 {
        RationalTime::from_frames(frames, self).to_seconds_f64()
    }

    /// Common frame rates
    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_50: Self = Self::new(50, 1);
    pub const FPS_59_94: Self = Self::new(60000, 1001);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_24
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

/// Convert a frame index from one rate domain to another.
///
/// The conversion is exact up to a single rounding step (half away from
/// zero), so `retime_frame(f, a, b)` never differs from the true value by
/// more than half a frame no matter how many nesting levels feed into `f`.
pub fn retime_frame(frame: FrameNumber, from: FrameRate, to: FrameRate) -> FrameNumber {
    if from == to {
        return frame;
    }
    let num = frame as i128 * from.denominator as i128 * to.numerator as i128;
    let den = from.numerator as i128 * to.denominator as i128;
    if den == 0 {
        return frame;
    }
    let rounded = if num >= 0 {
        (2 * num + den) / (2 * den)
    } else {
        -((-2 * num + den) / (2 * den))
    };
    rounded as FrameNumber
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rational_time_frames() {
        let rate = FrameRate::FPS_24;
        let time = RationalTime::from_frames(48, rate);
        assert_eq!(time.to_seconds_f64(), 2.0);
        assert_eq!(time.to_frames(rate), 48);
    }

    #[test]
    fn test_negative_time_floors() {
        let time = RationalTime::new(-1, 48);
        assert_eq!(time.to_frames(FrameRate::FPS_24), -1);
    }

    #[test]
    fn test_frame_rate_23_976() {
        let rate = FrameRate::FPS_23_976;
        let fps = rate.to_fps_f64();
        assert!((fps - 23.976).abs() < 0.001);
    }

    #[test]
    fn test_retime_same_rate_is_identity() {
        assert_eq!(retime_frame(1234, FrameRate::FPS_25, FrameRate::FPS_25), 1234);
    }

    #[test]
    fn test_retime_rounds_half_away_from_zero() {
        // 5 frames at 24fps = 6.25 frames at 30fps
        assert_eq!(retime_frame(5, FrameRate::FPS_24, FrameRate::FPS_30), 6);
        // 2 frames at 24fps = 2.5 frames at 30fps
        assert_eq!(retime_frame(2, FrameRate::FPS_24, FrameRate::FPS_30), 3);
        assert_eq!(retime_frame(-2, FrameRate::FPS_24, FrameRate::FPS_30), -3);
    }

    #[test]
    fn test_retime_ntsc() {
        // One hour of 29.97 maps to one hour of 59.94
        let frames = 107_892;
        assert_eq!(
            retime_frame(frames, FrameRate::FPS_29_97, FrameRate::FPS_59_94),
            frames * 2
        );
        assert_eq!(retime_frame(100, FrameRate::FPS_30, FrameRate::FPS_29_97), 100);
    }

    #[test]
    fn test_time_arithmetic() {
        let a = RationalTime::new(1, 2);
        let b = RationalTime::new(1, 4);
        assert_eq!((a + b).to_seconds_f64(), 0.75);
        assert_eq!((a - b).to_seconds_f64(), 0.25);
    }

    fn any_rate() -> impl Strategy<Value = FrameRate> {
        prop_oneof![
            Just(FrameRate::FPS_23_976),
            Just(FrameRate::FPS_24),
            Just(FrameRate::FPS_25),
            Just(FrameRate::FPS_29_97),
            Just(FrameRate::FPS_30),
            Just(FrameRate::FPS_50),
            Just(FrameRate::FPS_59_94),
            Just(FrameRate::FPS_60),
        ]
    }

    proptest! {
        #[test]
        fn retime_within_half_frame(frame in -1_000_000i64..1_000_000, from in any_rate(), to in any_rate()) {
            let exact = frame as f64 * to.to_fps_f64() / from.to_fps_f64();
            let got = retime_frame(frame, from, to) as f64;
            prop_assert!((got - exact).abs() <= 0.5 + 1e-6);
        }

        #[test]
        fn retime_is_monotonic(a in -100_000i64..100_000, b in -100_000i64..100_000, from in any_rate(), to in any_rate()) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(retime_frame(lo, from, to) <= retime_frame(hi, from, to));
        }

        #[test]
        fn retime_is_odd(frame in 0i64..100_000, from in any_rate(), to in any_rate()) {
            prop_assert_eq!(retime_frame(-frame, from, to), -retime_frame(frame, from, to));
        }
    }
}
