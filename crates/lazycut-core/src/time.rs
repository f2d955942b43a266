//! Timeline time representation
//!
//! Positions are rational seconds so that stepping by a frame interval of
//! e.g. 1001/30000 never accumulates floating-point drift, and so that two
//! positions inside the same frame quantize to bit-identical cache keys.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

/// A rational time value representing a point on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RationalTime {
    /// Time value as a rational number (seconds)
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
    ///
    /// An unknown rate (zero numerator or denominator) yields `ZERO`.
    #[inline]
    pub fn from_frames(frames: i64, rate: FrameRate) -> Self {
        if !rate.is_known() {
            return Self::ZERO;
        }
        Self {
            value: Rational64::new(frames * rate.denominator as i64, rate.numerator as i64),
        }
    }

    /// Create a RationalTime from seconds as a float, with microsecond precision.
    pub fn from_seconds_f64(seconds: f64) -> Self {
        const PRECISION: i64 = 1_000_000;
        Self {
            value: Rational64::new((seconds * PRECISION as f64).round() as i64, PRECISION),
        }
    }

    /// Create a RationalTime from whole microseconds.
    #[inline]
    pub fn from_micros(micros: i64) -> Self {
        Self::new(micros, 1_000_000)
    }

    /// Convert to seconds as f64.
    #[inline]
    pub fn to_seconds_f64(self) -> f64 {
        *self.value.numer() as f64 / *self.value.denom() as f64
    }

    /// Whole microseconds, rounded toward negative infinity.
    pub fn to_micros(self) -> i64 {
        (self.value * Rational64::from_integer(1_000_000))
            .floor()
            .to_integer()
    }

    /// Frame index containing this time at the given rate (floor).
    ///
    /// Returns 0 for an unknown rate.
    #[inline]
    pub fn to_frames(self, rate: FrameRate) -> i64 {
        if !rate.is_known() {
            return 0;
        }
        let frames = self.value
            * Rational64::new(rate.numerator as i64, rate.denominator as i64);
        frames.floor().to_integer()
    }

    /// Snap down to the start of the frame containing this time.
    ///
    /// With an unknown rate the time is returned unchanged.
    pub fn quantize(self, rate: FrameRate) -> Self {
        if !rate.is_known() {
            return self;
        }
        Self::from_frames(self.to_frames(rate), rate)
    }

    /// Seconds formatted for an ffmpeg `-ss` argument: three decimals with
    /// trailing zeros and a dangling period removed (`1.5`, `2`, `0`).
    pub fn ffmpeg_seconds(self) -> String {
        let formatted = format!("{:.3}", self.to_seconds_f64().max(0.0));
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
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

    /// Check if this time is before zero.
    #[inline]
    pub fn is_negative(self) -> bool {
        *self.value.numer() < 0
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

impl Mul<i64> for RationalTime {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self {
            value: self.value * rhs,
        }
    }
}

impl Div<i64> for RationalTime {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self {
            value: self.value / rhs,
        }
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.to_seconds_f64())
    }
}

/// Frame rate as a rational number (e.g., 30000/1001 for 29.97 fps).
///
/// A zero numerator or denominator means the rate is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Parse a probe-style ratio such as `30000/1001` or `25`.
    ///
    /// Malformed input or a zero denominator yields `ZERO`.
    pub fn parse_ratio(s: &str) -> Self {
        let mut parts = s.trim().splitn(2, '/');
        let numerator = parts.next().and_then(|n| n.trim().parse::<u32>().ok());
        let denominator = match parts.next() {
            Some(d) => d.trim().parse::<u32>().ok(),
            None => Some(1),
        };
        match (numerator, denominator) {
            (Some(n), Some(d)) if d != 0 => Self::new(n, d),
            _ => Self::ZERO,
        }
    }

    /// True if both terms are non-zero.
    #[inline]
    pub fn is_known(self) -> bool {
        self.numerator > 0 && self.denominator > 0
    }

    /// This rate, or 24 fps when unknown.
    #[inline]
    pub fn or_default(self) -> Self {
        if self.is_known() {
            self
        } else {
            Self::FPS_24
        }
    }

    /// Limit to at most `max` whole frames per second.
    pub fn capped(self, max: u32) -> Self {
        if max > 0 && self.to_fps_f64() > max as f64 {
            Self::new(max, 1)
        } else {
            self
        }
    }

    /// Convert to frames per second as f64 (0.0 when unknown).
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.numerator as f64 / self.denominator as f64
    }

    /// Duration of a single frame, falling back to 24 fps when unknown.
    #[inline]
    pub fn frame_duration(self) -> RationalTime {
        let rate = self.or_default();
        RationalTime::new(rate.denominator as i64, rate.numerator as i64)
    }

    /// Value for an ffmpeg `fps=` filter (`25` or `30000/1001`).
    pub fn filter_arg(self) -> String {
        if self.denominator == 1 {
            self.numerator.to_string()
        } else {
            format!("{}/{}", self.numerator, self.denominator)
        }
    }

    pub const ZERO: Self = Self::new(0, 1);
    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} fps", self.to_fps_f64())
    }
}
