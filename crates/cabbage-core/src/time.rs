//! Composition time.
//!
//! Request times and layer visibility windows are rational, so a frame time
//! computed from a frame index compares exactly against a window boundary.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A point on the composition timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RationalTime(Rational64);

impl RationalTime {
    pub const ZERO: Self = Self(Rational64::new_raw(0, 1));

    /// `numerator / denominator` seconds.
    ///
    /// # Panics
    ///
    /// Panics if `denominator` is zero. Use [`try_new`](Self::try_new) for
    /// values that come from outside the program.
    #[inline]
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self(Rational64::new(numerator, denominator))
    }

    /// `numerator / denominator` seconds, or `None` if `denominator` is zero.
    #[inline]
    pub fn try_new(numerator: i64, denominator: i64) -> Option<Self> {
        (denominator != 0).then(|| Self::new(numerator, denominator))
    }

    /// Presentation time of frame `index` at `rate`.
    ///
    /// # Panics
    ///
    /// Panics if `rate` has a zero numerator or the frame time overflows `i64`.
    #[inline]
    pub fn from_frames(index: i64, rate: FrameRate) -> Self {
        Self::new(
            index * i64::from(rate.denominator),
            i64::from(rate.numerator),
        )
    }

    #[inline]
    pub fn seconds(self) -> f64 {
        *self.0.numer() as f64 / *self.0.denom() as f64
    }

    /// Index of the frame at `rate` that is showing at this time.
    ///
    /// # Panics
    ///
    /// Panics if the rate's denominator is zero.
    #[inline]
    pub fn frame_index(self, rate: FrameRate) -> i64 {
        let frames = self.0 * Rational64::new(i64::from(rate.numerator), i64::from(rate.denominator));
        frames.floor().to_integer()
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
        Self(self.0 + rhs.0)
    }
}

impl Sub for RationalTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.seconds())
    }
}

/// Frames per second as `numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);

    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// A rate with both terms non-zero, or `None`.
    pub const fn try_new(numerator: u32, denominator: u32) -> Option<Self> {
        if numerator == 0 || denominator == 0 {
            None
        } else {
            Some(Self::new(numerator, denominator))
        }
    }

    /// Time between two consecutive frames.
    ///
    /// # Panics
    ///
    /// Panics if the rate's numerator is zero.
    #[inline]
    pub fn frame_duration(self) -> RationalTime {
        RationalTime::new(i64::from(self.denominator), i64::from(self.numerator))
    }
}

/// Half-open window `[start, end)` on the timeline; `end: None` never closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: RationalTime,
    pub end: Option<RationalTime>,
}

impl TimeRange {
    /// Window of `duration` beginning at `start`.
    pub fn new(start: RationalTime, duration: RationalTime) -> Self {
        Self::from_start_end(start, start + duration)
    }

    pub fn from_start_end(start: RationalTime, end: RationalTime) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Window that opens at `start` and stays open.
    pub fn starting_at(start: RationalTime) -> Self {
        Self { start, end: None }
    }

    pub fn is_empty(self) -> bool {
        self.end.is_some_and(|end| end <= self.start)
    }

    #[inline]
    pub fn contains(self, time: RationalTime) -> bool {
        time >= self.start && self.end.map_or(true, |end| time < end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_times_are_exact() {
        let rate = FrameRate::FPS_29_97;
        let t = RationalTime::from_frames(30_000, rate);
        assert_eq!(t, RationalTime::new(1001, 1));
        assert_eq!(t.frame_index(rate), 30_000);
        assert_eq!((t + rate.frame_duration()).frame_index(rate), 30_001);
    }

    #[test]
    fn test_frame_index_floors_between_frames() {
        let t = RationalTime::new(1, 50);
        assert_eq!(t.frame_index(FrameRate::FPS_30), 0);
        assert_eq!(RationalTime::new(1, 2).frame_index(FrameRate::FPS_24), 12);
    }

    #[test]
    fn test_range_is_half_open() {
        let range = TimeRange::from_start_end(RationalTime::new(1, 1), RationalTime::new(2, 1));
        assert!(range.contains(RationalTime::new(1, 1)));
        assert!(range.contains(RationalTime::new(3, 2)));
        assert!(!range.contains(RationalTime::new(2, 1)));
        assert!(!range.contains(RationalTime::ZERO));
    }

    #[test]
    fn test_open_range_never_closes() {
        let range = TimeRange::starting_at(RationalTime::new(5, 1));
        assert!(range.contains(RationalTime::new(i64::MAX / 2, 1)));
        assert!(!range.contains(RationalTime::new(4, 1)));
        assert!(!range.is_empty());
    }

    #[test]
    fn test_new_adds_duration() {
        let range = TimeRange::new(RationalTime::new(1, 2), RationalTime::new(1, 4));
        assert_eq!(range.end, Some(RationalTime::new(3, 4)));
        assert!(TimeRange::new(RationalTime::ZERO, RationalTime::ZERO).is_empty());
    }

    #[test]
    fn test_zero_denominators_rejected() {
        assert_eq!(RationalTime::try_new(1, 0), None);
        assert_eq!(RationalTime::try_new(3, 6), Some(RationalTime::new(1, 2)));
        assert_eq!(FrameRate::try_new(0, 1), None);
        assert_eq!(FrameRate::try_new(24, 0), None);
        assert_eq!(FrameRate::try_new(25, 1), Some(FrameRate::FPS_25));
    }

    #[test]
    #[should_panic]
    fn test_new_panics_on_zero_denominator() {
        let _ = RationalTime::new(1, 0);
    }

    #[test]
    fn test_display_in_seconds() {
        assert_eq!(RationalTime::new(3, 2).to_string(), "1.500s");
    }
}
