//! Closed integer intervals used by range values and interval constants

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed interval `[lo, hi]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntRange {
    pub lo: i64,
    pub hi: i64,
}

impl IntRange {
    pub fn new(lo: i64, hi: i64) -> Self {
        debug_assert!(lo <= hi, "malformed interval [{}, {}]", lo, hi);
        Self { lo, hi }
    }

    pub fn singular(value: i64) -> Self {
        Self { lo: value, hi: value }
    }

    #[inline]
    pub fn is_singular(&self) -> bool {
        self.lo == self.hi
    }

    #[inline]
    pub fn contains(&self, value: i64) -> bool {
        self.lo <= value && value <= self.hi
    }

    /// True if `self` lies within `outer`
    #[inline]
    pub fn is_subset_of(&self, outer: &IntRange) -> bool {
        outer.lo <= self.lo && self.hi <= outer.hi
    }

    #[inline]
    pub fn is_disjoint_with(&self, other: &IntRange) -> bool {
        self.hi < other.lo || other.hi < self.lo
    }

    /// Interval shifted by `off`
    #[inline]
    pub fn shifted(&self, off: i64) -> Self {
        Self {
            lo: self.lo + off,
            hi: self.hi + off,
        }
    }

    /// Interval of `a - b` for `a ∈ self`, `b ∈ other`
    pub fn minus(&self, other: &IntRange) -> Self {
        Self {
            lo: self.lo - other.hi,
            hi: self.hi - other.lo,
        }
    }

    #[inline]
    pub fn width(&self) -> u64 {
        self.hi.abs_diff(self.lo)
    }
}

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_singular() {
            write!(f, "{}", self.lo)
        } else {
            write!(f, "[{}, {}]", self.lo, self.hi)
        }
    }
}
