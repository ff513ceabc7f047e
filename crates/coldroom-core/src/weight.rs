//! # Weight Module
//!
//! Kilogram quantities as two-decimal fixed point.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Weight(i64) = hundredths of a kilogram (1 unit = 10 g)                 │
//! │                                                                         │
//! │   "30"     → Weight(3000)   → 30.00kg                                   │
//! │   "2.5"    → Weight(250)    →  2.50kg                                   │
//! │   "0.125"  → Weight(13)     →  0.13kg   (half-up at input)              │
//! │                                                                         │
//! │  Thousands of partial-kilogram sales never drift: every draw is exact  │
//! │  integer subtraction.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{format_hundredths, parse_hundredths};

/// A weight in hundredths of a kilogram.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Weight(i64);

impl Weight {
    #[inline]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Weight(hundredths)
    }

    /// Whole kilograms.
    #[inline]
    pub const fn from_kg(kg: i64) -> Self {
        Weight(kg * 100)
    }

    #[inline]
    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Weight(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// `self × count`, or `None` on overflow.
    ///
    /// A sale line of `count` packs of this size draws `times(count)`.
    #[inline]
    pub const fn times(&self, count: i64) -> Option<Self> {
        match self.0.checked_mul(count) {
            Some(v) => Some(Weight(v)),
            None => None,
        }
    }

    /// Negative values read as zero.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Weight(0)
        } else {
            Weight(self.0)
        }
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_hundredths(self.0, f)?;
        f.write_str("kg")
    }
}

impl FromStr for Weight {
    type Err = ValidationError;

    /// Accepts `12.5` or `12.5kg`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed
            .strip_suffix("kg")
            .or_else(|| trimmed.strip_suffix("KG"))
            .unwrap_or(trimmed);
        parse_hundredths(number)
            .map(Weight)
            .ok_or_else(|| ValidationError::invalid_format("weight", format!("'{s}' is not a weight in kg")))
    }
}

impl Add for Weight {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Weight(self.0 + other.0)
    }
}

impl AddAssign for Weight {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Weight {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Weight(self.0 - other.0)
    }
}

impl SubAssign for Weight {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl std::iter::Sum for Weight {
    fn sum<I: Iterator<Item = Weight>>(iter: I) -> Self {
        iter.fold(Weight::zero(), |acc, w| acc + w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Weight::from_kg(60).to_string(), "60.00kg");
        assert_eq!(Weight::from_hundredths(250).to_string(), "2.50kg");
        assert_eq!(Weight::from_hundredths(7).to_string(), "0.07kg");
    }

    #[test]
    fn test_parse() {
        assert_eq!("30".parse::<Weight>().unwrap(), Weight::from_kg(30));
        assert_eq!("2.5kg".parse::<Weight>().unwrap().hundredths(), 250);
        assert_eq!(" 0.125 ".parse::<Weight>().unwrap().hundredths(), 13);
        assert_eq!("0.124".parse::<Weight>().unwrap().hundredths(), 12);
        assert!("five".parse::<Weight>().is_err());
    }

    #[test]
    fn test_times() {
        assert_eq!(Weight::from_kg(5).times(3), Some(Weight::from_kg(15)));
        assert_eq!(Weight::from_hundredths(i64::MAX).times(2), None);
    }

    #[test]
    fn test_ordering_and_min() {
        let a = Weight::from_kg(5);
        let b = Weight::from_hundredths(499);
        assert!(b < a);
        assert_eq!(a.min(b), b);
    }
}
