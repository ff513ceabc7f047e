//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer pesewas (1/100 of a cedi)                        │
//! │    Every price, VAT amount and credit balance is an i64.               │
//! │    Decimal text is quantized ONCE, at input, with round-half-up.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use coldroom_core::money::Money;
//!
//! let price = Money::from_cents(4550); // 45.50
//! let line = price.checked_mul_quantity(2).unwrap();
//! assert_eq!(line.cents(), 9100);
//!
//! let parsed: Money = "45.505".parse().unwrap();
//! assert_eq!(parsed.cents(), 4551); // half-up
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (pesewas / cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative intermediate values (discount overshoot)
/// - **Single field tuple struct**: Zero-cost abstraction over i64
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    ///
    /// A discount larger than the subtotal leaves a zero subtotal, never a
    /// negative one.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Calculates tax with round-half-up to the cent.
    ///
    /// ## Implementation
    /// Integer math: `(amount * rate + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use coldroom_core::money::Money;
    /// use coldroom_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(10_050); // 100.50
    /// let vat = subtotal.calculate_tax(TaxRate::from_bps(1500)); // 15%
    /// // 100.50 × 15% = 15.075 → 15.08
    /// assert_eq!(vat.cents(), 1508);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 prevents overflow on large amounts
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity; `None` on overflow.
    #[inline]
    pub const fn checked_mul_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts; `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

// =============================================================================
// Fixed-Point Parsing
// =============================================================================

/// Parses decimal text into hundredths, rounding half-up (away from zero).
///
/// Shared by `Money` and `Weight`: both are two-decimal fixed point.
///
/// ```text
/// "30"     → 3000
/// "12.5"   → 1250
/// "12.345" → 1235   (third digit 5 rounds up)
/// "12.344" → 1234
/// "-0.125" → -13
/// ```
pub(crate) fn parse_hundredths(input: &str) -> Option<i64> {
    let s = input.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole_value: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };

    let mut frac_digits = frac.bytes().map(|b| i64::from(b - b'0'));
    let tenths = frac_digits.next().unwrap_or(0);
    let hundredths = frac_digits.next().unwrap_or(0);
    let round_up = frac_digits.next().is_some_and(|d| d >= 5);

    let mut value = whole_value
        .checked_mul(100)?
        .checked_add(tenths * 10 + hundredths)?;
    if round_up {
        value = value.checked_add(1)?;
    }

    Some(if negative { -value } else { value })
}

/// Formats hundredths as `12.34` / `-0.05`.
pub(crate) fn format_hundredths(value: i64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain two-decimal display (`1234.50`). The app adds the currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_hundredths(self.0, f)
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hundredths(s)
            .map(Money)
            .ok_or_else(|| ValidationError::invalid_format("amount", format!("'{s}' is not a decimal amount")))
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_parse_rounds_half_up() {
        assert_eq!("12.345".parse::<Money>().unwrap().cents(), 1235);
        assert_eq!("12.344".parse::<Money>().unwrap().cents(), 1234);
        assert_eq!("12.3".parse::<Money>().unwrap().cents(), 1230);
        assert_eq!("7".parse::<Money>().unwrap().cents(), 700);
        assert_eq!(".5".parse::<Money>().unwrap().cents(), 50);
        assert_eq!("-0.125".parse::<Money>().unwrap().cents(), -13);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Money>().is_err());
        assert!(".".parse::<Money>().is_err());
        assert!("12,50".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
    }

    #[test]
    fn test_vat_fifteen_percent() {
        let subtotal = Money::from_cents(10_000);
        assert_eq!(subtotal.calculate_tax(TaxRate::from_bps(1500)).cents(), 1500);

        // 0.50 × 15% = 0.075 → 0.08
        let small = Money::from_cents(50);
        assert_eq!(small.calculate_tax(TaxRate::from_bps(1500)).cents(), 8);
    }

    #[test]
    fn test_clamp_and_sum() {
        assert_eq!(Money::from_cents(-10).clamp_non_negative(), Money::zero());
        assert_eq!(Money::from_cents(10).clamp_non_negative().cents(), 10);

        let total: Money = [100, 250, 5].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 355);
    }

    #[test]
    fn test_checked_arithmetic() {
        let price = Money::from_cents(5_000);
        assert_eq!(price.checked_mul_quantity(3), Some(Money::from_cents(15_000)));
        assert_eq!(Money::from_cents(i64::MAX / 2 + 1).checked_mul_quantity(2), None);
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
        assert_eq!(price.checked_add(price), Some(Money::from_cents(10_000)));
    }
}
