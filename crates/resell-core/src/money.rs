//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CREDIT LEDGER INVARIANT                                                │
//! │                                                                         │
//! │    received + remaining == total        (must hold after EVERY payment)│
//! │                                                                         │
//! │  With floats:  200.10 + 299.90 → 499.99999999999994  ❌                │
//! │  With cents:   20010 + 29990   → 50000               ✅                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records store amounts as `*_cents: i64`; arithmetic goes through `Money`.
//! The shop works in a single currency, so no currency code is carried.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: profit and net figures can go negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Saturating arithmetic**: sums over imported data pin at the `i64`
///   bounds rather than overflow
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use resell_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Divides evenly across `count` items, rounding half away from zero.
    ///
    /// Returns zero when `count` is zero, so averages never divide by zero.
    ///
    /// ## Example
    /// ```rust
    /// use resell_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(20_000).average(2).cents(), 10_000);
    /// assert_eq!(Money::from_cents(100).average(3).cents(), 33);
    /// assert_eq!(Money::from_cents(5).average(2).cents(), 3);
    /// assert_eq!(Money::from_cents(5).average(0), Money::zero());
    /// ```
    pub fn average(&self, count: usize) -> Money {
        if count == 0 {
            return Money::zero();
        }
        let n = count as i128;
        let value = self.0 as i128;
        let half = n / 2;
        let rounded = if value >= 0 {
            (value + half) / n
        } else {
            (value - half) / n
        };
        Money(rounded as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented display: `12.34`, `-5.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(0).to_string(), "0.00");
    }

    #[test]
    fn test_sum() {
        let total: Money = [200, 300, -50]
            .into_iter()
            .map(Money::from_cents)
            .sum();
        assert_eq!(total.cents(), 450);
    }

    #[test]
    fn test_arithmetic_saturates() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!((max + Money::from_cents(1)).cents(), i64::MAX);
        assert_eq!((Money::from_cents(i64::MIN) - max).cents(), i64::MIN);

        let total: Money = [i64::MAX, i64::MAX, -5]
            .into_iter()
            .map(Money::from_cents)
            .sum();
        assert_eq!(total.cents(), i64::MAX - 5);
    }

    #[test]
    fn test_average_rounds_half_away_from_zero() {
        assert_eq!(Money::from_cents(-5).average(2).cents(), -3);
        assert_eq!(Money::from_cents(7).average(2).cents(), 4);
        assert_eq!(Money::from_cents(-100).average(3).cents(), -33);
    }

    #[test]
    fn test_credit_split_is_exact() {
        let total = Money::from_cents(50_000);
        let received = Money::from_cents(20_010);
        let remaining = total - received;
        assert_eq!((received + remaining), total);
    }
}
