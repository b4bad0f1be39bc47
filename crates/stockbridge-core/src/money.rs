//! # Money Module
//!
//! Provides the `Money` type for prices stored on products and stock lots.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WHERE PRICES COME FROM                                                 │
//! │                                                                         │
//! │  ERP feed (JSON numbers):     precoVenda: 89.9                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Money::from_decimal(89.9)  → 8990 cents   (rounded once, at the edge)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite INTEGER columns, margin math, promotion checks                  │
//! │                                                                         │
//! │  Floats never travel past the ERP boundary.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockbridge_core::money::Money;
//!
//! let sale = Money::from_cents(8990);
//! let cost = Money::from_cents(4000);
//! assert_eq!((sale - cost).cents(), 4990);
//! assert_eq!(Money::from_decimal(89.9), sale);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (the smallest BRL unit).
///
/// Serialized as a bare integer so JSON columns and the CLI output stay
/// readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a decimal currency amount (as sent by the ERP) to cents.
    ///
    /// Rounds half away from zero, the same rounding `f64::round` applies.
    /// Non-finite input becomes zero.
    ///
    /// ```rust
    /// use stockbridge_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(19.99).cents(), 1999);
    /// assert_eq!(Money::from_decimal(0.0).cents(), 0);
    /// assert_eq!(Money::from_decimal(f64::NAN).cents(), 0);
    /// ```
    pub fn from_decimal(amount: f64) -> Self {
        if !amount.is_finite() {
            return Money::zero();
        }
        Money((amount * 100.0).round() as i64)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-currency part.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the fractional part (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
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

    /// Markup of `self` (sale price) over `cost`, in basis points.
    ///
    /// `(sale - cost) / cost`, so 4000 → 8990 is 12475 bps (124.75%).
    /// Returns `None` when the sale price is zero or the cost is not positive.
    ///
    /// ```rust
    /// use stockbridge_core::money::Money;
    ///
    /// let sale = Money::from_cents(8990);
    /// assert_eq!(sale.markup_bps(Money::from_cents(4000)), Some(12475));
    /// assert_eq!(sale.markup_bps(Money::zero()), None);
    /// ```
    pub fn markup_bps(&self, cost: Money) -> Option<i64> {
        if !cost.is_positive() || self.is_zero() {
            return None;
        }
        let num = (self.0 as i128 - cost.0 as i128) * 10_000;
        let den = cost.0 as i128;
        let half = den / 2;
        // round half away from zero
        let rounded = if num >= 0 {
            (num + half) / den
        } else {
            (num - half) / den
        };
        Some(rounded as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented display (`R$89.90`). Localized formatting belongs to the UI.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}R${}.{:02}", sign, self.reais().abs(), self.cents_part())
    }
}

impl Add for Money {
    type Output = Money;

    #[inline]
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    #[inline]
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Money(cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_decimal_rounds_erp_prices() {
        assert_eq!(Money::from_decimal(89.9).cents(), 8990);
        assert_eq!(Money::from_decimal(49.99).cents(), 4999);
        assert_eq!(Money::from_decimal(0.005).cents(), 1);
        assert_eq!(Money::from_decimal(f64::INFINITY).cents(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(8990).to_string(), "R$89.90");
        assert_eq!(Money::from_cents(-550).to_string(), "-R$5.50");
        assert_eq!(Money::from_cents(7).to_string(), "R$0.07");
    }

    #[test]
    fn test_markup() {
        let cost = Money::from_cents(5000);
        assert_eq!(Money::from_cents(10000).markup_bps(cost), Some(10000));
        assert_eq!(Money::from_cents(4000).markup_bps(cost), Some(-2000));
        // 1/3 = 3333.33 bps
        assert_eq!(Money::from_cents(4).markup_bps(Money::from_cents(3)), Some(3333));
        assert_eq!(Money::zero().markup_bps(cost), None);
    }

    #[test]
    fn test_serde_is_plain_integer() {
        let json = serde_json::to_string(&Money::from_cents(1299)).unwrap();
        assert_eq!(json, "1299");
        let back: Money = serde_json::from_str("1299").unwrap();
        assert_eq!(back.cents(), 1299);
    }
}
