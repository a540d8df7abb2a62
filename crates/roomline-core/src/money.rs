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
//! │  A 10% discount on $10.00 must produce exactly $9.00, every time,      │
//! │  on every machine, or the cached discounted price drifts from the      │
//! │  price the checkout recomputes.                                        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    1000 cents - 10% = 900 cents, exactly                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Currency
//! `Money` carries no currency tag of its own. The currency lives on the
//! [`Channel`](crate::types::Channel): every price, discount value and
//! cached discounted price for a channel is denominated in that channel's
//! currency, so amounts from different channels are never mixed.
//!
//! ## Usage
//! ```rust
//! use roomline_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(12000); // $120.00 per night
//!
//! // Percentage discount in basis points (1500 = 15%)
//! let on_sale = price.discount_by_bps(1500);
//! assert_eq!(on_sale.cents(), 10200);
//!
//! // Fixed discount, floored at zero
//! let cheap = Money::from_cents(500).saturating_sub(Money::from_cents(800));
//! assert!(cheap.is_zero());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative intermediates (discount deltas)
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support plus total ordering, so the engines
///   can take `min()` over candidate prices directly
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use roomline_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
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

    /// Subtracts, flooring the result at zero.
    ///
    /// Fixed-amount promotions use this: a $8.00-off rule applied to a
    /// $5.00 listing yields $0.00, never a negative price.
    ///
    /// ## Example
    /// ```rust
    /// use roomline_core::money::Money;
    ///
    /// let base = Money::from_cents(500);
    /// let off = Money::from_cents(800);
    /// assert_eq!(base.saturating_sub(off), Money::zero());
    /// ```
    #[inline]
    pub fn saturating_sub(&self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }

    /// Applies a percentage discount given in basis points and returns the
    /// discounted amount.
    ///
    /// ## Why Basis Points?
    /// 1 basis point = 0.01% = 1/10000. Storing percentage values as
    /// integer bps (1500 = 15%) keeps the whole pipeline float-free.
    ///
    /// ## Rounding
    /// The discount amount is rounded half-up in integer math:
    /// `(amount * bps + 5000) / 10000`. i128 intermediates prevent
    /// overflow on large amounts.
    ///
    /// ## Example
    /// ```rust
    /// use roomline_core::money::Money;
    ///
    /// let nightly = Money::from_cents(10000); // $100.00
    /// let discounted = nightly.discount_by_bps(1000); // 10% off
    /// assert_eq!(discounted.cents(), 9000); // $90.00
    /// ```
    pub fn discount_by_bps(&self, bps: u32) -> Money {
        let discount_amount = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money::from_cents(self.0 - discount_amount as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for debugging and logs. API consumers format amounts with the
/// channel's currency themselves.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
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
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
    }

    #[test]
    fn test_ordering_supports_min() {
        let prices = [
            Money::from_cents(1200),
            Money::from_cents(900),
            Money::from_cents(1500),
        ];
        assert_eq!(prices.iter().min(), Some(&Money::from_cents(900)));
    }

    #[test]
    fn test_percentage_discount() {
        let nightly = Money::from_cents(10000); // $100.00
        let discounted = nightly.discount_by_bps(1000); // 10%
        assert_eq!(discounted.cents(), 9000); // $90.00
    }

    #[test]
    fn test_percentage_discount_rounds_half_up() {
        // $10.99 at 15% = $1.6485 off → $1.65 off → $9.34
        let price = Money::from_cents(1099);
        assert_eq!(price.discount_by_bps(1500).cents(), 934);
    }

    #[test]
    fn test_full_percentage_discount_is_zero() {
        let price = Money::from_cents(4200);
        assert_eq!(price.discount_by_bps(10000), Money::zero());
    }

    #[test]
    fn test_saturating_sub_floors_at_zero() {
        let base = Money::from_cents(500);
        assert_eq!(base.saturating_sub(Money::from_cents(300)).cents(), 200);
        assert_eq!(base.saturating_sub(Money::from_cents(800)).cents(), 0);
        assert_eq!(base.saturating_sub(base).cents(), 0);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let positive = Money::from_cents(100);
        assert!(positive.is_positive());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
    }
}
