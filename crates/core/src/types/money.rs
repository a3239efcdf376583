//! Integer money and percentage types.
//!
//! Prices are stored as whole currency units (no minor units), matching the
//! product records in the realtime database. Discount arithmetic rounds half
//! up so a 15% discount on 999 yields 849, not 849.15.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use serde::{Deserialize, Serialize};

/// Currency symbol used when rendering amounts.
pub const CURRENCY_SYMBOL: &str = "$";

/// An amount of money in whole currency units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create an amount from whole units.
    #[must_use]
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// The amount in whole units.
    #[must_use]
    pub const fn units(self) -> u64 {
        self.0
    }

    /// Multiply by a line quantity, saturating on overflow.
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }

    /// Price after taking `discount` percent off, rounded half up.
    #[must_use]
    pub const fn discounted(self, discount: Percent) -> Self {
        let keep = 100 - discount.value() as u64;
        Self(self.0.saturating_mul(keep).saturating_add(50) / 100)
    }

    /// Subtract, flooring at zero.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    /// Renders `1234567` as `$1,234,567`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        write!(f, "{CURRENCY_SYMBOL}{grouped}")
    }
}

/// Errors that can occur when building a [`Percent`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("percentage must be between 0 and 100, got {0}")]
pub struct PercentError(pub u32);

/// A whole percentage between 0 and 100 inclusive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct Percent(u8);

impl Percent {
    /// No discount.
    pub const ZERO: Self = Self(0);

    /// Build a percentage.
    ///
    /// # Errors
    ///
    /// Returns [`PercentError`] when `value > 100`.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(value: u32) -> Result<Self, PercentError> {
        if value > 100 {
            return Err(PercentError(value));
        }
        Ok(Self(value as u8))
    }

    /// The percentage as an integer.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// True when nothing is taken off.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<u32> for Percent {
    type Error = PercentError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percent> for u32 {
    fn from(p: Percent) -> Self {
        Self::from(p.0)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_discounted_rounds_half_up() {
        let p15 = Percent::new(15).unwrap();
        assert_eq!(Money::new(999).discounted(p15), Money::new(849));
        assert_eq!(Money::new(1000).discounted(p15), Money::new(850));
        // 10% off 5 = 4.5 -> 5
        assert_eq!(Money::new(5).discounted(Percent::new(10).unwrap()), Money::new(5));
    }

    #[test]
    fn test_discount_bounds() {
        assert_eq!(Money::new(1000).discounted(Percent::ZERO), Money::new(1000));
        assert_eq!(Money::new(1000).discounted(Percent::new(100).unwrap()), Money::ZERO);
        assert_eq!(Percent::new(101), Err(PercentError(101)));
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::new(0).to_string(), "$0");
        assert_eq!(Money::new(999).to_string(), "$999");
        assert_eq!(Money::new(1000).to_string(), "$1,000");
        assert_eq!(Money::new(1_234_567).to_string(), "$1,234,567");
    }

    #[test]
    fn test_sum_and_times() {
        let total: Money = [Money::new(1000).times(2), Money::new(250)].into_iter().sum();
        assert_eq!(total, Money::new(2250));
    }

    #[test]
    fn test_percent_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<Percent>("40").is_ok());
        assert!(serde_json::from_str::<Percent>("140").is_err());
    }
}
