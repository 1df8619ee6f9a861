//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self { Self(Uuid::now_v7()) }
            pub fn as_uuid(&self) -> Uuid { self.0 }
        }

        impl Default for $name { fn default() -> Self { Self::new() } }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }

        impl From<Uuid> for $name { fn from(value: Uuid) -> Self { Self(value) } }
    };
}

entity_id!(
    /// Identifier of a user in the external directory
    UserId
);
entity_id!(
    /// Identifier of a catalog product
    ProductId
);
entity_id!(OrderId);
entity_id!(OrderDetailId);

/// Money value object. Single store currency, never negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Negative amounts are treated as zero.
    pub fn new(amount: Decimal) -> Self { Self(amount.max(Decimal::ZERO)) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }
    pub fn add(&self, other: &Money) -> Money { Money(self.0 + other.0) }
    pub fn multiply(&self, qty: Quantity) -> Money { Money(self.0 * Decimal::from(qty.value())) }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self { Self::new(amount) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Quantity of a product in a cart or order, between one and `Quantity::MAX`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Largest quantity a storage INTEGER column holds.
    pub const MAX: u32 = i32::MAX as u32;

    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value < 1 { return Err(QuantityError::BelowOne); }
        if value > i64::from(Self::MAX) { return Err(QuantityError::TooLarge); }
        u32::try_from(value).map(Self).map_err(|_| QuantityError::TooLarge)
    }
    pub fn value(&self) -> u32 { self.0 }

    pub fn checked_add(&self, other: Quantity) -> Result<Self, QuantityError> {
        self.0.checked_add(other.0).filter(|sum| *sum <= Self::MAX).map(Self).ok_or(QuantityError::TooLarge)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;
    fn try_from(value: i64) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self { q.0 }
}

impl From<Quantity> for i32 {
    // Lossless: `Quantity::new` rejects anything above `i32::MAX`.
    fn from(q: Quantity) -> Self { q.0 as i32 }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("Quantity cannot be less than 1")]
    BelowOne,
    #[error("Quantity is too large")]
    TooLarge,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_bounds() {
        assert_eq!(Quantity::new(0), Err(QuantityError::BelowOne));
        assert_eq!(Quantity::new(-3), Err(QuantityError::BelowOne));
        assert_eq!(Quantity::new(i64::from(u32::MAX) + 1), Err(QuantityError::TooLarge));
        assert_eq!(Quantity::new(4_000_000_000), Err(QuantityError::TooLarge));
        assert_eq!(Quantity::new(i64::from(i32::MAX)).map(i32::from), Ok(i32::MAX));
        assert_eq!(Quantity::new(7).unwrap().value(), 7);
    }

    #[test]
    fn test_quantity_add_overflow_is_an_error() {
        let big = Quantity::new(2_000_000_000).unwrap();
        assert_eq!(big.checked_add(big), Err(QuantityError::TooLarge));
        let sum = Quantity::new(2).unwrap().checked_add(Quantity::new(3).unwrap()).unwrap();
        assert_eq!(sum.value(), 5);
    }

    #[test]
    fn test_money_never_negative() {
        assert_eq!(Money::new(Decimal::new(-5, 0)), Money::ZERO);
        let line = Money::new(Decimal::new(1250, 2)).multiply(Quantity::new(3).unwrap());
        assert_eq!(line.amount(), Decimal::new(3750, 2));
    }
}
