//! Monetary amounts stored as NUMERIC(5, 2).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::{DomainError, ValueObject};

/// Total significant digits a price column can hold.
pub const MAX_DIGITS: u32 = 5;
/// Fractional digits a price column holds.
pub const DECIMAL_PLACES: u32 = 2;

/// Why a decimal cannot be stored as a [`Price`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    #[error("Ensure this value is greater than or equal to 0.")]
    Negative,

    #[error("Ensure that there are no more than 3 digits before the decimal point.")]
    TooManyWholeDigits,

    #[error("Ensure that there are no more than 2 decimal places.")]
    TooManyDecimalPlaces,
}

impl PriceError {
    /// Stable error code reported next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            PriceError::Negative => "min_value",
            PriceError::TooManyWholeDigits => "max_whole_digits",
            PriceError::TooManyDecimalPlaces => "max_decimal_places",
        }
    }

    pub fn for_field(self, field: &'static str) -> DomainError {
        DomainError::field(field, self.code(), self.to_string())
    }
}

/// A price in `[0, 999.99]` with exactly two fractional digits.
///
/// Out-of-range or over-precise input is rejected, never rounded or clamped.
/// Trailing zeros do not count as precision: `1.500` is accepted as `1.50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub fn new(value: Decimal) -> Result<Self, PriceError> {
        let normalized = value.normalize();
        if normalized.is_sign_negative() && !normalized.is_zero() {
            return Err(PriceError::Negative);
        }
        if normalized.scale() > DECIMAL_PLACES {
            return Err(PriceError::TooManyDecimalPlaces);
        }
        if normalized >= Decimal::from(10u32.pow(MAX_DIGITS - DECIMAL_PLACES)) {
            return Err(PriceError::TooManyWholeDigits);
        }

        let mut stored = normalized;
        stored.rescale(DECIMAL_PLACES);
        Ok(Self(stored))
    }

    /// Validate `value` for the named field, reporting failures as field errors.
    pub fn parse_field(field: &'static str, value: Decimal) -> Result<Self, DomainError> {
        Self::new(value).map_err(|e| e.for_field(field))
    }

    pub fn zero() -> Self {
        Self(Decimal::new(0, DECIMAL_PLACES))
    }

    /// Largest storable price, 999.99.
    pub fn max() -> Self {
        Self(Decimal::new(99_999, DECIMAL_PLACES))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }
}

impl ValueObject for Price {}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(value: Price) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn accepts_the_full_range() {
        assert_eq!(Price::new(dec("0")).unwrap(), Price::zero());
        assert_eq!(Price::new(dec("999.99")).unwrap(), Price::max());
        assert_eq!(Price::new(dec("12.5")).unwrap().to_string(), "12.50");
    }

    #[test]
    fn rejects_one_thousand() {
        assert_eq!(Price::new(dec("1000.00")), Err(PriceError::TooManyWholeDigits));
        assert_eq!(Price::new(dec("1000")), Err(PriceError::TooManyWholeDigits));
    }

    #[test]
    fn rejects_negative_values() {
        assert_eq!(Price::new(dec("-0.01")), Err(PriceError::Negative));
        assert!(Price::new(dec("-0")).is_ok());
    }

    #[test]
    fn rejects_extra_precision_instead_of_rounding() {
        assert_eq!(Price::new(dec("1.005")), Err(PriceError::TooManyDecimalPlaces));
        assert_eq!(Price::new(dec("1.500")).unwrap().to_string(), "1.50");
    }

    #[test]
    fn field_errors_carry_per_code_messages() {
        let err = Price::parse_field("regular_price", dec("1000")).unwrap_err();
        match err {
            DomainError::InvalidField(f) => {
                assert_eq!(f.field, "regular_price");
                assert_eq!(f.code, "max_whole_digits");
                assert!(f.message.contains("3 digits"));
            }
            other => panic!("expected InvalidField, got {other:?}"),
        }
    }

    #[test]
    fn deserialization_validates() {
        let ok: Price = serde_json::from_str("\"999.99\"").unwrap();
        assert_eq!(ok, Price::max());
        assert!(serde_json::from_str::<Price>("\"1000.00\"").is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: every cent amount in range is accepted and round-trips.
            #[test]
            fn cents_in_range_are_accepted(cents in 0i64..100_000) {
                let value = Decimal::new(cents, 2);
                let price = Price::new(value).unwrap();
                prop_assert_eq!(price.amount(), value);
            }

            /// Property: anything at or above 1000 is rejected.
            #[test]
            fn amounts_from_one_thousand_are_rejected(cents in 100_000i64..10_000_000) {
                prop_assert_eq!(
                    Price::new(Decimal::new(cents, 2)),
                    Err(PriceError::TooManyWholeDigits)
                );
            }
        }
    }
}
