//! Type-safe price representation using decimal arithmetic.
//!
//! The market trades in renminbi only, so a price is a bare decimal amount
//! rendered with the `¥` symbol and two decimal places.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Currency symbol used for every displayed amount.
pub const CURRENCY_SYMBOL: &str = "¥";

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("invalid price '{0}'")]
    Invalid(String),
    /// The amount is negative.
    #[error("price cannot be negative")]
    Negative,
}

/// A non-negative amount in yuan.
///
/// The API sends product prices as decimal strings (`"12.50"`) and order
/// totals as JSON numbers, so deserialization accepts both. Serialization
/// always emits a JSON number because the order endpoint expects one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if the amount is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount))
    }

    /// Create a price from an amount in fen (hundredths of a yuan).
    #[must_use]
    pub fn from_fen(fen: u32) -> Self {
        Self(Decimal::new(i64::from(fen), 2))
    }

    /// Parse a price from text such as `"12.5"` or `"¥12.50"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a non-negative decimal.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix(CURRENCY_SYMBOL).unwrap_or(trimmed);
        let amount = Decimal::from_str(digits.trim())
            .map_err(|_| PriceError::Invalid(trimmed.to_owned()))?;
        Self::new(amount)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether this is the zero amount.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Line cost: this unit price times a quantity.
    ///
    /// Saturates at the largest representable amount.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CURRENCY_SYMBOL}{:.2}", self.0.round_dp(2))
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Add for Price {
    type Output = Self;

    /// Saturates like [`Price::times`].
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.0.round_dp(2).to_f64().unwrap_or_default();
        serializer.serialize_f64(value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Text(String),
    Number(f64),
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawPrice::deserialize(deserializer)? {
            RawPrice::Text(text) => Self::parse(&text).map_err(serde::de::Error::custom),
            RawPrice::Number(number) => Decimal::try_from(number)
                .map_err(serde::de::Error::custom)
                .and_then(|amount| {
                    Self::new(amount.round_dp(2)).map_err(serde::de::Error::custom)
                }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::parse("10").unwrap().to_string(), "¥10.00");
        assert_eq!(Price::parse("3.5").unwrap().to_string(), "¥3.50");
        assert_eq!(Price::ZERO.to_string(), "¥0.00");
    }

    #[test]
    fn test_parse_strips_symbol() {
        assert_eq!(Price::parse("¥12.50").unwrap(), Price::from_fen(1250));
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(matches!(Price::parse("twelve"), Err(PriceError::Invalid(_))));
        assert_eq!(Price::parse("-1"), Err(PriceError::Negative));
    }

    #[test]
    fn test_times_and_sum() {
        let unit = Price::parse("10").unwrap();
        assert_eq!(unit.times(2).to_string(), "¥20.00");

        let total: Price = [Price::from_fen(150), Price::from_fen(250)].into_iter().sum();
        assert_eq!(total, Price::from_fen(400));
    }

    #[test]
    fn test_arithmetic_saturates() {
        let huge = Price::new(Decimal::MAX).unwrap();
        assert_eq!(huge.times(2).amount(), Decimal::MAX);
        assert_eq!((huge + Price::from_fen(1)).amount(), Decimal::MAX);
    }

    #[test]
    fn test_deserialize_string_or_number() {
        let from_text: Price = serde_json::from_str("\"19.90\"").unwrap();
        let from_number: Price = serde_json::from_str("19.9").unwrap();
        assert_eq!(from_text, from_number);
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&Price::from_fen(2000)).unwrap();
        assert_eq!(json, "20.0");
    }
}
