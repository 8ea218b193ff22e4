//! Mainland mobile phone numbers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`MobilePhone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input is not exactly eleven characters long.
    #[error("phone number must be 11 digits")]
    WrongLength,
    /// The input contains something other than ASCII digits.
    #[error("phone number must contain only digits")]
    NotNumeric,
    /// The number does not start with `1` followed by `3`-`9`.
    #[error("phone number must start with 13-19")]
    BadPrefix,
}

/// An eleven-digit mobile number matching `^1[3-9]\d{9}$`.
///
/// ## Examples
///
/// ```
/// use terroir_core::MobilePhone;
///
/// assert!(MobilePhone::parse("13812345678").is_ok());
/// assert!(MobilePhone::parse("12812345678").is_err()); // bad second digit
/// assert!(MobilePhone::parse("1381234567").is_err());  // ten digits
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MobilePhone(String);

impl MobilePhone {
    /// Number of digits in a mobile number.
    pub const LENGTH: usize = 11;

    /// Parse a mobile number.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not eleven digits or does not carry
    /// a mobile prefix.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let digits = s.trim();
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PhoneError::NotNumeric);
        }
        if digits.len() != Self::LENGTH {
            return Err(PhoneError::WrongLength);
        }

        let mut bytes = digits.bytes();
        let first = bytes.next();
        let second = bytes.next();
        if first != Some(b'1') || !matches!(second, Some(b'3'..=b'9')) {
            return Err(PhoneError::BadPrefix);
        }

        Ok(Self(digits.to_owned()))
    }

    /// Whether the input is eleven ASCII digits, without the prefix rule.
    ///
    /// Registration only checks this looser form.
    #[must_use]
    pub fn is_eleven_digits(s: &str) -> bool {
        s.len() == Self::LENGTH && s.bytes().all(|b| b.is_ascii_digit())
    }

    /// Returns the number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the number and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for MobilePhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_numbers() {
        assert!(MobilePhone::parse("13012345678").is_ok());
        assert!(MobilePhone::parse("19999999999").is_ok());
        assert!(MobilePhone::parse(" 15800000000 ").is_ok());
    }

    #[test]
    fn test_invalid_numbers() {
        assert_eq!(MobilePhone::parse("1381234567"), Err(PhoneError::WrongLength));
        assert_eq!(MobilePhone::parse("138123456789"), Err(PhoneError::WrongLength));
        assert_eq!(MobilePhone::parse("1381234567a"), Err(PhoneError::NotNumeric));
        assert_eq!(MobilePhone::parse("12812345678"), Err(PhoneError::BadPrefix));
        assert_eq!(MobilePhone::parse("23812345678"), Err(PhoneError::BadPrefix));
        assert_eq!(MobilePhone::parse(""), Err(PhoneError::WrongLength));
    }

    #[test]
    fn test_eleven_digits() {
        assert!(MobilePhone::is_eleven_digits("12345678901"));
        assert!(!MobilePhone::is_eleven_digits("1234567890"));
        assert!(!MobilePhone::is_eleven_digits("1234567890x"));
    }
}
