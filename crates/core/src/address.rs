//! Shipping addresses.

use serde::{Deserialize, Serialize};

use crate::region;
use crate::types::{AddressId, MobilePhone, UserId};

/// Minimum length of the street detail, in characters.
pub const STREET_MIN_CHARS: usize = 5;
/// Maximum length of the street detail, in characters.
pub const STREET_MAX_CHARS: usize = 60;

const DEFAULT_COUNTRY: &str = "China";

/// A saved shipping address as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub address_id: AddressId,
    pub recipient: String,
    pub phone: String,
    #[serde(default)]
    pub country: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub street: String,
    #[serde(default)]
    pub is_default: bool,
    /// Postal code.
    #[serde(default)]
    pub stamp: String,
}

impl Address {
    /// One-line region and street, e.g. for the checkout summary.
    #[must_use]
    pub fn full_line(&self) -> String {
        [
            self.province.as_str(),
            self.city.as_str(),
            self.district.as_str(),
            self.street.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Sort defaults ahead of everything else, keeping fetch order within each
/// group.
pub fn order_default_first(addresses: &mut [Address]) {
    // sort_by_key is stable
    addresses.sort_by_key(|address| !address.is_default);
}

/// The address to pre-select: the first one after default-first ordering.
#[must_use]
pub fn preselect(addresses: &[Address]) -> Option<&Address> {
    addresses
        .iter()
        .find(|address| address.is_default)
        .or_else(|| addresses.first())
}

/// Why a new address was rejected. Rules are checked in declaration order
/// and the first failure is reported.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressError {
    #[error("please enter the recipient's name")]
    MissingRecipient,
    #[error("please enter a valid mobile number")]
    InvalidPhone,
    #[error("please choose a province, city and district")]
    IncompleteRegion,
    #[error("street address must be 5-60 characters")]
    StreetLength,
}

/// The add-address form as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddressForm {
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub street: String,
    /// Checkbox; present (any value) means checked.
    #[serde(default)]
    pub is_default: Option<String>,
    #[serde(default)]
    pub stamp: String,
}

impl AddressForm {
    /// Validate the form into a request body.
    ///
    /// # Errors
    ///
    /// Returns the first rule the form breaks.
    pub fn validate(&self, user_id: UserId) -> Result<NewAddress, AddressError> {
        let recipient = self.recipient.trim();
        if recipient.is_empty() {
            return Err(AddressError::MissingRecipient);
        }

        let phone = MobilePhone::parse(&self.phone).map_err(|_| AddressError::InvalidPhone)?;

        let (province, city, district) = (
            self.province.trim(),
            self.city.trim(),
            self.district.trim(),
        );
        if !region::contains(province, city, district) {
            return Err(AddressError::IncompleteRegion);
        }

        let street_chars = self.street.chars().count();
        if !(STREET_MIN_CHARS..=STREET_MAX_CHARS).contains(&street_chars) {
            return Err(AddressError::StreetLength);
        }

        let country = match self.country.trim() {
            "" => DEFAULT_COUNTRY,
            other => other,
        };

        Ok(NewAddress {
            user_id,
            recipient: recipient.to_owned(),
            phone: phone.into_inner(),
            country: country.to_owned(),
            province: province.to_owned(),
            city: city.to_owned(),
            district: district.to_owned(),
            street: self.street.clone(),
            is_default: self.is_default.is_some(),
            stamp: self.stamp.trim().to_owned(),
        })
    }
}

/// Body of `POST /addresses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAddress {
    pub user_id: UserId,
    pub recipient: String,
    pub phone: String,
    pub country: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub street: String,
    pub is_default: bool,
    pub stamp: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address(id: u32, is_default: bool) -> Address {
        Address {
            address_id: AddressId::new(id),
            recipient: "Li Lei".to_owned(),
            phone: "13800000000".to_owned(),
            country: "China".to_owned(),
            province: "Zhejiang".to_owned(),
            city: "Hangzhou".to_owned(),
            district: "Xihu".to_owned(),
            street: "1 Lingyin Road".to_owned(),
            is_default,
            stamp: String::new(),
        }
    }

    fn form() -> AddressForm {
        AddressForm {
            recipient: "Han Meimei".to_owned(),
            phone: "13912345678".to_owned(),
            country: String::new(),
            province: "Sichuan".to_owned(),
            city: "Chengdu".to_owned(),
            district: "Wuhou".to_owned(),
            street: "88 Kehua North Road".to_owned(),
            is_default: None,
            stamp: "610041".to_owned(),
        }
    }

    #[test]
    fn test_defaults_first_stable() {
        let mut list = vec![
            address(1, false),
            address(2, true),
            address(3, false),
            address(4, true),
            address(5, false),
        ];
        order_default_first(&mut list);
        let ids: Vec<u32> = list.iter().map(|a| a.address_id.as_u32()).collect();
        assert_eq!(ids, vec![2, 4, 1, 3, 5]);
    }

    #[test]
    fn test_preselect_first_after_sort() {
        let list = vec![address(1, false), address(2, true)];
        assert_eq!(preselect(&list).unwrap().address_id, AddressId::new(2));

        let none_default = vec![address(7, false), address(8, false)];
        assert_eq!(preselect(&none_default).unwrap().address_id, AddressId::new(7));

        assert!(preselect(&[]).is_none());
    }

    #[test]
    fn test_valid_form() {
        let new = form().validate(UserId::new(3)).unwrap();
        assert_eq!(new.country, "China");
        assert_eq!(new.user_id, UserId::new(3));
        assert!(!new.is_default);

        let checked = AddressForm {
            is_default: Some("on".to_owned()),
            ..form()
        };
        assert!(checked.validate(UserId::new(3)).unwrap().is_default);
    }

    #[test]
    fn test_rules_in_order() {
        let user = UserId::new(1);
        let blank = AddressForm::default();
        assert_eq!(blank.validate(user), Err(AddressError::MissingRecipient));

        let bad_phone = AddressForm {
            phone: "12345678901".to_owned(),
            street: "x".to_owned(),
            ..form()
        };
        assert_eq!(bad_phone.validate(user), Err(AddressError::InvalidPhone));

        let no_district = AddressForm {
            district: " ".to_owned(),
            ..form()
        };
        assert_eq!(no_district.validate(user), Err(AddressError::IncompleteRegion));

        let mismatched = AddressForm {
            city: "Hangzhou".to_owned(),
            ..form()
        };
        assert_eq!(mismatched.validate(user), Err(AddressError::IncompleteRegion));
    }

    #[test]
    fn test_street_length_bounds_in_chars() {
        let user = UserId::new(1);
        let with_street = |street: &str| AddressForm {
            street: street.to_owned(),
            ..form()
        };

        assert_eq!(with_street("abcd").validate(user), Err(AddressError::StreetLength));
        assert!(with_street("abcde").validate(user).is_ok());
        assert!(with_street(&"a".repeat(60)).validate(user).is_ok());
        assert_eq!(
            with_street(&"a".repeat(61)).validate(user),
            Err(AddressError::StreetLength)
        );
        // five CJK characters are fifteen bytes but five characters
        assert!(with_street("西湖区灵隐").validate(user).is_ok());
    }

    #[test]
    fn test_full_line() {
        assert_eq!(address(1, false).full_line(), "Zhejiang Hangzhou Xihu 1 Lingyin Road");
    }
}
