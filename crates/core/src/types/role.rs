//! Account roles.

use serde::{Deserialize, Serialize};

/// Role of a market account.
///
/// The API encodes roles as integers: `1` for administrators (sellers who
/// manage the product console) and `2` for shoppers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// Error for an unknown role code.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown role code {0}")]
pub struct UnknownRole(pub u8);

impl Role {
    /// The integer code the API uses for this role.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Admin => 1,
            Self::User => 2,
        }
    }

    /// Parse the login form's role selector (`"admin"` or `"user"`).
    ///
    /// Only an explicit `"admin"` selects the administrator role; a blank or
    /// unknown value falls back to the shopper role.
    #[must_use]
    pub fn from_form_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::User
        }
    }

    /// Landing page after login.
    #[must_use]
    pub const fn home_path(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::User => "/",
        }
    }
}

impl TryFrom<u8> for Role {
    type Error = UnknownRole;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Admin),
            2 => Ok(Self::User),
            other => Err(UnknownRole(other)),
        }
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        role.code()
    }
}
