//! Session-related types.
//!
//! Types stored in the session for identity and client-only UI state.

use serde::{Deserialize, Serialize};

use terroir_core::{Role, UserId};

/// Session-stored user identity.
///
/// Written at login from the API's `userId` and `role`, removed at logout.
/// It is never revalidated against the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// The API's numeric user ID.
    pub id: UserId,
    /// Role the user logged in with.
    pub role: Role,
    /// Login name, for the header.
    pub username: String,
}

impl CurrentUser {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the lines the user unchecked in the cart.
    pub const CART_SELECTION: &str = "cart_selection";
}
