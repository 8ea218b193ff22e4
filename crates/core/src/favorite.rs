//! Favorite toggling.

use serde::{Deserialize, Serialize};

use crate::types::{ProductId, UserId};

/// The change a favorite toggle asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteAction {
    Add,
    Remove,
}

impl FavoriteAction {
    /// The action that flips the current state.
    #[must_use]
    pub const fn toggle(currently_favorited: bool) -> Self {
        if currently_favorited {
            Self::Remove
        } else {
            Self::Add
        }
    }

    /// Whether the product is a favorite once this action succeeds.
    #[must_use]
    pub const fn resulting_state(self) -> bool {
        matches!(self, Self::Add)
    }
}

/// Body of `POST /favorite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FavoriteRequest {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub action: FavoriteAction,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        assert_eq!(FavoriteAction::toggle(false), FavoriteAction::Add);
        assert_eq!(FavoriteAction::toggle(true), FavoriteAction::Remove);
        assert!(FavoriteAction::toggle(false).resulting_state());
        assert!(!FavoriteAction::toggle(true).resulting_state());
    }

    #[test]
    fn test_request_body() {
        let body = FavoriteRequest {
            user_id: UserId::new(2),
            product_id: ProductId::new(9),
            action: FavoriteAction::Remove,
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            serde_json::json!({"user_id": 2, "product_id": 9, "action": "remove"})
        );
    }
}
