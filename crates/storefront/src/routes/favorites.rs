//! Favorites route handlers.
//!
//! The heart icon only changes after the API confirms. A failed toggle
//! re-renders the icon as it was, with an error notification.

use std::collections::HashSet;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use terroir_core::{FavoriteAction, FavoriteRequest, ProductId};

use crate::filters;
use crate::middleware::RequireUser;
use crate::models::CurrentUser;
use crate::notify::{Notification, Triggers};
use crate::routes::home::{ProductView, product_views};
use crate::state::AppState;

/// Toggle form: the icon state the user clicked on.
#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub product_id: ProductId,
    #[serde(default)]
    pub favorited: bool,
}

/// Favorite icon fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/favorite_button.html")]
pub struct FavoriteButtonTemplate {
    pub product_id: ProductId,
    pub favorited: bool,
}

/// Favorites page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/favorites.html")]
pub struct FavoritesTemplate {
    pub user: Option<CurrentUser>,
    pub products: Vec<ProductView>,
    pub error: Option<String>,
}

/// Favorites list fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/favorites_list.html")]
pub struct FavoritesListTemplate {
    pub user: Option<CurrentUser>,
    pub products: Vec<ProductView>,
}

async fn favorite_views(
    state: &AppState,
    user: &CurrentUser,
) -> Result<Vec<ProductView>, String> {
    let products = state.api().favorites(user.id).await.map_err(|e| {
        tracing::warn!(error = %e, "Failed to fetch favorites");
        e.user_message("Could not load your favorites")
    })?;
    let ids: HashSet<ProductId> = products.iter().map(|p| p.product_id).collect();
    Ok(product_views(&products, state.api().base_url(), None, &ids))
}

/// Add or remove a favorite from a product card (HTMX).
#[instrument(skip(state, user, form), fields(user_id = %user.id, product_id = %form.product_id))]
pub async fn toggle(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<ToggleForm>,
) -> Response {
    let action = FavoriteAction::toggle(form.favorited);
    let request = FavoriteRequest {
        user_id: user.id,
        product_id: form.product_id,
        action,
    };

    let (favorited, notification) = match state.api().set_favorite(request).await {
        Ok(message) => {
            let fallback = match action {
                FavoriteAction::Add => "Added to favorites",
                FavoriteAction::Remove => "Removed from favorites",
            };
            (
                action.resulting_state(),
                Notification::success(message.unwrap_or_else(|| fallback.to_string())),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to update favorite");
            (
                form.favorited,
                Notification::error(e.user_message("Could not update favorites")),
            )
        }
    };

    (
        Triggers::new().notify(notification),
        FavoriteButtonTemplate {
            product_id: form.product_id,
            favorited,
        },
    )
        .into_response()
}

/// Display the favorites page.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> impl IntoResponse {
    let (products, error) = match favorite_views(&state, &user).await {
        Ok(products) => (products, None),
        Err(message) => (Vec::new(), Some(message)),
    };

    FavoritesTemplate {
        user: Some(user),
        products,
        error,
    }
}

/// Remove a favorite from the favorites page and re-render the list (HTMX).
#[instrument(skip(state, user), fields(user_id = %user.id, product_id = %product_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
) -> Response {
    let request = FavoriteRequest {
        user_id: user.id,
        product_id,
        action: FavoriteAction::Remove,
    };

    if let Err(e) = state.api().set_favorite(request).await {
        tracing::error!(error = %e, "Failed to remove favorite");
        return Notification::error(e.user_message("Could not update favorites")).into_response();
    }

    match favorite_views(&state, &user).await {
        Ok(products) => (
            Triggers::new().notify(Notification::success("Removed from favorites")),
            FavoritesListTemplate {
                user: Some(user),
                products,
            },
        )
            .into_response(),
        Err(message) => Notification::error(message).into_response(),
    }
}
