//! Admin product console route handlers.
//!
//! Every route requires an administrator session. Mutations answer with a
//! notification either way; nothing asks for confirmation first.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use terroir_core::{Price, ProductId, UserId};

use crate::api::types::NewProduct;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::CurrentUser;
use crate::notify::{Notification, Triggers};
use crate::routes::home::{ProductView, product_views};
use crate::state::AppState;

/// New product form data.
#[derive(Debug, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub sales_period: String,
    /// Checkbox; `"true"` lists the product straight away.
    #[serde(default)]
    pub is_active: Option<String>,
}

impl ProductForm {
    /// Check the required fields and build the API body.
    fn validate(&self, user_id: UserId) -> std::result::Result<NewProduct, &'static str> {
        let required = [
            &self.name,
            &self.price,
            &self.description,
            &self.image_url,
            &self.category,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err("Name, price, description, image and category are required");
        }
        let price = Price::parse(&self.price).map_err(|_| "Enter a valid price")?;

        Ok(NewProduct {
            name: self.name.trim().to_string(),
            price: format!("{:.2}", price.amount().round_dp(2)),
            description: self.description.trim().to_string(),
            image_url: self.image_url.trim().to_string(),
            category: self.category.trim().to_string(),
            origin: self.origin.trim().to_string(),
            sales_period: self.sales_period.trim().to_string(),
            user_id,
            is_active: self.is_active.as_deref() == Some("true"),
            is_violation: false,
        })
    }
}

// =============================================================================
// Templates
// =============================================================================

/// All-products console page.
#[derive(Template, WebTemplate)]
#[template(path = "pages/admin.html")]
pub struct AdminTemplate {
    pub user: Option<CurrentUser>,
    pub products: Vec<ProductView>,
}

/// Seller's own products page.
#[derive(Template, WebTemplate)]
#[template(path = "pages/admin_own.html")]
pub struct AdminOwnTemplate {
    pub user: Option<CurrentUser>,
    pub products: Vec<ProductView>,
}

/// Own products list fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/own_products.html")]
pub struct OwnProductsTemplate {
    pub products: Vec<ProductView>,
}

async fn own_product_views(state: &AppState, user: &CurrentUser) -> Result<Vec<ProductView>> {
    let products = state.api().own_products(user.id).await?;
    Ok(product_views(
        &products,
        state.api().base_url(),
        None,
        &Default::default(),
    ))
}

/// Re-render the own products list, or say why it could not be.
async fn own_products_fragment(
    state: &AppState,
    user: &CurrentUser,
    triggers: Triggers,
) -> Response {
    match own_product_views(state, user).await {
        Ok(products) => (triggers, OwnProductsTemplate { products }).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to reload own products");
            triggers
                .notify(Notification::error("Could not reload your products"))
                .without_swap()
                .into_response()
        }
    }
}

// =============================================================================
// All Products
// =============================================================================

/// Display every product in the market.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let products = state.api().admin_products().await?;

    Ok(AdminTemplate {
        products: product_views(&products, state.api().base_url(), None, &Default::default()),
        user: Some(user),
    })
}

/// Remove any product (HTMX).
///
/// On success the card is swapped out for nothing.
#[instrument(skip(state, user), fields(user_id = %user.id, product_id = %product_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Path(product_id): Path<ProductId>,
) -> Response {
    match state.api().admin_remove_product(product_id).await {
        Ok(()) => {
            let id = product_id.to_string();
            add_breadcrumb("admin", "Removed product", Some(&[("product_id", id.as_str())]));
            tracing::info!("Product removed");
            (
                Triggers::new().notify(Notification::success("Product removed")),
                Html(""),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to remove product");
            Notification::error(e.user_message("Could not remove the product")).into_response()
        }
    }
}

// =============================================================================
// Own Products
// =============================================================================

/// Display the seller's own products with the add form.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn own(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let products = own_product_views(&state, &user).await?;

    Ok(AdminOwnTemplate {
        user: Some(user),
        products,
    })
}

/// Publish a product and re-render the seller's list (HTMX).
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Form(form): Form<ProductForm>,
) -> Response {
    let product = match form.validate(user.id) {
        Ok(product) => product,
        Err(message) => return Notification::error(message).into_response(),
    };

    if let Err(e) = state.api().add_product(&product).await {
        tracing::error!(error = %e, "Failed to add product");
        return Notification::error(e.user_message("Could not add the product")).into_response();
    }

    tracing::info!(name = %product.name, "Product added");
    let triggers = Triggers::new().notify(Notification::success("Product added"));
    own_products_fragment(&state, &user, triggers).await
}

/// Withdraw one of the seller's products (HTMX).
#[instrument(skip(state, user), fields(user_id = %user.id, product_id = %product_id))]
pub async fn remove_own(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Path(product_id): Path<ProductId>,
) -> Response {
    if let Err(e) = state.api().remove_own_product(user.id, product_id).await {
        tracing::error!(error = %e, "Failed to remove own product");
        return Notification::error(e.user_message("Could not remove the product")).into_response();
    }

    let triggers = Triggers::new().notify(Notification::success("Product removed"));
    own_products_fragment(&state, &user, triggers).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            name: "Longjing".to_string(),
            price: "¥18.5".to_string(),
            description: "Spring harvest".to_string(),
            image_url: "/uploads/tea.png".to_string(),
            category: "tea".to_string(),
            is_active: Some("true".to_string()),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_validate_builds_product() {
        let product = form().validate(UserId::new(7)).unwrap();
        assert_eq!(product.price, "18.50");
        assert_eq!(product.user_id, UserId::new(7));
        assert!(product.is_active);
        assert!(!product.is_violation);
    }

    #[test]
    fn test_validate_requires_fields() {
        let mut missing = form();
        missing.category = " ".to_string();
        assert!(missing.validate(UserId::new(7)).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_price() {
        let mut bad = form();
        bad.price = "cheap".to_string();
        assert_eq!(bad.validate(UserId::new(7)), Err("Enter a valid price"));
    }

    #[test]
    fn test_inactive_listing() {
        let mut draft = form();
        draft.is_active = None;
        assert!(!draft.validate(UserId::new(7)).unwrap().is_active);
    }
}
