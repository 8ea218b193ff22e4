//! Home page route handler and the product card projection.

use std::collections::HashSet;

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;
use url::Url;

use terroir_core::ProductId;

use crate::api::ApiClient;
use crate::api::types::Product;
use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::CurrentUser;
use crate::search::{escape_html, highlight};
use crate::state::AppState;

/// Shown when a product has no image.
pub const PLACEHOLDER_IMAGE: &str = "/static/img/placeholder.svg";

// =============================================================================
// Product View
// =============================================================================

/// Product card data for templates.
///
/// `name_html` and `description_html` are already escaped, with search
/// matches wrapped in highlight spans, and are rendered with `|safe`.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: ProductId,
    pub name_html: String,
    pub description_html: String,
    pub category: String,
    pub origin: String,
    pub sales_period: String,
    pub price: String,
    pub image_url: String,
    pub is_active: bool,
    pub favorited: bool,
}

impl ProductView {
    /// Project a product for display. With a `query`, matches in the name
    /// and description are highlighted.
    #[must_use]
    pub fn new(product: &Product, api_base: &Url, query: Option<&str>) -> Self {
        let render = |text: &str| match query {
            Some(query) => highlight(text, query),
            None => escape_html(text),
        };

        Self {
            id: product.product_id,
            name_html: render(&product.product_name),
            description_html: render(&product.product_description),
            category: product.category.clone(),
            origin: product.origin.clone(),
            sales_period: product.sales_period.clone(),
            price: product.price.to_string(),
            image_url: resolve_image(api_base, &product.image_url),
            is_active: product.is_active,
            favorited: false,
        }
    }

    #[must_use]
    pub fn with_favorites(mut self, favorites: &HashSet<ProductId>) -> Self {
        self.favorited = favorites.contains(&self.id);
        self
    }
}

/// Resolve an image path from the API against its base URL.
///
/// Absolute URLs pass through; an empty path gets the placeholder.
#[must_use]
pub fn resolve_image(api_base: &Url, raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return PLACEHOLDER_IMAGE.to_string();
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }
    api_base
        .join(raw.trim_start_matches('/'))
        .map_or_else(|_| PLACEHOLDER_IMAGE.to_string(), String::from)
}

/// Ids of the user's favorites, for marking cards.
///
/// Returns an empty set when signed out or when the lookup fails; the cards
/// then start unmarked.
pub async fn favorite_ids(api: &ApiClient, user: Option<&CurrentUser>) -> HashSet<ProductId> {
    let Some(user) = user else {
        return HashSet::new();
    };
    match api.favorites(user.id).await {
        Ok(products) => products.iter().map(|p| p.product_id).collect(),
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to load favorites");
            HashSet::new()
        }
    }
}

/// Project a listing, marking favorites.
#[must_use]
pub fn product_views(
    products: &[Product],
    api_base: &Url,
    query: Option<&str>,
    favorites: &HashSet<ProductId>,
) -> Vec<ProductView> {
    products
        .iter()
        .map(|product| ProductView::new(product, api_base, query).with_favorites(favorites))
        .collect()
}

// =============================================================================
// Home Page
// =============================================================================

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub user: Option<CurrentUser>,
    pub products: Vec<ProductView>,
    pub error: Option<String>,
}

/// Display the home page listing.
#[instrument(skip(state, user))]
pub async fn home(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> impl IntoResponse {
    let api = state.api();

    let (products, error) = match api.featured_products().await {
        Ok(products) => {
            let favorites = favorite_ids(api, user.as_ref()).await;
            (product_views(&products, api.base_url(), None, &favorites), None)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load featured products");
            (
                Vec::new(),
                Some(e.user_message("Could not load products, please try again later")),
            )
        }
    };

    HomeTemplate {
        user,
        products,
        error,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use terroir_core::Price;

    fn base() -> Url {
        Url::parse("http://localhost:5000/").unwrap()
    }

    fn product(name: &str, image: &str) -> Product {
        Product {
            product_id: ProductId::new(3),
            product_name: name.to_string(),
            product_description: "Fresh & local".to_string(),
            category: "tea".to_string(),
            origin: "Hangzhou".to_string(),
            price: Price::parse("12.5").unwrap(),
            sales_period: String::new(),
            image_url: image.to_string(),
            is_active: true,
        }
    }

    #[test]
    fn test_resolve_relative_image() {
        assert_eq!(
            resolve_image(&base(), "/uploads/tea.png"),
            "http://localhost:5000/uploads/tea.png"
        );
        assert_eq!(
            resolve_image(&base(), "https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
        assert_eq!(resolve_image(&base(), "  "), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_view_escapes_without_query() {
        let view = ProductView::new(&product("<b>Tea</b>", ""), &base(), None);
        assert_eq!(view.name_html, "&lt;b&gt;Tea&lt;/b&gt;");
        assert_eq!(view.description_html, "Fresh &amp; local");
        assert_eq!(view.price, "¥12.50");
        assert!(!view.favorited);
    }

    #[test]
    fn test_view_highlights_with_query() {
        let view = ProductView::new(&product("Green Tea", ""), &base(), Some("tea"));
        assert_eq!(view.name_html, r#"Green <span class="highlight">Tea</span>"#);
    }

    #[test]
    fn test_marks_favorites() {
        let favorites = HashSet::from([ProductId::new(3)]);
        let views = product_views(&[product("Tea", "")], &base(), None, &favorites);
        assert!(views[0].favorited);
    }
}
