//! Search route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::CurrentUser;
use crate::routes::home::{ProductView, favorite_ids, product_views};
use crate::state::AppState;

/// Search page query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

/// Search page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/search.html")]
pub struct SearchTemplate {
    pub user: Option<CurrentUser>,
    pub query: String,
    pub products: Vec<ProductView>,
    /// Shown instead of results: the prompt, an empty result or a failure.
    pub message: Option<&'static str>,
}

/// Full search page.
///
/// A blank query renders the prompt without calling the API.
#[instrument(skip(state, user))]
pub async fn search_page(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let term = query.query.trim();

    if term.is_empty() {
        return SearchTemplate {
            user,
            query: String::new(),
            products: Vec::new(),
            message: Some("Enter a search keyword"),
        };
    }

    let api = state.api();
    let (products, message) = match api.search(term).await {
        Ok(products) if products.is_empty() => (Vec::new(), Some("No matching products")),
        Ok(products) => {
            let favorites = favorite_ids(api, user.as_ref()).await;
            (
                product_views(&products, api.base_url(), Some(term), &favorites),
                None,
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Search failed");
            (Vec::new(), Some("Search failed, please try again later"))
        }
    };

    SearchTemplate {
        user,
        query: term.to_string(),
        products,
        message,
    }
}
