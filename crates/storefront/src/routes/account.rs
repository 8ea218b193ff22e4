//! Account overview route handler.
//!
//! Shows the profile and the order history side by side. Either half can
//! fail without taking the other down.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::api::types::{OrderSummary, UserProfile};
use crate::filters;
use crate::middleware::RequireUser;
use crate::models::CurrentUser;
use crate::routes::home::resolve_image;
use crate::state::AppState;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Profile display data for templates.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub registered: String,
}

impl From<UserProfile> for ProfileView {
    fn from(profile: UserProfile) -> Self {
        Self {
            username: profile.username,
            email: profile.email,
            phone: profile.phone,
            registered: profile.registration_date,
        }
    }
}

/// One product line of an order.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub name: String,
    pub image_url: String,
    pub price: String,
    pub quantity: u32,
}

/// Order display data for templates.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub number: String,
    pub placed: String,
    pub total: String,
    pub status: String,
    pub lines: Vec<OrderLineView>,
}

impl OrderView {
    fn new(order: &OrderSummary, api_base: &url::Url) -> Self {
        Self {
            number: order.order_id.to_string(),
            placed: order
                .create_at
                .map(|at| at.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            total: order.total_price.to_string(),
            status: order.status.clone(),
            lines: order
                .products
                .iter()
                .map(|p| OrderLineView {
                    name: p.product_name.clone(),
                    image_url: resolve_image(api_base, &p.image_url),
                    price: p.price.to_string(),
                    quantity: p.quantity,
                })
                .collect(),
        }
    }
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/account.html")]
pub struct AccountTemplate {
    pub user: Option<CurrentUser>,
    pub profile: Option<ProfileView>,
    pub orders: Vec<OrderView>,
    pub profile_error: Option<String>,
    pub orders_error: Option<String>,
}

/// Display the account overview page.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> impl IntoResponse {
    let api = state.api();
    let (profile, orders) = tokio::join!(api.user(user.id), api.orders(user.id));

    let (profile, profile_error) = match profile {
        Ok(profile) => (Some(ProfileView::from(profile)), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch profile");
            (None, Some(e.user_message("Could not load your profile")))
        }
    };

    let (orders, orders_error) = match orders {
        Ok(orders) => (
            orders
                .iter()
                .map(|order| OrderView::new(order, api.base_url()))
                .collect(),
            None,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch orders");
            (Vec::new(), Some(e.user_message("Could not load your orders")))
        }
    };

    AccountTemplate {
        user: Some(user),
        profile,
        orders,
        profile_error,
        orders_error,
    }
}
