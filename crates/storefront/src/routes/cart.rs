//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Lines and quantities come from the market API on every request. Which
//! lines are ticked for checkout is kept only in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use url::Url;

use terroir_core::{Cart, CartAction, CartEffect, CartSelection, ProductId};

use crate::api::ApiError;
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{OptionalUser, RequireUser};
use crate::models::{CurrentUser, session_keys};
use crate::notify::{CART_COUNT_EVENT, CART_UPDATED_EVENT, Notification, Triggers};
use crate::routes::home::resolve_image;
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub price: String,
    pub quantity: u32,
    pub line_total: String,
    pub selected: bool,
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    /// Sum over the ticked lines.
    pub total: String,
    pub all_selected: bool,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, api_base: &Url) -> Self {
        Self {
            lines: cart
                .lines()
                .iter()
                .map(|line| CartLineView {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    description: line.description.clone(),
                    image_url: resolve_image(api_base, &line.image_url),
                    price: line.price.to_string(),
                    quantity: line.quantity,
                    line_total: line.line_total().to_string(),
                    selected: line.selected,
                })
                .collect(),
            total: cart.total().to_string(),
            all_selected: cart.all_selected(),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

async fn get_selection(session: &Session) -> CartSelection {
    session
        .get::<CartSelection>(session_keys::CART_SELECTION)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

async fn save_selection(session: &Session, cart: &Cart) {
    if let Err(e) = session
        .insert(session_keys::CART_SELECTION, cart.selection())
        .await
    {
        tracing::error!("Failed to save cart selection to session: {e}");
    }
}

/// Fetch the user's cart and reapply the ticks kept in the session.
///
/// # Errors
///
/// Returns an error if the API request fails.
pub async fn load_cart(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
) -> Result<Cart, ApiError> {
    let mut cart = Cart::new(state.api().cart(user.id).await?);
    cart.apply_selection(&get_selection(session).await);
    Ok(cart)
}

fn load_failed(e: &ApiError) -> Response {
    tracing::error!(error = %e, "Failed to load cart");
    Notification::error(e.user_message("Could not load your cart")).into_response()
}

// =============================================================================
// Forms and Templates
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Tick or untick one line. An unticked checkbox sends no field.
#[derive(Debug, Deserialize)]
pub struct SelectForm {
    #[serde(default)]
    pub selected: bool,
}

/// The "select all" checkbox.
#[derive(Debug, Deserialize)]
pub struct SelectAllForm {
    #[serde(default)]
    pub checked: bool,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/cart.html")]
pub struct CartShowTemplate {
    pub user: Option<CurrentUser>,
    pub cart: CartView,
    pub error: Option<String>,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

fn items_fragment(state: &AppState, cart: &Cart) -> CartItemsTemplate {
    CartItemsTemplate {
        cart: CartView::new(cart, state.api().base_url()),
    }
}

/// Fragment after a change, refreshing the badge too.
fn changed_fragment(state: &AppState, cart: &Cart) -> Response {
    (
        Triggers::new().event(CART_COUNT_EVENT),
        items_fragment(state, cart),
    )
        .into_response()
}

// =============================================================================
// Routes
// =============================================================================

/// Display cart page.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
) -> impl IntoResponse {
    let (cart, error) = match load_cart(&state, &session, &user).await {
        Ok(cart) => (cart, None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch cart");
            (Cart::default(), Some(e.user_message("Could not load your cart")))
        }
    };

    CartShowTemplate {
        cart: CartView::new(&cart, state.api().base_url()),
        user: Some(user),
        error,
    }
}

/// Cart lines fragment (HTMX), reloaded on `cart-updated`.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn items(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
) -> Response {
    match load_cart(&state, &session, &user).await {
        Ok(cart) => items_fragment(&state, &cart).into_response(),
        Err(e) => load_failed(&e),
    }
}

/// Add item to cart (HTMX).
///
/// Nothing is swapped; the response fires `cart-updated` so the badge and
/// any open cart view reload.
#[instrument(skip(state, user, form), fields(user_id = %user.id, product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let quantity = form.quantity.unwrap_or(1).max(1);

    match state
        .api()
        .add_to_cart(user.id, form.product_id, quantity)
        .await
    {
        Ok(()) => {
            let product_id = form.product_id.to_string();
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", product_id.as_str())]),
            );
            Triggers::new()
                .event(CART_UPDATED_EVENT)
                .notify(Notification::success("Added to cart"))
                .without_swap()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to add item to cart");
            let notification = match e.status() {
                Some(StatusCode::UNAUTHORIZED) => Notification::login_required(),
                Some(StatusCode::NOT_FOUND) => Notification::error("Product not found"),
                _ => Notification::error(e.user_message("Could not add to cart")),
            };
            notification.into_response()
        }
    }
}

async fn change_quantity(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    action: CartAction,
) -> Response {
    let mut cart = match load_cart(state, session, user).await {
        Ok(cart) => cart,
        Err(e) => return load_failed(&e),
    };

    match cart.apply(action) {
        CartEffect::QuantityChanged {
            product_id,
            quantity,
        } => match state
            .api()
            .update_quantity(user.id, product_id, quantity)
            .await
        {
            Ok(()) => changed_fragment(state, &cart),
            Err(e) => {
                tracing::error!(error = %e, "Failed to update cart quantity");
                Notification::error(e.user_message("Could not update the quantity"))
                    .into_response()
            }
        },
        // Decrease at 1, or a line that is no longer there
        _ => items_fragment(state, &cart).into_response(),
    }
}

/// Increase a line's quantity by one (HTMX).
#[instrument(skip(state, session, user), fields(user_id = %user.id, product_id = %product_id))]
pub async fn increase(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
) -> Response {
    change_quantity(&state, &session, &user, CartAction::Increase(product_id)).await
}

/// Decrease a line's quantity by one, never below one (HTMX).
#[instrument(skip(state, session, user), fields(user_id = %user.id, product_id = %product_id))]
pub async fn decrease(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
) -> Response {
    change_quantity(&state, &session, &user, CartAction::Decrease(product_id)).await
}

/// Remove a line (HTMX).
///
/// The line leaves the view only once the API confirms.
#[instrument(skip(state, session, user), fields(user_id = %user.id, product_id = %product_id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
) -> Response {
    let mut cart = match load_cart(&state, &session, &user).await {
        Ok(cart) => cart,
        Err(e) => return load_failed(&e),
    };

    if let Err(e) = state.api().remove_from_cart(user.id, product_id).await {
        tracing::error!(error = %e, "Failed to remove from cart");
        return Notification::error(e.user_message("Could not remove the item")).into_response();
    }

    if cart.apply(CartAction::Remove(product_id)) == (CartEffect::Removed { now_empty: true }) {
        tracing::debug!("Last line removed");
    }
    save_selection(&session, &cart).await;
    changed_fragment(&state, &cart)
}

/// Tick or untick a line for checkout (HTMX). Nothing is sent to the API.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id, product_id = %product_id))]
pub async fn select(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
    Form(form): Form<SelectForm>,
) -> Response {
    let mut cart = match load_cart(&state, &session, &user).await {
        Ok(cart) => cart,
        Err(e) => return load_failed(&e),
    };

    cart.apply(CartAction::SetSelected(product_id, form.selected));
    save_selection(&session, &cart).await;
    items_fragment(&state, &cart).into_response()
}

/// Tick or untick every line (HTMX).
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn select_all(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<SelectAllForm>,
) -> Response {
    let mut cart = match load_cart(&state, &session, &user).await {
        Ok(cart) => cart,
        Err(e) => return load_failed(&e),
    };

    cart.apply(CartAction::SelectAll(form.checked));
    save_selection(&session, &cart).await;
    items_fragment(&state, &cart).into_response()
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, user))]
pub async fn count(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> impl IntoResponse {
    let count = match user {
        Some(user) => state
            .api()
            .cart(user.id)
            .await
            .map(|lines| Cart::new(lines).item_count())
            .unwrap_or(0),
        None => 0,
    };

    CartCountTemplate { count }
}
