//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Home page (featured products)
//! GET  /search?query=                 - Search results
//!
//! # Cart (HTMX fragments replace #cart)
//! GET  /cart                          - Cart page
//! GET  /cart/items                    - Cart fragment
//! POST /cart/add                      - Add to cart (notification only)
//! POST /cart/select-all               - Check or uncheck every line
//! POST /cart/{product_id}/increase    - Quantity + 1
//! POST /cart/{product_id}/decrease    - Quantity - 1, never below 1
//! POST /cart/{product_id}/delete      - Remove a line
//! POST /cart/{product_id}/select      - Check or uncheck one line
//! GET  /cart/count                    - Cart count badge (fragment)
//!
//! # Checkout wizard (HTMX fragments replace #checkout-modal)
//! POST /checkout/open                 - Snapshot the selection, step 1
//! POST /checkout/next                 - Next step
//! POST /checkout/prev                 - Previous step
//! POST /checkout/address              - Choose the shipping address
//! POST /checkout/payment-method       - Choose the payment option
//! POST /checkout/cancel               - Cancel the draft order
//! POST /checkout/pay                  - Pay the draft order
//! POST /checkout/close                - Close the wizard
//!
//! # Addresses
//! GET  /account/addresses             - Address book page
//! POST /addresses                     - Add an address
//! GET  /addresses/regions             - Cascade the region selects
//! POST /addresses/{id}/delete         - Delete an address
//!
//! # Favorites
//! GET  /favorites                     - Favorites page
//! POST /favorites/toggle              - Toggle a card's heart
//! POST /favorites/{id}/remove         - Remove from the favorites page
//!
//! # Account
//! GET  /account                       - Profile and order history
//!
//! # Admin (administrators only)
//! GET  /admin                         - Every product
//! POST /admin/products/{id}/remove    - Remove any product
//! GET  /admin/own                     - The seller's own products
//! POST /admin/own                     - Add a product
//! POST /admin/own/{id}/remove         - Remove an own product
//!
//! # Auth (rate limited)
//! GET  /auth/login                    - Login page
//! POST /auth/login                    - Login action
//! GET  /auth/register                 - Register page
//! POST /auth/register                 - Register action
//! POST /auth/logout                   - Logout action
//! ```

pub mod account;
pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod favorites;
pub mod home;
pub mod search;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/items", get(cart::items))
        .route("/add", post(cart::add))
        .route("/count", get(cart::count))
        .route("/select-all", post(cart::select_all))
        .route("/{product_id}/increase", post(cart::increase))
        .route("/{product_id}/decrease", post(cart::decrease))
        .route("/{product_id}/delete", post(cart::delete))
        .route("/{product_id}/select", post(cart::select))
}

/// Create the checkout wizard routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/open", post(checkout::open))
        .route("/next", post(checkout::next))
        .route("/prev", post(checkout::prev))
        .route("/address", post(checkout::choose_address))
        .route("/payment-method", post(checkout::choose_payment_method))
        .route("/cancel", post(checkout::cancel))
        .route("/pay", post(checkout::pay))
        .route("/close", post(checkout::close))
}

/// Create the favorites routes router.
pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::index))
        .route("/toggle", post(favorites::toggle))
        .route("/{product_id}/remove", post(favorites::remove))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/addresses", get(addresses::index))
}

/// Create the admin console routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::index))
        .route("/products/{product_id}/remove", post(admin::remove))
        .route("/own", get(admin::own).post(admin::add))
        .route("/own/{product_id}/remove", post(admin::remove_own))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/search", get(search::search_page))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route("/addresses", post(addresses::create))
        .route("/addresses/regions", get(addresses::regions))
        .route("/addresses/{address_id}/delete", post(addresses::delete))
        .nest("/favorites", favorite_routes())
        .nest("/account", account_routes())
        .nest("/admin", admin_routes())
        .nest("/auth", auth_routes())
}
