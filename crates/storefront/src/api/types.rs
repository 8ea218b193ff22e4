//! Request and response bodies of the market REST API.
//!
//! Field names follow the API exactly, including its mix of `snake_case`
//! and `camelCase` keys.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use terroir_core::{
    Address, AddressId, CartId, CartLine, OrderId, Price, ProductId, Role, UserId,
};

// =============================================================================
// Common envelopes
// =============================================================================

/// `{ success, message }` returned by most mutations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// `{ message }` or `{ error }` returned by endpoints without a success flag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl MessageBody {
    /// Whichever of `message` or `error` the server filled in.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        self.message.or(self.error).filter(|text| !text.is_empty())
    }
}

/// `{ items: [...] }` listing envelope. A `null` or missing list reads as
/// empty.
#[derive(Debug, Clone, Deserialize)]
pub struct Items<T> {
    pub items: Option<Vec<T>>,
}

impl<T> Items<T> {
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.items.unwrap_or_default()
    }
}

// =============================================================================
// Products
// =============================================================================

const fn active_by_default() -> bool {
    true
}

/// A catalog product.
///
/// The seller listing (`/ownProducts`) abbreviates `product_name` and
/// `product_description` to `name` and `description`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    #[serde(alias = "name")]
    pub product_name: String,
    #[serde(default, alias = "description")]
    pub product_description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub origin: String,
    pub price: Price,
    #[serde(default)]
    pub sales_period: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

/// Body of `POST /addProduct`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    pub name: String,
    /// Decimal text, e.g. `"12.50"`.
    pub price: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub origin: String,
    pub sales_period: String,
    pub user_id: UserId,
    pub is_active: bool,
    pub is_violation: bool,
}

/// Body of `DELETE /removeProduct/:id/remove`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OwnerBody {
    pub user_id: UserId,
}

// =============================================================================
// Cart
// =============================================================================

/// One row of `GET /cart`.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    #[serde(default)]
    pub cart_id: Option<CartId>,
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub product_description: String,
    pub price: Price,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: String,
}

impl CartItem {
    /// Convert into a cart line, initially selected.
    #[must_use]
    pub fn into_line(self) -> CartLine {
        CartLine {
            product_id: self.product_id,
            name: self.product_name,
            description: self.product_description,
            image_url: self.image_url,
            price: self.price,
            quantity: self.quantity,
            selected: true,
        }
    }
}

/// Body of `POST /cart`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AddToCart {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of `PUT /cart/:id/quantity`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuantityUpdate {
    pub quantity: u32,
}

// =============================================================================
// Addresses
// =============================================================================

pub type AddressList = Items<Address>;

// =============================================================================
// Orders
// =============================================================================

/// Response of `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedOrder {
    #[serde(default)]
    pub success: bool,
    #[serde(default, rename = "orderId")]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One product inside an order summary.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderProduct {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(rename = "product_price")]
    pub price: Price,
    #[serde(default)]
    pub image_url: String,
    pub quantity: u32,
}

/// One entry of `GET /orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderSummary {
    #[serde(rename = "orderId")]
    pub order_id: OrderId,
    #[serde(default)]
    pub create_at: Option<DateTime<FixedOffset>>,
    #[serde(rename = "totalPrice")]
    pub total_price: Price,
    #[serde(default)]
    pub address_id: Option<AddressId>,
    #[serde(default)]
    pub products: Vec<OrderProduct>,
    #[serde(default)]
    pub status: String,
}

/// Response of `GET /orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderList {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<OrderSummary>>,
}

// =============================================================================
// Users
// =============================================================================

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub role: Role,
}

/// Successful response of `POST /login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub role: Role,
    #[serde(rename = "userId")]
    pub user_id: UserId,
}

/// Body of `POST /register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub role: Role,
    pub phone: &'a str,
}

/// Profile returned inside `GET /users/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub registration_date: String,
}

/// Response of `GET /users/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}
