//! Client for the Terroir market REST API.
//!
//! # Architecture
//!
//! - JSON over HTTP with `reqwest`, one configured origin for every endpoint
//! - The API is the source of truth. Nothing is stored locally except the
//!   home page listing, cached in memory via `moka`
//! - Every call has a timeout and failures are never retried
//!
//! # Example
//!
//! ```rust,ignore
//! use terroir_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api)?;
//!
//! let lines = client.cart(user_id).await?;
//! client.update_quantity(user_id, product_id, 3).await?;
//! ```

mod cache;
pub mod types;

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use terroir_core::{
    Address, AddressId, CartLine, DraftOrderRequest, FavoriteRequest, NewAddress, OrderId,
    ProductId, Role, UserId,
};

use crate::config::ApiConfig;
use cache::{CacheKey, CacheValue};
use types::{
    Ack, AddToCart, AddressList, CartItem, CreatedOrder, Items, LoginRequest, LoginResponse,
    MessageBody, NewProduct, OrderList, OrderSummary, OwnerBody, Product, QuantityUpdate,
    RegisterRequest, UserEnvelope, UserProfile,
};

/// Longest response excerpt written to logs.
const LOG_BODY_LIMIT: usize = 500;

/// Errors that can occur when calling the market API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure or timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("API returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    /// A 2xx response whose payload reports `success: false`.
    #[error("API rejected the request: {}", .0.as_deref().unwrap_or("no message"))]
    Rejected(Option<String>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// The server-provided message, if the server sent one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } | Self::Rejected(message) => message.as_deref(),
            Self::Http(_) | Self::Parse(_) | Self::InvalidUrl(_) => None,
        }
    }

    /// HTTP status for `Status` errors.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the request never got an answer (connection, timeout).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    /// Text to show the shopper.
    ///
    /// Transport and parse failures are hidden behind a generic
    /// retry-later message; API refusals show the server's own words.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Http(_) | Self::Parse(_) | Self::InvalidUrl(_) => {
                "Network error, please try again later".to_string()
            }
            Self::Status { .. } | Self::Rejected(_) => self
                .server_message()
                .map_or_else(|| fallback.to_string(), str::to_string),
        }
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the market API.
///
/// Cheap to clone. The home page listing is cached for the configured TTL.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(config.product_cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("terroir-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    /// The API base URL. Relative image paths resolve against it.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.inner.base_url.join(path.trim_start_matches('/'))?;
        Ok(self.inner.client.request(method, url))
    }

    /// Send a request and return the raw body of a success response.
    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String), ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<MessageBody>(&body)
                .ok()
                .and_then(MessageBody::into_text);
            tracing::warn!(
                status = %status,
                body = %excerpt(&body),
                "Market API returned non-success status"
            );
            return Err(ApiError::Status { status, message });
        }

        Ok((status, body))
    }

    /// Send a request and parse a JSON success body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let (_, body) = self.send(request).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %excerpt(&body),
                "Failed to parse market API response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a mutation and require `success: true` in the reply.
    async fn execute_ack(&self, request: RequestBuilder) -> Result<Ack, ApiError> {
        let ack: Ack = self.execute(request).await?;
        if ack.success {
            Ok(ack)
        } else {
            Err(ApiError::Rejected(ack.message))
        }
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Home page listing (`GET /shouye`), cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn featured_products(&self) -> Result<Arc<Vec<Product>>, ApiError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Featured).await
        {
            debug!("Cache hit for featured products");
            return Ok(products);
        }

        let products: Vec<Product> = self.execute(self.request(Method::GET, "shouye")?).await?;
        let products = Arc::new(products);

        self.inner
            .cache
            .insert(CacheKey::Featured, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Drop cached listings after a catalog change.
    pub async fn invalidate_products(&self) {
        self.inner.cache.invalidate(&CacheKey::Featured).await;
    }

    /// Full-text search (`GET /searchs?search=`).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, ApiError> {
        let path = format!("searchs?search={}", urlencoding::encode(query));
        self.execute(self.request(Method::GET, &path)?).await
    }

    /// Every product, for the admin console (`GET /api/admin_product`).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn admin_products(&self) -> Result<Vec<Product>, ApiError> {
        self.execute(self.request(Method::GET, "api/admin_product")?)
            .await
    }

    /// Remove any product (`DELETE /admin_product/:id`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API refuses.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn admin_remove_product(&self, product_id: ProductId) -> Result<(), ApiError> {
        let path = format!("admin_product/{product_id}");
        self.execute_ack(self.request(Method::DELETE, &path)?).await?;
        self.invalidate_products().await;
        Ok(())
    }

    /// Products owned by a seller (`GET /ownProducts?user_id=`).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn own_products(&self, user_id: UserId) -> Result<Vec<Product>, ApiError> {
        let request = self
            .request(Method::GET, "ownProducts")?
            .query(&[("user_id", user_id.as_u32())]);
        self.execute(request).await
    }

    /// Publish a product (`POST /addProduct`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API refuses.
    #[instrument(skip(self, product), fields(user_id = %product.user_id))]
    pub async fn add_product(&self, product: &NewProduct) -> Result<(), ApiError> {
        let request = self.request(Method::POST, "addProduct")?.json(product);
        self.execute_ack(request).await?;
        self.invalidate_products().await;
        Ok(())
    }

    /// Withdraw one of the seller's products (`DELETE /removeProduct/:id/remove`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API refuses.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn remove_own_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        let path = format!("removeProduct/{product_id}/remove");
        let request = self
            .request(Method::DELETE, &path)?
            .json(&OwnerBody { user_id });
        self.execute_ack(request).await?;
        self.invalidate_products().await;
        Ok(())
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Cart contents (`GET /cart?user_id=`), every line initially selected.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn cart(&self, user_id: UserId) -> Result<Vec<CartLine>, ApiError> {
        let request = self
            .request(Method::GET, "cart")?
            .query(&[("user_id", user_id.as_u32())]);
        let items: Items<CartItem> = self.execute(request).await?;
        Ok(items.into_vec().into_iter().map(CartItem::into_line).collect())
    }

    /// Add a product to the cart (`POST /cart`, answers 204).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with 401 when the API does not know the
    /// user and 404 when the product does not exist.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let request = self.request(Method::POST, "cart")?.json(&AddToCart {
            user_id,
            product_id,
            quantity,
        });
        self.send(request).await?;
        Ok(())
    }

    /// Persist a line quantity (`PUT /cart/:id/quantity?user_id=`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API refuses.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let path = format!("cart/{product_id}/quantity");
        let request = self
            .request(Method::PUT, &path)?
            .query(&[("user_id", user_id.as_u32())])
            .json(&QuantityUpdate { quantity });
        self.execute_ack(request).await.map(drop)
    }

    /// Remove a cart line (`DELETE /cart/:id?user_id=`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API refuses.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn remove_from_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        let path = format!("cart/{product_id}");
        let request = self
            .request(Method::DELETE, &path)?
            .query(&[("user_id", user_id.as_u32())]);
        self.execute_ack(request).await.map(drop)
    }

    // =========================================================================
    // Favorite Methods
    // =========================================================================

    /// Add or remove a favorite (`POST /favorite`).
    ///
    /// Answers `{message}` on success and `{error}` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API refuses.
    #[instrument(skip(self), fields(user_id = %body.user_id, product_id = %body.product_id))]
    pub async fn set_favorite(&self, body: FavoriteRequest) -> Result<Option<String>, ApiError> {
        let request = self.request(Method::POST, "favorite")?.json(&body);
        let reply: MessageBody = self.execute(request).await?;
        if let Some(error) = reply.error.filter(|e| !e.is_empty()) {
            return Err(ApiError::Rejected(Some(error)));
        }
        Ok(reply.message)
    }

    /// Favorited products (`GET /favorites?user_id=`).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn favorites(&self, user_id: UserId) -> Result<Vec<Product>, ApiError> {
        let request = self
            .request(Method::GET, "favorites")?
            .query(&[("user_id", user_id.as_u32())]);
        let products: Option<Vec<Product>> = self.execute(request).await?;
        Ok(products.unwrap_or_default())
    }

    // =========================================================================
    // Address Methods
    // =========================================================================

    /// Saved addresses in fetch order (`GET /addresses?user_id=`).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn addresses(&self, user_id: UserId) -> Result<Vec<Address>, ApiError> {
        let request = self
            .request(Method::GET, "addresses")?
            .query(&[("user_id", user_id.as_u32())]);
        let list: AddressList = self.execute(request).await?;
        Ok(list.into_vec())
    }

    /// Save a new address (`POST /addresses`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API refuses.
    #[instrument(skip(self, address), fields(user_id = %address.user_id))]
    pub async fn add_address(&self, address: &NewAddress) -> Result<(), ApiError> {
        let request = self.request(Method::POST, "addresses")?.json(address);
        self.execute_ack(request).await.map(drop)
    }

    /// Delete an address (`DELETE /addresses/:id?user_id=`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API refuses.
    #[instrument(skip(self), fields(user_id = %user_id, address_id = %address_id))]
    pub async fn delete_address(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<(), ApiError> {
        let path = format!("addresses/{address_id}");
        let request = self
            .request(Method::DELETE, &path)?
            .query(&[("user_id", user_id.as_u32())]);
        self.execute_ack(request).await.map(drop)
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Create a draft order (`POST /orders`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API refuses, or the reply
    /// carries no order id.
    #[instrument(skip(self, draft), fields(user_id = %draft.user_id, address_id = %draft.address_id))]
    pub async fn create_order(&self, draft: &DraftOrderRequest) -> Result<OrderId, ApiError> {
        let request = self.request(Method::POST, "orders")?.json(draft);
        let created: CreatedOrder = self.execute(request).await?;
        match created.order_id {
            Some(order_id) if created.success => Ok(order_id),
            _ => Err(ApiError::Rejected(created.message)),
        }
    }

    /// Cancel a draft order (`DELETE /orders/:id`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API refuses.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<(), ApiError> {
        let path = format!("orders/{order_id}");
        self.execute_ack(self.request(Method::DELETE, &path)?)
            .await
            .map(drop)
    }

    /// Pay a draft order (`POST /orders/:id/pay`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API refuses.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn pay_order(&self, order_id: OrderId) -> Result<(), ApiError> {
        let path = format!("orders/{order_id}/pay");
        self.execute_ack(self.request(Method::POST, &path)?)
            .await
            .map(drop)
    }

    /// Order history (`GET /orders?user_id=`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API refuses.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn orders(&self, user_id: UserId) -> Result<Vec<OrderSummary>, ApiError> {
        let request = self
            .request(Method::GET, "orders")?
            .query(&[("user_id", user_id.as_u32())]);
        let list: OrderList = self.execute(request).await?;
        if !list.success {
            return Err(ApiError::Rejected(list.message));
        }
        Ok(list.data.unwrap_or_default())
    }

    // =========================================================================
    // User Methods
    // =========================================================================

    /// Log in (`POST /login`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] carrying the server message on bad
    /// credentials.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<LoginResponse, ApiError> {
        let request = self.request(Method::POST, "login")?.json(&LoginRequest {
            username,
            password,
            role,
        });
        self.execute(request).await
    }

    /// Create an account (`POST /register`) and return the server's message.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] carrying the server message on refusal.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        role: Role,
        phone: &str,
    ) -> Result<Option<String>, ApiError> {
        let request = self.request(Method::POST, "register")?.json(&RegisterRequest {
            username,
            password,
            role,
            phone,
        });
        let reply: MessageBody = self.execute(request).await?;
        Ok(reply.into_text())
    }

    /// Account profile (`GET /users/:id`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API refuses.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn user(&self, user_id: UserId) -> Result<UserProfile, ApiError> {
        let path = format!("users/{user_id}");
        let envelope: UserEnvelope = self.execute(self.request(Method::GET, &path)?).await?;
        match envelope.user {
            Some(user) if envelope.success => Ok(user),
            _ => Err(ApiError::Rejected(envelope.message)),
        }
    }

    /// Whether the API answers at all. Used by the readiness check.
    pub async fn is_reachable(&self) -> bool {
        match self.request(Method::GET, "shouye") {
            Ok(request) => request.send().await.is_ok(),
            Err(_) => false,
        }
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}
