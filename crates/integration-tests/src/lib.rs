//! Test harness for the Terroir storefront.
//!
//! [`FakeMarket`] is an in-process stand-in for the market REST API. It
//! serves a small mutable catalog on an ephemeral port and records every
//! request it receives. [`TestApp`] drives the real storefront router with
//! `tower::ServiceExt::oneshot`, carrying the session cookie between calls.
//!
//! ```rust,ignore
//! let market = FakeMarket::start().await;
//! market.add_product(1, "Honey", "10.00");
//! let mut app = TestApp::new(&market);
//! app.login("li", "user").await;
//! let page = app.get("/cart").await;
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::{Path, Query, Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

use terroir_storefront::config::{ApiConfig, SentryConfig, StorefrontConfig};
use terroir_storefront::state::AppState;

/// Search term that makes the fake search endpoint fail.
pub const FAILING_SEARCH: &str = "boom";

/// Product id the fake favorite endpoint refuses.
pub const UNFAVORABLE_PRODUCT: u32 = 999;

// =============================================================================
// Fake market API
// =============================================================================

/// One request received by the fake market.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub body: String,
}

impl Recorded {
    /// The body parsed as JSON, or `Null`.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Default)]
struct Market {
    products: Vec<Value>,
    cart: Vec<Value>,
    addresses: Vec<Value>,
    favorites: Vec<u32>,
    next_address: u32,
    next_order: u32,
    fail_address_delete: bool,
    fail_order_cancel: bool,
    order_delay: Option<Duration>,
    requests: Vec<Recorded>,
}

type Shared = Arc<Mutex<Market>>;

/// In-process market API on an ephemeral port.
#[derive(Clone)]
pub struct FakeMarket {
    market: Shared,
    base_url: Url,
}

impl FakeMarket {
    /// Bind an ephemeral port and serve the fake API in the background.
    pub async fn start() -> Self {
        let market: Shared = Arc::new(Mutex::new(Market {
            next_address: 100,
            next_order: 500,
            ..Market::default()
        }));

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let router = fake_router(Arc::clone(&market));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            market,
            base_url: Url::parse(&format!("http://{addr}/")).unwrap(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn lock(&self) -> MutexGuard<'_, Market> {
        self.market.lock().unwrap()
    }

    /// Put a product in the catalog.
    pub fn add_product(&self, id: u32, name: &str, price: &str) {
        self.lock().products.push(json!({
            "product_id": id,
            "product_name": name,
            "product_description": format!("{name} from the hills"),
            "category": "produce",
            "origin": "Yunnan",
            "price": price,
            "image_url": format!("/uploads/{id}.png"),
        }));
    }

    /// Put a product in the cart.
    pub fn add_cart_line(&self, product_id: u32, name: &str, price: &str, quantity: u32) {
        self.lock().cart.push(json!({
            "cart_id": product_id + 1000,
            "product_id": product_id,
            "product_name": name,
            "price": price,
            "quantity": quantity,
            "image_url": "",
        }));
    }

    /// Save an address.
    pub fn add_address(&self, id: u32, recipient: &str, is_default: bool) {
        self.lock().addresses.push(json!({
            "address_id": id,
            "recipient": recipient,
            "phone": "13800138000",
            "country": "China",
            "province": "Zhejiang",
            "city": "Hangzhou",
            "district": "Xihu",
            "street": "1 Longjing Road",
            "is_default": is_default,
            "stamp": "310000",
        }));
    }

    /// Hold every `POST /orders` for `delay` before answering.
    pub fn delay_orders(&self, delay: Duration) {
        self.lock().order_delay = Some(delay);
    }

    /// Make `DELETE /orders/:id` answer 500.
    pub fn fail_order_cancels(&self) {
        self.lock().fail_order_cancel = true;
    }

    /// Make `DELETE /addresses/:id` answer 500.
    pub fn fail_address_deletes(&self) {
        self.lock().fail_address_delete = true;
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        self.lock().requests.clone()
    }

    /// Requests matching a method and path.
    #[must_use]
    pub fn requests_to(&self, method: &Method, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| &r.method == method && r.path == path)
            .collect()
    }

    /// Forget the recorded requests.
    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    #[must_use]
    pub fn cart_quantity(&self, product_id: u32) -> Option<u64> {
        self.lock()
            .cart
            .iter()
            .find(|line| line["product_id"] == product_id)
            .and_then(|line| line["quantity"].as_u64())
    }
}

async fn record(State(market): State<Shared>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap_or_default();
    market.lock().unwrap().requests.push(Recorded {
        method: parts.method.clone(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&bytes).into_owned(),
    });
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn ack() -> Json<Value> {
    Json(json!({ "success": true, "message": "ok" }))
}

fn fake_router(market: Shared) -> Router {
    Router::new()
        .route("/shouye", get(list_products))
        .route("/searchs", get(search))
        .route("/api/admin_product", get(list_products))
        .route("/admin_product/{id}", delete(remove_product))
        .route("/ownProducts", get(own_products))
        .route("/addProduct", post(add_product))
        .route("/removeProduct/{id}/remove", delete(remove_product))
        .route("/cart", get(cart).post(add_to_cart))
        .route("/cart/{id}", delete(remove_cart_line))
        .route("/cart/{id}/quantity", put(update_quantity))
        .route("/favorite", post(favorite))
        .route("/favorites", get(favorites))
        .route("/addresses", get(addresses).post(add_address))
        .route("/addresses/{id}", delete(delete_address))
        .route("/orders", get(orders).post(create_order))
        .route("/orders/{id}", delete(cancel_order))
        .route("/orders/{id}/pay", post(pay_order))
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/users/{id}", get(user))
        .layer(from_fn_with_state(Arc::clone(&market), record))
        .with_state(market)
}

async fn list_products(State(market): State<Shared>) -> Json<Value> {
    Json(Value::Array(market.lock().unwrap().products.clone()))
}

async fn search(
    State(market): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let term = query.get("search").cloned().unwrap_or_default().to_lowercase();
    if term == FAILING_SEARCH {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let found: Vec<Value> = market
        .lock()
        .unwrap()
        .products
        .iter()
        .filter(|p| {
            p["product_name"]
                .as_str()
                .is_some_and(|name| name.to_lowercase().contains(&term))
        })
        .cloned()
        .collect();
    Json(Value::Array(found)).into_response()
}

async fn own_products(State(market): State<Shared>) -> Json<Value> {
    let products = market.lock().unwrap().products.clone();
    Json(Value::Array(products))
}

async fn add_product(State(market): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut market = market.lock().unwrap();
    let id = 2000 + u32::try_from(market.products.len()).unwrap_or(0);
    market.products.push(json!({
        "product_id": id,
        "name": body["name"],
        "description": body["description"],
        "category": body["category"],
        "price": body["price"],
        "image_url": body["image_url"],
        "is_active": body["is_active"],
    }));
    ack()
}

async fn remove_product(State(market): State<Shared>, Path(id): Path<u32>) -> Json<Value> {
    market
        .lock()
        .unwrap()
        .products
        .retain(|p| p["product_id"] != id);
    ack()
}

async fn cart(State(market): State<Shared>) -> Json<Value> {
    Json(json!({ "items": market.lock().unwrap().cart }))
}

async fn add_to_cart(State(market): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut market = market.lock().unwrap();
    let product_id = body["product_id"].as_u64().unwrap_or(0);
    let quantity = body["quantity"].as_u64().unwrap_or(1);

    let Some(product) = market
        .products
        .iter()
        .find(|p| p["product_id"] == product_id)
        .cloned()
    else {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "商品不存在" }))).into_response();
    };

    if let Some(line) = market
        .cart
        .iter_mut()
        .find(|line| line["product_id"] == product_id)
    {
        let current = line["quantity"].as_u64().unwrap_or(0);
        line["quantity"] = json!(current + quantity);
    } else {
        market.cart.push(json!({
            "product_id": product_id,
            "product_name": product["product_name"],
            "price": product["price"],
            "quantity": quantity,
            "image_url": product["image_url"],
        }));
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn update_quantity(
    State(market): State<Shared>,
    Path(id): Path<u32>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut market = market.lock().unwrap();
    if let Some(line) = market.cart.iter_mut().find(|line| line["product_id"] == id) {
        line["quantity"] = body["quantity"].clone();
    }
    ack()
}

async fn remove_cart_line(State(market): State<Shared>, Path(id): Path<u32>) -> Json<Value> {
    market
        .lock()
        .unwrap()
        .cart
        .retain(|line| line["product_id"] != id);
    ack()
}

async fn favorite(State(market): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let product_id = u32::try_from(body["product_id"].as_u64().unwrap_or(0)).unwrap_or(0);
    if product_id == UNFAVORABLE_PRODUCT {
        return Json(json!({ "error": "收藏失败" }));
    }
    let mut market = market.lock().unwrap();
    if body["action"] == "add" {
        market.favorites.push(product_id);
        Json(json!({ "message": "收藏成功" }))
    } else {
        market.favorites.retain(|id| *id != product_id);
        Json(json!({ "message": "已取消收藏" }))
    }
}

async fn favorites(State(market): State<Shared>) -> Json<Value> {
    let market = market.lock().unwrap();
    let listed: Vec<Value> = market
        .products
        .iter()
        .filter(|p| {
            p["product_id"]
                .as_u64()
                .is_some_and(|id| market.favorites.iter().any(|f| u64::from(*f) == id))
        })
        .cloned()
        .collect();
    Json(Value::Array(listed))
}

async fn addresses(State(market): State<Shared>) -> Json<Value> {
    Json(json!({ "items": market.lock().unwrap().addresses }))
}

async fn add_address(State(market): State<Shared>, Json(mut body): Json<Value>) -> Json<Value> {
    let mut market = market.lock().unwrap();
    market.next_address += 1;
    body["address_id"] = json!(market.next_address);
    market.addresses.push(body);
    ack()
}

async fn delete_address(State(market): State<Shared>, Path(id): Path<u32>) -> Response {
    let mut market = market.lock().unwrap();
    if market.fail_address_delete {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    market.addresses.retain(|a| a["address_id"] != id);
    ack().into_response()
}

async fn create_order(State(market): State<Shared>) -> Json<Value> {
    let delay = market.lock().unwrap().order_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let mut market = market.lock().unwrap();
    market.next_order += 1;
    Json(json!({ "success": true, "orderId": market.next_order, "message": "订单已创建" }))
}

async fn cancel_order(State(market): State<Shared>) -> Response {
    if market.lock().unwrap().fail_order_cancel {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "订单无法取消" })),
        )
            .into_response();
    }
    ack().into_response()
}

async fn pay_order(State(market): State<Shared>) -> Json<Value> {
    market.lock().unwrap().cart.clear();
    ack()
}

async fn orders() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": [{
            "orderId": 42,
            "create_at": "2024-05-01T09:30:00+08:00",
            "totalPrice": 36.0,
            "status": "paid",
            "products": [{
                "product_id": 3,
                "product_name": "Longjing",
                "product_price": "18.00",
                "quantity": 2
            }]
        }]
    }))
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "wrong" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "用户名或密码错误" })),
        )
            .into_response();
    }
    let role = body["role"].as_u64().unwrap_or(2);
    let user_id = if role == 1 { 1 } else { 2 };
    Json(json!({ "message": "登录成功", "role": role, "userId": user_id })).into_response()
}

async fn register(Json(body): Json<Value>) -> Json<Value> {
    if body["username"] == "taken" {
        return Json(json!({ "message": "用户名已存在" }));
    }
    Json(json!({ "message": "注册成功" }))
}

async fn user(Path(id): Path<u32>) -> Json<Value> {
    Json(json!({
        "success": true,
        "user": {
            "user_id": id,
            "username": "li",
            "email": "li@example.cn",
            "phone": "13800138000",
            "registration_date": "2024-01-02"
        }
    }))
}

// =============================================================================
// Storefront driver
// =============================================================================

/// A storefront response, body read to text.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The parsed `HX-Trigger` header, or `Null`.
    #[must_use]
    pub fn triggers(&self) -> Value {
        self.headers
            .get("hx-trigger")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| serde_json::from_str(v).ok())
            .unwrap_or(Value::Null)
    }

    /// Message of the `notify` event, if any.
    #[must_use]
    pub fn notification(&self) -> Option<String> {
        self.triggers()["notify"]["message"]
            .as_str()
            .map(str::to_string)
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Whether the response asks HTMX to leave the target alone.
    #[must_use]
    pub fn is_swap_free(&self) -> bool {
        self.headers
            .get("hx-reswap")
            .is_some_and(|v| v.as_bytes() == b"none")
    }

    /// Value of the first `name="checkout_id"` hidden input.
    #[must_use]
    pub fn checkout_id(&self) -> Option<String> {
        let marker = r#"name="checkout_id" value=""#;
        let start = self.body.find(marker)? + marker.len();
        let rest = self.body.get(start..)?;
        rest.find('"').and_then(|end| rest.get(..end)).map(str::to_string)
    }
}

/// The storefront router plus a cookie jar of one.
pub struct TestApp {
    router: Router,
    cookie: Option<String>,
}

impl TestApp {
    /// Build the storefront against a fake market.
    #[must_use]
    pub fn new(market: &FakeMarket) -> Self {
        let config = StorefrontConfig {
            host: [127, 0, 0, 1].into(),
            port: 0,
            base_url: "http://localhost:3000".to_string(),
            api: ApiConfig {
                base_url: market.base_url().clone(),
                timeout: Duration::from_secs(5),
                product_cache_ttl: Duration::from_secs(60),
            },
            sentry: SentryConfig::default(),
        };
        let state = AppState::new(config).unwrap();

        Self {
            router: terroir_storefront::app(state),
            cookie: None,
        }
    }

    /// A second driver on the same router and session, for overlapping
    /// requests.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            router: self.router.clone(),
            cookie: self.cookie.clone(),
        }
    }

    async fn send(&mut self, request: axum::http::request::Builder, body: Body) -> TestResponse {
        let mut request = request.header("x-forwarded-for", "127.0.0.1");
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            let pair = set_cookie.split(';').next().unwrap_or_default().to_string();
            self.cookie = Some(pair);
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// Full page GET.
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = axum::http::Request::builder().method(Method::GET).uri(uri);
        self.send(request, Body::empty()).await
    }

    /// HTMX fragment GET.
    pub async fn htmx_get(&mut self, uri: &str) -> TestResponse {
        let request = axum::http::Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header("hx-request", "true");
        self.send(request, Body::empty()).await
    }

    /// Plain form POST, as a browser without HTMX sends it.
    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(request, Body::from(body)).await
    }

    /// HTMX form POST.
    pub async fn htmx_post(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("hx-request", "true");
        self.send(request, Body::from(body)).await
    }

    /// Log in through the login form. `role` is `user` or `admin`.
    pub async fn login(&mut self, username: &str, role: &str) -> TestResponse {
        let response = self
            .post_form(
                "/auth/login",
                &[("username", username), ("password", "secret123"), ("role", role)],
            )
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "login failed: {}", response.body);
        response
    }
}
