//! Cart controller end to end: session gating, selection and totals,
//! quantity persistence and the empty-cart placeholder.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use terroir_integration_tests::{FakeMarket, TestApp};

async fn shopper(market: &FakeMarket) -> TestApp {
    let mut app = TestApp::new(market);
    app.login("li", "user").await;
    market.clear_requests();
    app
}

#[tokio::test]
async fn test_add_to_cart_without_session_sends_nothing() {
    let market = FakeMarket::start().await;
    market.add_product(1, "Honey", "10.00");
    let mut app = TestApp::new(&market);

    let response = app.htmx_post("/cart/add", &[("product_id", "1")]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.is_swap_free());
    assert_eq!(
        response.notification().as_deref(),
        Some("Please log in first")
    );
    assert!(market.requests().is_empty());
}

#[tokio::test]
async fn test_cart_page_redirects_to_login_without_session() {
    let market = FakeMarket::start().await;
    let mut app = TestApp::new(&market);

    let response = app.get("/cart").await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/auth/login"));
    assert!(market.requests().is_empty());
}

#[tokio::test]
async fn test_add_to_cart_fires_cart_updated() {
    let market = FakeMarket::start().await;
    market.add_product(1, "Honey", "10.00");
    let mut app = shopper(&market).await;

    let response = app
        .htmx_post("/cart/add", &[("product_id", "1"), ("quantity", "2")])
        .await;

    assert!(response.is_swap_free());
    assert!(response.triggers().get("cart-updated").is_some());
    assert_eq!(response.notification().as_deref(), Some("Added to cart"));

    let sent = market.requests_to(&Method::POST, "/cart");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].json()["quantity"], 2);
    assert_eq!(sent[0].json()["user_id"], 2);
}

#[tokio::test]
async fn test_add_unknown_product_reports_not_found() {
    let market = FakeMarket::start().await;
    let mut app = shopper(&market).await;

    let response = app.htmx_post("/cart/add", &[("product_id", "77")]).await;

    assert_eq!(response.notification().as_deref(), Some("Product not found"));
    assert!(response.triggers().get("cart-updated").is_none());
}

#[tokio::test]
async fn test_deselecting_line_zeroes_total() {
    let market = FakeMarket::start().await;
    market.add_cart_line(1, "Honey", "10.00", 2);
    let mut app = shopper(&market).await;

    let before = app.htmx_get("/cart/items").await;
    assert!(before.body.contains("¥20.00"));

    // An unticked checkbox sends no field at all
    let after = app.htmx_post("/cart/1/select", &[]).await;
    assert!(after.body.contains("Total: <strong>¥0.00</strong>"));

    // Selection never reaches the API
    assert!(market.requests_to(&Method::PUT, "/cart/1/quantity").is_empty());

    // And it survives a reload
    let reloaded = app.htmx_get("/cart/items").await;
    assert!(reloaded.body.contains("Total: <strong>¥0.00</strong>"));

    let all = app
        .htmx_post("/cart/select-all", &[("checked", "true")])
        .await;
    assert!(all.body.contains("Total: <strong>¥20.00</strong>"));
}

#[tokio::test]
async fn test_quantity_changes_are_persisted() {
    let market = FakeMarket::start().await;
    market.add_cart_line(1, "Honey", "10.00", 2);
    let mut app = shopper(&market).await;

    let response = app.htmx_post("/cart/1/increase", &[]).await;

    assert!(response.body.contains("¥30.00"));
    assert!(response.triggers().get("cart-count").is_some());
    let sent = market.requests_to(&Method::PUT, "/cart/1/quantity");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].json()["quantity"], 3);
    assert_eq!(sent[0].query, "user_id=2");
    assert_eq!(market.cart_quantity(1), Some(3));
}

#[tokio::test]
async fn test_decrease_at_one_sends_nothing() {
    let market = FakeMarket::start().await;
    market.add_cart_line(1, "Honey", "10.00", 1);
    let mut app = shopper(&market).await;

    let response = app.htmx_post("/cart/1/decrease", &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("¥10.00"));
    assert!(market.requests_to(&Method::PUT, "/cart/1/quantity").is_empty());
}

#[tokio::test]
async fn test_deleting_last_line_shows_placeholder() {
    let market = FakeMarket::start().await;
    market.add_cart_line(1, "Honey", "10.00", 2);
    let mut app = shopper(&market).await;

    let response = app.htmx_post("/cart/1/delete", &[]).await;

    assert_eq!(market.requests_to(&Method::DELETE, "/cart/1").len(), 1);
    assert_eq!(response.body.matches("Your cart is empty.").count(), 1);
    assert!(!response.body.contains("cart-footer"));
    assert!(!response.body.contains("Honey"));
}

#[tokio::test]
async fn test_cart_count_badge() {
    let market = FakeMarket::start().await;
    market.add_cart_line(1, "Honey", "10.00", 2);
    market.add_cart_line(2, "Tea", "18.00", 3);
    let mut app = shopper(&market).await;

    let badge = app.htmx_get("/cart/count").await;
    assert!(badge.body.contains(">5<"));

    let mut anonymous = TestApp::new(&market);
    let empty = anonymous.htmx_get("/cart/count").await;
    assert!(!empty.body.contains("badge"));
}
