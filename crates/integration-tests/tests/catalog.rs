//! Listing, search highlighting and favorites end to end.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use terroir_integration_tests::{FAILING_SEARCH, FakeMarket, TestApp, UNFAVORABLE_PRODUCT};

#[tokio::test]
async fn test_home_lists_products_with_resolved_images() {
    let market = FakeMarket::start().await;
    market.add_product(1, "Honey", "10.5");
    let mut app = TestApp::new(&market);

    let page = app.get("/").await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Honey"));
    assert!(page.body.contains("¥10.50"));
    assert!(page.body.contains(&format!("{}uploads/1.png", market.base_url())));
    // Signed out: no remove button
    assert!(!page.body.contains("/admin/products/1/remove"));
}

#[tokio::test]
async fn test_empty_search_sends_nothing() {
    let market = FakeMarket::start().await;
    let mut app = TestApp::new(&market);

    let page = app.get("/search?query=%20%20").await;

    assert!(page.body.contains("Enter a search keyword"));
    assert!(market.requests().is_empty());
}

#[tokio::test]
async fn test_search_escapes_and_highlights() {
    let market = FakeMarket::start().await;
    market.add_product(1, "<b>Tea</b> & Honey", "18.00");
    let mut app = TestApp::new(&market);

    let page = app.get("/search?query=tea").await;

    assert!(page.body.contains(
        r#"&lt;b&gt;<span class="highlight">Tea</span>&lt;/b&gt; &amp; Honey"#
    ));
    assert!(!page.body.contains("<b>Tea"));
    let sent = market.requests_to(&Method::GET, "/searchs");
    assert_eq!(sent[0].query, "search=tea");
}

#[tokio::test]
async fn test_search_metacharacters_are_literal() {
    let market = FakeMarket::start().await;
    market.add_product(1, "Tea (green)", "18.00");
    market.add_product(2, "Black tea", "12.00");
    let mut app = TestApp::new(&market);

    let page = app.get("/search?query=%28green%29").await;

    assert!(page.body.contains(r#"Tea <span class="highlight">(green)</span>"#));
    assert!(!page.body.contains("Black tea"));
}

#[tokio::test]
async fn test_search_empty_and_failed_results() {
    let market = FakeMarket::start().await;
    market.add_product(1, "Honey", "10.00");
    let mut app = TestApp::new(&market);

    let none = app.get("/search?query=durian").await;
    assert!(none.body.contains("No matching products"));

    let failed = app.get(&format!("/search?query={FAILING_SEARCH}")).await;
    assert_eq!(failed.status, StatusCode::OK);
    assert!(failed.body.contains("Search failed, please try again later"));
}

#[tokio::test]
async fn test_favorite_toggle_after_confirmation() {
    let market = FakeMarket::start().await;
    market.add_product(1, "Honey", "10.00");
    let mut app = TestApp::new(&market);
    app.login("li", "user").await;

    let added = app
        .htmx_post("/favorites/toggle", &[("product_id", "1"), ("favorited", "false")])
        .await;
    assert!(added.body.contains(r#"name="favorited" value="true""#));
    assert_eq!(added.notification().as_deref(), Some("收藏成功"));
    let sent = market.requests_to(&Method::POST, "/favorite");
    assert_eq!(sent[0].json()["action"], "add");

    // The home page now marks it
    let page = app.get("/").await;
    assert!(page.body.contains("is-favorited"));

    let removed = app
        .htmx_post("/favorites/toggle", &[("product_id", "1"), ("favorited", "true")])
        .await;
    assert!(removed.body.contains(r#"name="favorited" value="false""#));
    let sent = market.requests_to(&Method::POST, "/favorite");
    assert_eq!(sent[1].json()["action"], "remove");
}

#[tokio::test]
async fn test_failed_favorite_keeps_old_icon() {
    let market = FakeMarket::start().await;
    let mut app = TestApp::new(&market);
    app.login("li", "user").await;

    let id = UNFAVORABLE_PRODUCT.to_string();
    let response = app
        .htmx_post("/favorites/toggle", &[("product_id", &id), ("favorited", "false")])
        .await;

    assert!(response.body.contains(r#"name="favorited" value="false""#));
    assert_eq!(response.notification().as_deref(), Some("收藏失败"));
    assert_eq!(response.triggers()["notify"]["level"], "error");
}

#[tokio::test]
async fn test_favorites_page_and_removal() {
    let market = FakeMarket::start().await;
    market.add_product(1, "Honey", "10.00");
    let mut app = TestApp::new(&market);
    app.login("li", "user").await;

    let empty = app.get("/favorites").await;
    assert!(empty.body.contains("You have no favorites yet"));

    app.htmx_post("/favorites/toggle", &[("product_id", "1"), ("favorited", "false")])
        .await;
    let listed = app.get("/favorites").await;
    assert!(listed.body.contains("Honey"));

    let removed = app.htmx_post("/favorites/1/remove", &[]).await;
    assert!(removed.body.contains("You have no favorites yet"));
    assert_eq!(removed.notification().as_deref(), Some("Removed from favorites"));
}

#[tokio::test]
async fn test_health_and_readiness() {
    let market = FakeMarket::start().await;
    let mut app = TestApp::new(&market);

    assert_eq!(app.get("/health").await.status, StatusCode::OK);
    assert_eq!(app.get("/health/ready").await.status, StatusCode::OK);
}
