//! Address manager end to end: ordering, validation and fire-and-forget
//! deletes on both surfaces.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use terroir_integration_tests::{FakeMarket, TestApp};

async fn signed_in(market: &FakeMarket) -> TestApp {
    let mut app = TestApp::new(market);
    app.login("li", "user").await;
    market.clear_requests();
    app
}

fn valid_form<'a>(phone: &'a str, street: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("recipient", "Chen"),
        ("phone", phone),
        ("country", "China"),
        ("province", "Zhejiang"),
        ("city", "Hangzhou"),
        ("district", "Xihu"),
        ("street", street),
    ]
}

#[tokio::test]
async fn test_address_page_lists_default_first() {
    let market = FakeMarket::start().await;
    market.add_address(1, "Zhang", false);
    market.add_address(2, "Wang", true);
    market.add_address(3, "Liu", false);
    let mut app = signed_in(&market).await;

    let page = app.get("/account/addresses").await;

    assert_eq!(page.status, StatusCode::OK);
    let wang = page.body.find("Wang").unwrap();
    let zhang = page.body.find("Zhang").unwrap();
    let liu = page.body.find("Liu").unwrap();
    assert!(wang < zhang && zhang < liu);
    // Nothing is active outside checkout
    assert!(!page.body.contains("address active"));
}

#[tokio::test]
async fn test_invalid_address_is_rejected_locally() {
    let market = FakeMarket::start().await;
    let mut app = signed_in(&market).await;

    let bad_phone = app
        .htmx_post("/addresses?context=account", &valid_form("12345", "1 Longjing Road"))
        .await;
    assert!(bad_phone.is_swap_free());
    assert_eq!(bad_phone.triggers()["notify"]["level"], "error");

    let short_street = app
        .htmx_post("/addresses?context=account", &valid_form("13800138000", "Lane"))
        .await;
    assert!(short_street.is_swap_free());

    assert!(market.requests_to(&Method::POST, "/addresses").is_empty());
}

#[tokio::test]
async fn test_address_saved_and_listed() {
    let market = FakeMarket::start().await;
    let mut app = signed_in(&market).await;

    let response = app
        .htmx_post(
            "/addresses?context=account",
            &valid_form("13800138000", "1 Longjing Road"),
        )
        .await;

    assert_eq!(response.notification().as_deref(), Some("Address saved"));
    assert!(response.body.contains("Chen"));
    let sent = market.requests_to(&Method::POST, "/addresses");
    assert_eq!(sent[0].json()["user_id"], 2);
}

#[tokio::test]
async fn test_delete_reloads_even_when_it_fails() {
    let market = FakeMarket::start().await;
    market.add_address(1, "Zhang", false);
    market.fail_address_deletes();
    let mut app = signed_in(&market).await;

    let response = app
        .htmx_post("/addresses/1/delete?context=account", &[])
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Zhang"));
    assert_eq!(market.requests_to(&Method::DELETE, "/addresses/1").len(), 1);
    assert_eq!(market.requests_to(&Method::GET, "/addresses").len(), 1);
}

#[tokio::test]
async fn test_checkout_context_rerenders_modal() {
    let market = FakeMarket::start().await;
    market.add_cart_line(1, "Honey", "10.00", 1);
    market.add_address(1, "Zhang", true);
    let mut app = signed_in(&market).await;

    let id = app.htmx_post("/checkout/open", &[]).await.checkout_id().unwrap();
    app.htmx_post("/checkout/next", &[("checkout_id", &id)]).await;

    let uri = format!("/addresses/1/delete?context=checkout&checkout_id={id}");
    let response = app.htmx_post(&uri, &[]).await;

    assert!(response.body.contains("Step 2 of 3"));
    assert!(response.body.contains("No saved addresses yet."));

    // With no address left, payment cannot start
    let payment = app.htmx_post("/checkout/next", &[("checkout_id", &id)]).await;
    assert_eq!(
        payment.notification().as_deref(),
        Some("Choose a shipping address first")
    );
}

#[tokio::test]
async fn test_region_selects_cascade() {
    let market = FakeMarket::start().await;
    let mut app = signed_in(&market).await;

    let page = app.get("/account/addresses").await;
    assert!(page.body.contains(r#"<select name="province""#));
    assert!(page.body.contains(r#"<option value="Zhejiang">"#));

    let chosen = app
        .htmx_get("/addresses/regions?province=Zhejiang&city=Hangzhou")
        .await;
    assert_eq!(chosen.status, StatusCode::OK);
    assert!(chosen.body.contains(r#"<option value="Hangzhou" selected>"#));
    assert!(chosen.body.contains(r#"<option value="Xihu">"#));
    assert!(!chosen.body.contains("Shenzhen"));

    // A city left over from the previous province is cleared
    let moved = app
        .htmx_get("/addresses/regions?province=Jiangsu&city=Hangzhou")
        .await;
    assert!(moved.body.contains(r#"<option value="Nanjing">"#));
    assert!(!moved.body.contains(r#"value="Hangzhou""#));
    assert!(!moved.body.contains("Xihu"));
    assert!(moved.body.contains(r#"<select name="district" required disabled>"#));
}

#[tokio::test]
async fn test_region_outside_table_is_rejected() {
    let market = FakeMarket::start().await;
    let mut app = signed_in(&market).await;

    let mut form = valid_form("13800138000", "1 Longjing Road");
    form.retain(|(name, _)| *name != "city");
    form.push(("city", "Nanjing"));

    let response = app.htmx_post("/addresses?context=account", &form).await;
    assert!(response.is_swap_free());
    assert_eq!(
        response.notification().as_deref(),
        Some("Please choose a province, city and district")
    );
    assert!(market.requests_to(&Method::POST, "/addresses").is_empty());
}
