//! Checkout wizard end to end: step clamping, address preselection, the
//! draft order lifecycle and stale modal detection.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::Method;
use terroir_integration_tests::{FakeMarket, TestApp, TestResponse};

async fn ready_to_check_out() -> (FakeMarket, TestApp) {
    let market = FakeMarket::start().await;
    market.add_cart_line(1, "Honey", "10.00", 2);
    market.add_address(4, "Zhang", false);
    market.add_address(5, "Wang", true);
    let mut app = TestApp::new(&market);
    app.login("li", "user").await;
    market.clear_requests();
    (market, app)
}

async fn step(app: &mut TestApp, action: &str, checkout_id: &str) -> TestResponse {
    app.htmx_post(&format!("/checkout/{action}"), &[("checkout_id", checkout_id)])
        .await
}

/// A step button press, echoing the step the modal was showing.
async fn press(app: &mut TestApp, action: &str, checkout_id: &str, from: &str) -> TestResponse {
    app.htmx_post(
        &format!("/checkout/{action}"),
        &[("checkout_id", checkout_id), ("step", from)],
    )
    .await
}

/// Open the wizard and walk it to the payment step.
async fn at_payment(app: &mut TestApp) -> String {
    let opened = app.htmx_post("/checkout/open", &[]).await;
    let id = opened.checkout_id().unwrap();
    step(app, "next", &id).await;
    let payment = step(app, "next", &id).await;
    assert!(payment.body.contains("Order #501"));
    id
}

#[tokio::test]
async fn test_full_checkout() {
    let (market, mut app) = ready_to_check_out().await;

    let opened = app.htmx_post("/checkout/open", &[]).await;
    assert!(opened.body.contains("Step 1 of 3"));
    assert!(opened.body.contains("¥20.00"));
    let id = opened.checkout_id().unwrap();

    // Back from the first step stays put
    let clamped = step(&mut app, "prev", &id).await;
    assert!(clamped.body.contains("Step 1 of 3"));

    // Step 2 lists the default address first and preselects it
    let address = step(&mut app, "next", &id).await;
    assert!(address.body.contains("Step 2 of 3"));
    let wang = address.body.find("Wang").unwrap();
    let zhang = address.body.find("Zhang").unwrap();
    assert!(wang < zhang);
    assert!(address.body.contains(r#"class="address active is-default""#));

    // Step 3 creates exactly one draft order from the snapshot
    let payment = step(&mut app, "next", &id).await;
    assert!(payment.body.contains("Step 3 of 3"));
    assert!(payment.body.contains("Order #501"));
    let created = market.requests_to(&Method::POST, "/orders");
    assert_eq!(created.len(), 1);
    let draft = created[0].json();
    assert_eq!(draft["user_id"], 2);
    assert_eq!(draft["address_id"], 5);
    assert_eq!(draft["product_ids"], serde_json::json!([1]));
    assert_eq!(draft["product_quantities"], serde_json::json!([2]));
    assert_eq!(draft["totalPrice"].as_f64(), Some(20.0));

    // Forward from the last step stays put and creates nothing new
    let clamped = step(&mut app, "next", &id).await;
    assert!(clamped.body.contains("Step 3 of 3"));
    assert_eq!(market.requests_to(&Method::POST, "/orders").len(), 1);

    let paid = step(&mut app, "pay", &id).await;
    assert!(paid.body.is_empty());
    assert!(paid.triggers().get("cart-updated").is_some());
    assert_eq!(paid.notification().as_deref(), Some("Payment successful"));
    assert_eq!(market.requests_to(&Method::POST, "/orders/501/pay").len(), 1);

    // The modal is gone; its id no longer works
    let after = step(&mut app, "next", &id).await;
    assert_eq!(after.notification().as_deref(), Some("This checkout was closed"));
}

#[tokio::test]
async fn test_stale_modal_is_ignored() {
    let (market, mut app) = ready_to_check_out().await;

    let first = app.htmx_post("/checkout/open", &[]).await;
    let old_id = first.checkout_id().unwrap();
    let second = app.htmx_post("/checkout/open", &[]).await;
    let new_id = second.checkout_id().unwrap();
    assert_ne!(old_id, new_id);
    market.clear_requests();

    let stale = step(&mut app, "next", &old_id).await;
    assert!(stale.body.is_empty());
    assert_eq!(stale.notification().as_deref(), Some("This checkout was closed"));
    assert!(market.requests().is_empty());

    // A missing id counts as stale too
    let anonymous = app.htmx_post("/checkout/next", &[]).await;
    assert_eq!(anonymous.notification().as_deref(), Some("This checkout was closed"));

    // The current modal is untouched
    let current = step(&mut app, "next", &new_id).await;
    assert!(current.body.contains("Step 2 of 3"));
}

#[tokio::test]
async fn test_reopening_does_not_duplicate_lines() {
    let (_market, mut app) = ready_to_check_out().await;

    app.htmx_post("/checkout/open", &[]).await;
    let reopened = app.htmx_post("/checkout/open", &[]).await;

    assert_eq!(reopened.body.matches(r#"<span class="name">Honey</span>"#).count(), 1);
    assert!(reopened.body.contains("¥20.00"));
}

#[tokio::test]
async fn test_going_back_from_payment_cancels_draft() {
    let (market, mut app) = ready_to_check_out().await;

    let id = app.htmx_post("/checkout/open", &[]).await.checkout_id().unwrap();
    step(&mut app, "next", &id).await;
    step(&mut app, "next", &id).await;

    let back = step(&mut app, "prev", &id).await;
    assert!(back.body.contains("Step 2 of 3"));
    assert_eq!(market.requests_to(&Method::DELETE, "/orders/501").len(), 1);

    // Re-entering payment makes a fresh draft
    let again = step(&mut app, "next", &id).await;
    assert!(again.body.contains("Order #502"));
}

#[tokio::test]
async fn test_closing_cancels_draft_and_restarts() {
    let (market, mut app) = ready_to_check_out().await;

    let id = app.htmx_post("/checkout/open", &[]).await.checkout_id().unwrap();
    step(&mut app, "next", &id).await;
    step(&mut app, "next", &id).await;

    let closed = step(&mut app, "close", &id).await;
    assert!(closed.body.is_empty());
    assert_eq!(market.requests_to(&Method::DELETE, "/orders/501").len(), 1);

    let reopened = app.htmx_post("/checkout/open", &[]).await;
    assert!(reopened.body.contains("Step 1 of 3"));
}

#[tokio::test]
async fn test_nothing_selected_stays_on_address_step() {
    let (market, mut app) = ready_to_check_out().await;
    app.htmx_post("/cart/1/select", &[]).await;

    let id = app.htmx_post("/checkout/open", &[]).await.checkout_id().unwrap();
    step(&mut app, "next", &id).await;
    let payment = step(&mut app, "next", &id).await;

    assert!(payment.body.contains("Step 2 of 3"));
    assert_eq!(
        payment.notification().as_deref(),
        Some("Select at least one item before checking out")
    );
    assert!(market.requests_to(&Method::POST, "/orders").is_empty());
}

#[tokio::test]
async fn test_choosing_another_address() {
    let (market, mut app) = ready_to_check_out().await;

    let id = app.htmx_post("/checkout/open", &[]).await.checkout_id().unwrap();
    step(&mut app, "next", &id).await;
    let chosen = app
        .htmx_post("/checkout/address", &[("checkout_id", &id), ("address_id", "4")])
        .await;
    assert!(chosen.body.contains(r#"class="address active""#));

    step(&mut app, "next", &id).await;
    let created = market.requests_to(&Method::POST, "/orders");
    assert_eq!(created[0].json()["address_id"], 4);
}

#[tokio::test]
async fn test_payment_option_is_marked() {
    let (_market, mut app) = ready_to_check_out().await;

    let id = app.htmx_post("/checkout/open", &[]).await.checkout_id().unwrap();
    step(&mut app, "next", &id).await;
    step(&mut app, "next", &id).await;

    let chosen = app
        .htmx_post(
            "/checkout/payment-method",
            &[("checkout_id", &id), ("method", "wechat")],
        )
        .await;
    assert!(chosen.body.contains(r#"class="payment-option active">WeChat Pay"#));
}

#[tokio::test]
async fn test_cancelling_the_draft_closes_the_modal() {
    let (market, mut app) = ready_to_check_out().await;
    let id = at_payment(&mut app).await;

    let cancelled = step(&mut app, "cancel", &id).await;
    assert!(cancelled.body.is_empty());
    assert_eq!(cancelled.notification().as_deref(), Some("Order cancelled"));
    assert_eq!(market.requests_to(&Method::DELETE, "/orders/501").len(), 1);

    let after = step(&mut app, "pay", &id).await;
    assert_eq!(after.notification().as_deref(), Some("This checkout was closed"));
    assert!(market.requests_to(&Method::POST, "/orders/501/pay").is_empty());
}

#[tokio::test]
async fn test_failed_cancel_keeps_the_modal_open() {
    let (market, mut app) = ready_to_check_out().await;
    market.fail_order_cancels();
    let id = at_payment(&mut app).await;

    let refused = step(&mut app, "cancel", &id).await;
    assert!(refused.is_swap_free());
    assert_eq!(refused.triggers()["notify"]["level"], "error");
    assert_eq!(refused.notification().as_deref(), Some("订单无法取消"));

    // The draft is still there to pay
    let paid = step(&mut app, "pay", &id).await;
    assert_eq!(paid.notification().as_deref(), Some("Payment successful"));
    assert_eq!(market.requests_to(&Method::POST, "/orders/501/pay").len(), 1);
}

#[tokio::test]
async fn test_closing_while_order_is_created_cancels_it() {
    let (market, mut app) = ready_to_check_out().await;
    market.delay_orders(Duration::from_millis(300));
    let opened = app.htmx_post("/checkout/open", &[]).await;
    let id = opened.checkout_id().unwrap();
    step(&mut app, "next", &id).await;

    let mut other = app.fork();
    let (payment, closed) = tokio::join!(step(&mut app, "next", &id), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        step(&mut other, "close", &id).await
    });

    assert!(payment.body.contains("Order #501"));
    assert!(closed.body.is_empty());
    assert_eq!(market.requests_to(&Method::POST, "/orders").len(), 1);
    assert_eq!(market.requests_to(&Method::DELETE, "/orders/501").len(), 1);

    // The late payment page cannot pay the cancelled draft
    let late = step(&mut app, "pay", &id).await;
    assert_eq!(late.notification().as_deref(), Some("This checkout was closed"));
    assert!(market.requests_to(&Method::POST, "/orders/501/pay").is_empty());
}

#[tokio::test]
async fn test_double_next_creates_one_order() {
    let (market, mut app) = ready_to_check_out().await;
    market.delay_orders(Duration::from_millis(200));
    let opened = app.htmx_post("/checkout/open", &[]).await;
    let id = opened.checkout_id().unwrap();
    press(&mut app, "next", &id, "1").await;

    let mut other = app.fork();
    let (first, second) = tokio::join!(
        press(&mut app, "next", &id, "2"),
        press(&mut other, "next", &id, "2")
    );

    assert!(first.body.contains("Step 3 of 3"));
    assert!(second.body.contains("Step 3 of 3"));
    assert_eq!(market.requests_to(&Method::POST, "/orders").len(), 1);
}

#[tokio::test]
async fn test_repeated_press_from_same_step_moves_once() {
    let (market, mut app) = ready_to_check_out().await;
    let opened = app.htmx_post("/checkout/open", &[]).await;
    let id = opened.checkout_id().unwrap();

    let first = press(&mut app, "next", &id, "1").await;
    assert!(first.body.contains("Step 2 of 3"));
    let repeat = press(&mut app, "next", &id, "1").await;
    assert!(repeat.body.contains("Step 2 of 3"));
    assert!(market.requests_to(&Method::POST, "/orders").is_empty());

    // Back from the address step, pressed twice
    press(&mut app, "prev", &id, "2").await;
    let back = press(&mut app, "prev", &id, "2").await;
    assert!(back.body.contains("Step 1 of 3"));
}
