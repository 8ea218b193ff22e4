//! Checkout wizard route handlers.
//!
//! The wizard state is a [`CheckoutSession`] held in the session's
//! [`CheckoutSlot`] while the modal is open. Every form echoes the
//! wizard's `checkout_id`; a request carrying any other id belongs to a
//! modal that was closed or reopened, and its effects are dropped. Step
//! buttons also echo the step they were rendered on, so a repeated click
//! only redisplays the wizard.
//!
//! ```text
//! open ─► 1 Review ─next─► 2 Address ─next─► 3 Payment ─pay─► closed
//!                  ◄─prev─           ◄─prev─ (draft cancelled)
//! ```

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use terroir_core::address::{order_default_first, preselect};
use terroir_core::{
    Address, AddressId, CheckoutError, CheckoutSession, CheckoutStep, OrderId, PaymentMethod,
    StepTransition,
};

use crate::api::ApiError;
use crate::checkouts::CheckoutSlot;
use crate::error::add_breadcrumb;
use crate::middleware::RequireUser;
use crate::models::CurrentUser;
use crate::notify::{CART_UPDATED_EVENT, Notification, Triggers};
use crate::routes::addresses::AddressListView;
use crate::routes::cart::load_cart;
use crate::routes::home::resolve_image;
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// A snapshot line for templates.
#[derive(Debug, Clone)]
pub struct CheckoutItemView {
    pub name: String,
    pub image_url: String,
    pub price: String,
    pub quantity: u32,
    pub line_total: String,
}

/// A payment option for templates.
#[derive(Debug, Clone, Copy)]
pub struct PaymentOption {
    pub value: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// Wizard display data for templates.
#[derive(Debug, Clone)]
pub struct CheckoutView {
    pub id: String,
    pub step: u8,
    pub title: &'static str,
    pub items: Vec<CheckoutItemView>,
    pub total: String,
    pub order_id: Option<OrderId>,
    pub payment_options: Vec<PaymentOption>,
}

impl CheckoutView {
    fn new(checkout: &CheckoutSession, state: &AppState) -> Self {
        let api_base = state.api().base_url();
        Self {
            id: checkout.id().to_string(),
            step: checkout.step().number(),
            title: checkout.step().title(),
            items: checkout
                .items()
                .iter()
                .map(|item| CheckoutItemView {
                    name: item.name.clone(),
                    image_url: resolve_image(api_base, &item.image_url),
                    price: item.price.to_string(),
                    quantity: item.quantity,
                    line_total: item.line_total().to_string(),
                })
                .collect(),
            total: checkout.total().to_string(),
            order_id: checkout.order_id(),
            payment_options: PaymentMethod::ALL
                .iter()
                .map(|method| PaymentOption {
                    value: method.as_str(),
                    label: method.label(),
                    active: *method == checkout.payment_method(),
                })
                .collect(),
        }
    }
}

/// Checkout modal fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/checkout_modal.html")]
pub struct CheckoutModalTemplate {
    pub checkout: CheckoutView,
    /// Present on step 2.
    pub list: Option<AddressListView>,
}

// =============================================================================
// Forms
// =============================================================================

/// Every wizard form carries the id of the modal it was rendered in.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub checkout_id: Option<Uuid>,
    /// Step the Next or Back button was rendered on.
    #[serde(default)]
    pub step: Option<u8>,
}

/// Choose a shipping address on step 2.
#[derive(Debug, Deserialize)]
pub struct AddressChoiceForm {
    #[serde(default)]
    pub checkout_id: Option<Uuid>,
    pub address_id: AddressId,
}

/// Choose a payment option on step 3.
#[derive(Debug, Deserialize)]
pub struct PaymentChoiceForm {
    #[serde(default)]
    pub checkout_id: Option<Uuid>,
    pub method: String,
}

// =============================================================================
// Slot Helpers
// =============================================================================

/// Lock the wizard slot of this browser session.
///
/// `None` only for a session that was never saved, which cannot hold a
/// wizard.
pub async fn lock_slot(state: &AppState, session: &Session) -> Option<CheckoutSlot> {
    let id = session.id()?;
    Some(state.checkouts().lock(id).await)
}

/// Answer a request from a modal that is no longer open.
#[must_use]
pub fn stale() -> Response {
    closed(Triggers::new().notify(Notification::info("This checkout was closed")))
}

/// Empty the modal container, hiding it.
fn closed(triggers: Triggers) -> Response {
    (triggers, Html("")).into_response()
}

async fn cancel_quietly(state: &AppState, order_id: OrderId) {
    if let Err(e) = state.api().cancel_order(order_id).await {
        tracing::warn!(order_id = %order_id, error = %e, "Failed to cancel abandoned draft order");
    }
}

/// Whether a step button was pressed on the step the wizard is at.
fn on_step(checkout: &CheckoutSession, step: Option<u8>) -> bool {
    step.is_none_or(|step| step == checkout.step().number())
}

// =============================================================================
// Rendering
// =============================================================================

fn modal(
    state: &AppState,
    checkout: &CheckoutSession,
    list: Option<AddressListView>,
) -> CheckoutModalTemplate {
    CheckoutModalTemplate {
        checkout: CheckoutView::new(checkout, state),
        list,
    }
}

/// Fetch the address list, default first, and make sure a listed address
/// is selected whenever there is one.
async fn load_addresses(
    state: &AppState,
    user: &CurrentUser,
    checkout: &mut CheckoutSession,
) -> Result<Vec<Address>, ApiError> {
    let mut addresses = state.api().addresses(user.id).await?;
    order_default_first(&mut addresses);

    let selected = checkout.selected_address();
    let still_listed =
        selected.is_some_and(|id| addresses.iter().any(|address| address.address_id == id));
    if !still_listed {
        if let Some(first) = preselect(&addresses) {
            checkout.select_address(first.address_id);
        } else if let Some(id) = selected {
            checkout.forget_address(id);
        }
    }

    Ok(addresses)
}

/// Render the wizard on step 2.
///
/// A failed address fetch is shown as an error notification over an empty
/// list; the wizard stays on step 2.
pub async fn address_step(
    state: &AppState,
    user: &CurrentUser,
    checkout: &mut CheckoutSession,
    mut triggers: Triggers,
) -> Response {
    let addresses = match load_addresses(state, user, checkout).await {
        Ok(addresses) => addresses,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load addresses for checkout");
            triggers = triggers.notify(Notification::error(
                e.user_message("Could not load your addresses"),
            ));
            Vec::new()
        }
    };

    let list = AddressListView::checkout(&addresses, checkout);
    (triggers, modal(state, checkout, Some(list))).into_response()
}

fn render(state: &AppState, checkout: &CheckoutSession) -> Response {
    modal(state, checkout, None).into_response()
}

/// Render whatever step the wizard is on.
async fn redisplay(
    state: &AppState,
    user: &CurrentUser,
    checkout: &mut CheckoutSession,
) -> Response {
    if checkout.step() == CheckoutStep::Address {
        address_step(state, user, checkout, Triggers::new()).await
    } else {
        render(state, checkout)
    }
}

/// Leave step 3 for step 2 after the draft order could not be created.
async fn back_to_address(
    state: &AppState,
    user: &CurrentUser,
    checkout: &mut CheckoutSession,
    notification: Notification,
) -> Response {
    checkout.retreat();
    address_step(state, user, checkout, Triggers::new().notify(notification)).await
}

/// Create the draft order on entering step 3.
///
/// The caller holds the session's slot until the order id is recorded, so
/// a close or a second Next queues behind this and sees the draft.
async fn enter_payment(
    state: &AppState,
    user: &CurrentUser,
    checkout: &mut CheckoutSession,
) -> Response {
    let draft = match checkout.draft_order(user.id) {
        Ok(draft) => draft,
        Err(e) => {
            let notice = Notification::from_error(&e);
            return back_to_address(state, user, checkout, notice).await;
        }
    };

    match state.api().create_order(&draft).await {
        Ok(order_id) => {
            checkout.record_order(order_id);
            render(state, checkout)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create draft order");
            let notice = Notification::error(e.user_message("Could not create the order"));
            back_to_address(state, user, checkout, notice).await
        }
    }
}

// =============================================================================
// Routes
// =============================================================================

/// Open the wizard on the ticked cart lines (HTMX).
///
/// Each opening snapshots the cart afresh under a new id. A draft left by
/// the wizard it replaces is cancelled.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn open(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
) -> Response {
    let Some(mut slot) = lock_slot(&state, &session).await else {
        return Notification::error("Could not open checkout").into_response();
    };

    let cart = match load_cart(&state, &session, &user).await {
        Ok(cart) => cart,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load cart for checkout");
            return Notification::error(e.user_message("Could not load your cart")).into_response();
        }
    };

    let checkout = CheckoutSession::open(&cart);
    let response = render(&state, &checkout);
    if let Some(order_id) = slot.replace(checkout).and_then(|mut old| old.take_order()) {
        cancel_quietly(&state, order_id).await;
    }
    add_breadcrumb("checkout", "Opened checkout", None);
    response
}

/// Go forward one step (HTMX).
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn next(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<CheckoutForm>,
) -> Response {
    let Some(mut slot) = lock_slot(&state, &session).await else {
        return stale();
    };
    let Some(checkout) = slot.current(form.checkout_id) else {
        return stale();
    };
    if !on_step(checkout, form.step) {
        return redisplay(&state, &user, checkout).await;
    }

    match checkout.advance() {
        StepTransition::EnteredAddress => {
            address_step(&state, &user, checkout, Triggers::new()).await
        }
        StepTransition::EnteredPayment => enter_payment(&state, &user, checkout).await,
        StepTransition::EnteredReview | StepTransition::Unchanged => render(&state, checkout),
    }
}

/// Go back one step (HTMX).
///
/// Leaving step 3 cancels the draft order, so re-entering it never leaves
/// an orphan behind.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn prev(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<CheckoutForm>,
) -> Response {
    let Some(mut slot) = lock_slot(&state, &session).await else {
        return stale();
    };
    let Some(checkout) = slot.current(form.checkout_id) else {
        return stale();
    };
    if !on_step(checkout, form.step) {
        return redisplay(&state, &user, checkout).await;
    }

    match checkout.retreat() {
        StepTransition::EnteredAddress => {
            if let Some(order_id) = checkout.take_order() {
                cancel_quietly(&state, order_id).await;
            }
            address_step(&state, &user, checkout, Triggers::new()).await
        }
        StepTransition::EnteredReview
        | StepTransition::EnteredPayment
        | StepTransition::Unchanged => render(&state, checkout),
    }
}

/// Choose the shipping address (HTMX).
#[instrument(skip(state, session, user, form), fields(user_id = %user.id, address_id = %form.address_id))]
pub async fn choose_address(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<AddressChoiceForm>,
) -> Response {
    let Some(mut slot) = lock_slot(&state, &session).await else {
        return stale();
    };
    let Some(checkout) = slot.current(form.checkout_id) else {
        return stale();
    };

    checkout.select_address(form.address_id);
    address_step(&state, &user, checkout, Triggers::new()).await
}

/// Choose the payment option (HTMX).
#[instrument(skip(state, session, _user, form))]
pub async fn choose_payment_method(
    State(state): State<AppState>,
    session: Session,
    RequireUser(_user): RequireUser,
    Form(form): Form<PaymentChoiceForm>,
) -> Response {
    let Some(mut slot) = lock_slot(&state, &session).await else {
        return stale();
    };
    let Some(checkout) = slot.current(form.checkout_id) else {
        return stale();
    };

    let Some(method) = PaymentMethod::from_form_value(&form.method) else {
        return Notification::error("Unknown payment option").into_response();
    };

    checkout.select_payment_method(method);
    render(&state, checkout)
}

/// Cancel the draft order and close (HTMX).
///
/// If the API refuses, the modal stays open on step 3.
#[instrument(skip(state, session, _user, form))]
pub async fn cancel(
    State(state): State<AppState>,
    session: Session,
    RequireUser(_user): RequireUser,
    Form(form): Form<CheckoutForm>,
) -> Response {
    let Some(mut slot) = lock_slot(&state, &session).await else {
        return stale();
    };
    let Some(checkout) = slot.current(form.checkout_id) else {
        return stale();
    };

    let Some(order_id) = checkout.order_id() else {
        slot.clear();
        return closed(Triggers::new());
    };

    match state.api().cancel_order(order_id).await {
        Ok(()) => {
            slot.clear();
            closed(Triggers::new().notify(Notification::info("Order cancelled")))
        }
        Err(e) => {
            tracing::error!(order_id = %order_id, error = %e, "Failed to cancel order");
            Notification::error(e.user_message("Could not cancel the order")).into_response()
        }
    }
}

/// Pay the draft order and close (HTMX).
///
/// Fires `cart-updated` so the cart reloads without the purchased lines.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn pay(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<CheckoutForm>,
) -> Response {
    let Some(mut slot) = lock_slot(&state, &session).await else {
        return stale();
    };
    let Some(checkout) = slot.current(form.checkout_id) else {
        return stale();
    };

    let Some(order_id) = checkout.order_id() else {
        return Notification::from_error(&CheckoutError::NoDraftOrder).into_response();
    };

    match state.api().pay_order(order_id).await {
        Ok(()) => {
            slot.clear();
            let order = order_id.to_string();
            add_breadcrumb("checkout", "Paid order", Some(&[("order_id", order.as_str())]));
            closed(
                Triggers::new()
                    .event(CART_UPDATED_EVENT)
                    .notify(Notification::success("Payment successful")),
            )
        }
        Err(e) => {
            tracing::error!(order_id = %order_id, error = %e, "Payment failed");
            Notification::error(e.user_message("Payment failed")).into_response()
        }
    }
}

/// Close the modal (HTMX).
///
/// Reopening always starts again at step 1. A draft order left behind is
/// cancelled on a best-effort basis.
#[instrument(skip(state, session, _user, form))]
pub async fn close(
    State(state): State<AppState>,
    session: Session,
    RequireUser(_user): RequireUser,
    Form(form): Form<CheckoutForm>,
) -> Response {
    let Some(mut slot) = lock_slot(&state, &session).await else {
        return closed(Triggers::new());
    };
    if slot.current(form.checkout_id).is_some() {
        if let Some(order_id) = slot.clear().and_then(|mut checkout| checkout.take_order()) {
            cancel_quietly(&state, order_id).await;
        }
    }
    closed(Triggers::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use terroir_core::Cart;

    #[test]
    fn test_step_buttons_match_current_step() {
        let mut checkout = CheckoutSession::open(&Cart::default());
        assert!(on_step(&checkout, Some(1)));
        assert!(on_step(&checkout, None));

        checkout.advance();
        assert!(!on_step(&checkout, Some(1)));
        assert!(on_step(&checkout, Some(2)));
    }
}
