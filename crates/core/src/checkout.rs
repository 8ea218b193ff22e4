//! The checkout wizard.
//!
//! A [`CheckoutSession`] is created each time the checkout modal opens and
//! dropped when it closes. It owns everything the wizard needs: the current
//! step, a snapshot of the selected cart lines, the chosen address and
//! payment option, and the draft order id once one exists.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::Cart;
use crate::types::{AddressId, OrderId, Price, ProductId, UserId};

// =============================================================================
// Steps
// =============================================================================

/// Wizard step. Always one of 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum CheckoutStep {
    /// Item review.
    #[default]
    Review,
    /// Address selection.
    Address,
    /// Payment.
    Payment,
}

impl CheckoutStep {
    /// One-based step number for display.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Review => 1,
            Self::Address => 2,
            Self::Payment => 3,
        }
    }

    /// The following step, or the same step at Payment.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Review => Self::Address,
            Self::Address | Self::Payment => Self::Payment,
        }
    }

    /// The preceding step, or the same step at Review.
    #[must_use]
    pub const fn prev(self) -> Self {
        match self {
            Self::Review | Self::Address => Self::Review,
            Self::Payment => Self::Address,
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Review => "Review items",
            Self::Address => "Shipping address",
            Self::Payment => "Payment",
        }
    }
}

/// What a step change asks the caller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTransition {
    /// Clamped at either end.
    Unchanged,
    /// Back on item review.
    EnteredReview,
    /// On address selection; load the address list.
    EnteredAddress,
    /// On payment; create the draft order.
    EnteredPayment,
}

impl StepTransition {
    const fn entering(step: CheckoutStep) -> Self {
        match step {
            CheckoutStep::Review => Self::EnteredReview,
            CheckoutStep::Address => Self::EnteredAddress,
            CheckoutStep::Payment => Self::EnteredPayment,
        }
    }
}

// =============================================================================
// Payment options
// =============================================================================

/// Payment option chosen on the last step.
///
/// Only shown in the wizard; the API's pay endpoint takes no method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Alipay,
    Wechat,
    Card,
}

impl PaymentMethod {
    pub const ALL: [Self; 3] = [Self::Alipay, Self::Wechat, Self::Card];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alipay => "alipay",
            Self::Wechat => "wechat",
            Self::Card => "card",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Alipay => "Alipay",
            Self::Wechat => "WeChat Pay",
            Self::Card => "Bank card",
        }
    }

    /// Parse a form value. Unknown values yield `None`.
    #[must_use]
    pub fn from_form_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == value.trim())
    }
}

// =============================================================================
// Session
// =============================================================================

/// Errors raised while preparing a draft order.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutError {
    /// No selected lines, or their total is zero.
    #[error("select at least one item before checking out")]
    NothingSelected,
    /// No shipping address has been chosen.
    #[error("choose a shipping address first")]
    NoAddress,
    /// There is no draft order to pay or cancel.
    #[error("no order is awaiting payment")]
    NoDraftOrder,
}

/// A cart line frozen at the moment the wizard opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub name: String,
    pub image_url: String,
    pub price: Price,
    pub quantity: u32,
}

impl CheckoutItem {
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftOrderRequest {
    pub user_id: UserId,
    #[serde(rename = "totalPrice")]
    pub total_price: Price,
    pub address_id: AddressId,
    pub product_ids: Vec<ProductId>,
    pub product_quantities: Vec<u32>,
}

/// State of one open checkout modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    id: Uuid,
    step: CheckoutStep,
    items: Vec<CheckoutItem>,
    total: Price,
    selected_address: Option<AddressId>,
    payment_method: PaymentMethod,
    order_id: Option<OrderId>,
}

impl CheckoutSession {
    /// Snapshot the selected lines of `cart` into a new session on step 1.
    #[must_use]
    pub fn open(cart: &Cart) -> Self {
        let items = cart
            .selected_lines()
            .map(|line| CheckoutItem {
                product_id: line.product_id,
                name: line.name.clone(),
                image_url: line.image_url.clone(),
                price: line.price,
                quantity: line.quantity,
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            step: CheckoutStep::Review,
            items,
            total: cart.total(),
            selected_address: None,
            payment_method: PaymentMethod::default(),
            order_id: None,
        }
    }

    /// Identifies this opening of the modal. Forms echo it back so requests
    /// from a closed modal can be recognised.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn is_current(&self, id: Uuid) -> bool {
        self.id == id
    }

    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    #[must_use]
    pub fn items(&self) -> &[CheckoutItem] {
        &self.items
    }

    #[must_use]
    pub const fn total(&self) -> Price {
        self.total
    }

    #[must_use]
    pub const fn selected_address(&self) -> Option<AddressId> {
        self.selected_address
    }

    #[must_use]
    pub const fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    #[must_use]
    pub const fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    /// Move forward one step.
    pub fn advance(&mut self) -> StepTransition {
        self.move_to(self.step.next())
    }

    /// Move back one step.
    pub fn retreat(&mut self) -> StepTransition {
        self.move_to(self.step.prev())
    }

    fn move_to(&mut self, step: CheckoutStep) -> StepTransition {
        if step == self.step {
            return StepTransition::Unchanged;
        }
        self.step = step;
        StepTransition::entering(step)
    }

    pub fn select_address(&mut self, address_id: AddressId) {
        self.selected_address = Some(address_id);
    }

    /// Clear the address if it is no longer in the user's list.
    pub fn forget_address(&mut self, address_id: AddressId) {
        if self.selected_address == Some(address_id) {
            self.selected_address = None;
        }
    }

    pub fn select_payment_method(&mut self, method: PaymentMethod) {
        self.payment_method = method;
    }

    /// Build the `POST /orders` body from the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::NothingSelected`] for an empty or zero-total
    /// snapshot and [`CheckoutError::NoAddress`] when no address is chosen.
    pub fn draft_order(&self, user_id: UserId) -> Result<DraftOrderRequest, CheckoutError> {
        if self.items.is_empty() || self.total.is_zero() {
            return Err(CheckoutError::NothingSelected);
        }
        let address_id = self.selected_address.ok_or(CheckoutError::NoAddress)?;

        let (product_ids, product_quantities) = self
            .items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .unzip();

        Ok(DraftOrderRequest {
            user_id,
            total_price: self.total,
            address_id,
            product_ids,
            product_quantities,
        })
    }

    /// Attach the draft order created on entering payment.
    pub fn record_order(&mut self, order_id: OrderId) {
        self.order_id = Some(order_id);
    }

    /// Detach the draft order, e.g. to cancel or pay it.
    pub fn take_order(&mut self) -> Option<OrderId> {
        self.order_id.take()
    }
}
