//! Address book route handlers.
//!
//! The same list appears on the account page and on step 2 of the checkout
//! modal. Add and delete take a `context` query parameter saying which of
//! the two to re-render. The add form's region selects cascade through
//! `GET /addresses/regions`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use terroir_core::address::order_default_first;
use terroir_core::region;
use terroir_core::{Address, AddressForm, AddressId, CheckoutSession};

use crate::filters;
use crate::middleware::RequireUser;
use crate::models::CurrentUser;
use crate::notify::{Notification, Triggers};
use crate::routes::checkout;
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Which surface an address list belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListContext {
    #[default]
    Account,
    Checkout,
}

/// Query parameters of the add and delete endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ContextQuery {
    #[serde(default)]
    pub context: ListContext,
    #[serde(default)]
    pub checkout_id: Option<Uuid>,
}

/// One address row.
#[derive(Debug, Clone)]
pub struct AddressEntry {
    pub id: AddressId,
    pub recipient: String,
    pub phone: String,
    pub line: String,
    pub stamp: String,
    pub is_default: bool,
    /// Chosen for the open checkout.
    pub active: bool,
}

/// Address list display data for templates.
#[derive(Debug, Clone)]
pub struct AddressListView {
    pub entries: Vec<AddressEntry>,
    pub in_checkout: bool,
    /// Element the list's forms swap into.
    pub target: &'static str,
    /// Query string carrying the context to add and delete.
    pub query: String,
    /// Empty outside checkout.
    pub checkout_id: String,
    /// The add form's region selects, nothing chosen.
    pub region: RegionView,
}

/// One `<option>` of a region select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionOption {
    pub name: &'static str,
    pub selected: bool,
}

fn options(names: impl Iterator<Item = &'static str>, chosen: &str) -> Vec<RegionOption> {
    names
        .map(|name| RegionOption {
            name,
            selected: name == chosen,
        })
        .collect()
}

/// The province, city and district selects.
///
/// Cities follow the chosen province and districts the chosen city; a
/// choice that does not belong to its parent is dropped.
#[derive(Debug, Clone, Default)]
pub struct RegionView {
    pub provinces: Vec<RegionOption>,
    pub cities: Vec<RegionOption>,
    pub districts: Vec<RegionOption>,
}

impl RegionView {
    #[must_use]
    pub fn chosen(province: &str, city: &str, district: &str) -> Self {
        Self {
            provinces: options(region::PROVINCES.iter().map(|p| p.name), province),
            cities: options(region::cities(province).iter().map(|c| c.name), city),
            districts: options(region::districts(province, city).iter().copied(), district),
        }
    }

    #[must_use]
    pub fn blank() -> Self {
        Self::chosen("", "", "")
    }
}

fn entries(addresses: &[Address], active: Option<AddressId>) -> Vec<AddressEntry> {
    addresses
        .iter()
        .map(|address| AddressEntry {
            id: address.address_id,
            recipient: address.recipient.clone(),
            phone: address.phone.clone(),
            line: address.full_line(),
            stamp: address.stamp.clone(),
            is_default: address.is_default,
            active: active == Some(address.address_id),
        })
        .collect()
}

impl AddressListView {
    /// The account page list. Nothing is marked active.
    #[must_use]
    pub fn account(addresses: &[Address]) -> Self {
        Self {
            entries: entries(addresses, None),
            in_checkout: false,
            target: "#address-list",
            query: "?context=account".to_string(),
            checkout_id: String::new(),
            region: RegionView::blank(),
        }
    }

    /// The checkout list, with the selected address marked.
    #[must_use]
    pub fn checkout(addresses: &[Address], checkout: &CheckoutSession) -> Self {
        Self {
            entries: entries(addresses, checkout.selected_address()),
            in_checkout: true,
            target: "#checkout-modal",
            query: format!("?context=checkout&checkout_id={}", checkout.id()),
            checkout_id: checkout.id().to_string(),
            region: RegionView::blank(),
        }
    }
}

/// Address book page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/addresses.html")]
pub struct AddressesTemplate {
    pub user: Option<CurrentUser>,
    pub list: AddressListView,
    pub error: Option<String>,
}

/// Address list fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/address_list.html")]
pub struct AddressListTemplate {
    pub list: AddressListView,
}

/// Region selects fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/region_select.html")]
pub struct RegionSelectTemplate {
    pub region: RegionView,
}

/// Current values of the region selects.
#[derive(Debug, Default, Deserialize)]
pub struct RegionQuery {
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub district: String,
}

// =============================================================================
// Routes
// =============================================================================

/// Display the address book.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> impl IntoResponse {
    let (addresses, error) = match state.api().addresses(user.id).await {
        Ok(mut addresses) => {
            order_default_first(&mut addresses);
            (addresses, None)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch addresses");
            (Vec::new(), Some(e.user_message("Could not load your addresses")))
        }
    };

    AddressesTemplate {
        list: AddressListView::account(&addresses),
        user: Some(user),
        error,
    }
}

/// Re-render the list for whichever surface sent the request.
async fn refresh(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    query: &ContextQuery,
    triggers: Triggers,
    forget: Option<AddressId>,
) -> Response {
    match query.context {
        ListContext::Account => {
            let addresses = match state.api().addresses(user.id).await {
                Ok(mut addresses) => {
                    order_default_first(&mut addresses);
                    addresses
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to reload addresses");
                    return Notification::error(e.user_message("Could not load your addresses"))
                        .into_response();
                }
            };
            (
                triggers,
                AddressListTemplate {
                    list: AddressListView::account(&addresses),
                },
            )
                .into_response()
        }
        ListContext::Checkout => {
            let Some(mut slot) = checkout::lock_slot(state, session).await else {
                return checkout::stale();
            };
            let Some(open) = slot.current(query.checkout_id) else {
                return checkout::stale();
            };
            if let Some(address_id) = forget {
                open.forget_address(address_id);
            }
            checkout::address_step(state, user, open, triggers).await
        }
    }
}

/// Re-render the region selects after one of them changed (HTMX).
pub async fn regions(Query(query): Query<RegionQuery>) -> RegionSelectTemplate {
    RegionSelectTemplate {
        region: RegionView::chosen(&query.province, &query.city, &query.district),
    }
}

/// Save a new address (HTMX).
///
/// Validation runs locally; a rejected form is left as typed and a
/// notification names the first broken rule.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id, context = ?query.context))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Query(query): Query<ContextQuery>,
    Form(form): Form<AddressForm>,
) -> Response {
    let address = match form.validate(user.id) {
        Ok(address) => address,
        Err(e) => return Notification::from_error(&e).into_response(),
    };

    if let Err(e) = state.api().add_address(&address).await {
        tracing::error!(error = %e, "Failed to save address");
        return Notification::error(e.user_message("Could not save the address")).into_response();
    }

    let triggers = Triggers::new().notify(Notification::success("Address saved"));
    refresh(&state, &session, &user, &query, triggers, None).await
}

/// Delete an address (HTMX).
///
/// The list reloads whatever the API answered; a failure is only logged.
#[instrument(skip(state, session, user), fields(user_id = %user.id, address_id = %address_id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Path(address_id): Path<AddressId>,
    Query(query): Query<ContextQuery>,
) -> Response {
    if let Err(e) = state.api().delete_address(user.id, address_id).await {
        tracing::warn!(error = %e, "Failed to delete address");
    }

    refresh(
        &state,
        &session,
        &user,
        &query,
        Triggers::new(),
        Some(address_id),
    )
    .await
}
