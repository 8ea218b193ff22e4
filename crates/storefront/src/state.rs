//! Application state shared across handlers.

use std::sync::Arc;

use axum::http::HeaderValue;

use crate::api::{ApiClient, ApiError};
use crate::checkouts::CheckoutStore;
use crate::config::StorefrontConfig;
use crate::middleware::security_headers::content_security_policy;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("API client: {0}")]
    Api(#[from] ApiError),
    #[error("invalid Content-Security-Policy: {0}")]
    Csp(#[from] axum::http::header::InvalidHeaderValue),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the market API client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    checkouts: CheckoutStore,
    csp: HeaderValue,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the API origin
    /// cannot appear in a header.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let api = ApiClient::new(&config.api)?;
        let policy = content_security_policy(&config.api.origin(), config.is_secure());
        let csp = HeaderValue::from_str(&policy)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                checkouts: CheckoutStore::new(),
                csp,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the market API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Open checkout wizards.
    #[must_use]
    pub fn checkouts(&self) -> &CheckoutStore {
        &self.inner.checkouts
    }

    /// The `Content-Security-Policy` value, with the API origin allowed for images.
    #[must_use]
    pub fn csp(&self) -> &HeaderValue {
        &self.inner.csp
    }
}
