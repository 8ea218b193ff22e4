//! Domain models for storefront.
//!
//! Types stored in the tower session between requests.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
