//! Core types for Terroir.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod phone;
pub mod price;
pub mod role;

pub use id::*;
pub use phone::{MobilePhone, PhoneError};
pub use price::{CURRENCY_SYMBOL, Price, PriceError};
pub use role::{Role, UnknownRole};
