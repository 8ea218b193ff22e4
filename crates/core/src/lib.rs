//! Terroir Core - Shared storefront domain library.
//!
//! This crate provides the types and state transitions used by the
//! `terroir-storefront` server:
//! - [`types`] - Newtype wrappers for IDs, prices, phone numbers and roles
//! - [`cart`] - Cart lines, selection and the cart reducer
//! - [`checkout`] - The three-step checkout wizard and draft order payloads
//! - [`address`] - Default-first ordering and new-address validation
//! - [`favorite`] - Favorite toggle actions
//! - [`region`] - The province, city and district table
//!
//! # Architecture
//!
//! The core crate contains only types and state transitions - no I/O and no
//! HTTP clients. Everything here can be unit-tested without a server or a
//! browser.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod cart;
pub mod checkout;
pub mod favorite;
pub mod region;
pub mod types;

pub use address::{Address, AddressError, AddressForm, NewAddress};
pub use cart::{Cart, CartAction, CartEffect, CartLine, CartSelection};
pub use checkout::{
    CheckoutError, CheckoutItem, CheckoutSession, CheckoutStep, DraftOrderRequest, PaymentMethod,
    StepTransition,
};
pub use favorite::{FavoriteAction, FavoriteRequest};
pub use types::*;
