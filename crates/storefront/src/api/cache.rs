//! Cache types for market API responses.

use std::sync::Arc;

use super::types::Product;

/// Cache key for listings.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// The home page listing (`/shouye`).
    Featured,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<Vec<Product>>),
}
