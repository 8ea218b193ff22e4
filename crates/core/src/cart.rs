//! Cart state and its reducer.
//!
//! The cart lines come from the API; the `selected` flag on each line is
//! client-only state that never reaches the API. The displayed total is
//! always [`Cart::total`], recomputed from the current lines after every
//! action.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub image_url: String,
    /// Unit price.
    pub price: Price,
    pub quantity: u32,
    pub selected: bool,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// A user action against the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAction {
    Increase(ProductId),
    Decrease(ProductId),
    SetSelected(ProductId, bool),
    ToggleSelected(ProductId),
    SelectAll(bool),
    Remove(ProductId),
}

/// What an action did, and what the caller still has to do about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartEffect {
    /// Nothing changed; no request should be sent.
    Unchanged,
    /// A quantity changed and must be written to the API.
    QuantityChanged {
        product_id: ProductId,
        quantity: u32,
    },
    /// Only selection changed; the total moved but nothing is persisted.
    SelectionChanged,
    /// A line was dropped. When `now_empty` is set the empty-cart view
    /// replaces the line list.
    Removed { now_empty: bool },
}

/// The cart as displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Build a cart from lines in fetch order.
    #[must_use]
    pub const fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of `price * quantity` over selected lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.selected_lines().map(CartLine::line_total).sum()
    }

    /// Total quantity across all lines, for the cart badge.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |acc, line| acc.saturating_add(line.quantity))
    }

    pub fn selected_lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter().filter(|line| line.selected)
    }

    /// Whether the "select all" box should render checked.
    #[must_use]
    pub fn all_selected(&self) -> bool {
        !self.lines.is_empty() && self.lines.iter().all(|line| line.selected)
    }

    /// Apply an action and report its effect.
    pub fn apply(&mut self, action: CartAction) -> CartEffect {
        match action {
            CartAction::Increase(product_id) => self.adjust(product_id, |q| Some(q.saturating_add(1))),
            CartAction::Decrease(product_id) => {
                self.adjust(product_id, |q| (q > 1).then(|| q - 1))
            }
            CartAction::SetSelected(product_id, selected) => {
                self.select(product_id, |_| selected)
            }
            CartAction::ToggleSelected(product_id) => self.select(product_id, |current| !current),
            CartAction::SelectAll(selected) => {
                if self.lines.is_empty() {
                    return CartEffect::Unchanged;
                }
                for line in &mut self.lines {
                    line.selected = selected;
                }
                CartEffect::SelectionChanged
            }
            CartAction::Remove(product_id) => {
                let before = self.lines.len();
                self.lines.retain(|line| line.product_id != product_id);
                if self.lines.len() == before {
                    CartEffect::Unchanged
                } else {
                    CartEffect::Removed {
                        now_empty: self.lines.is_empty(),
                    }
                }
            }
        }
    }

    /// Overlay a stored selection onto freshly fetched lines.
    pub fn apply_selection(&mut self, selection: &CartSelection) {
        for line in &mut self.lines {
            line.selected = selection.is_selected(line.product_id);
        }
    }

    /// Capture the current selection for storage between requests.
    #[must_use]
    pub fn selection(&self) -> CartSelection {
        CartSelection {
            deselected: self
                .lines
                .iter()
                .filter(|line| !line.selected)
                .map(|line| line.product_id)
                .collect(),
        }
    }

    fn adjust(&mut self, product_id: ProductId, step: impl Fn(u32) -> Option<u32>) -> CartEffect {
        let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) else {
            return CartEffect::Unchanged;
        };
        match step(line.quantity) {
            Some(quantity) if quantity != line.quantity => {
                line.quantity = quantity;
                CartEffect::QuantityChanged {
                    product_id,
                    quantity,
                }
            }
            _ => CartEffect::Unchanged,
        }
    }

    fn select(&mut self, product_id: ProductId, next: impl Fn(bool) -> bool) -> CartEffect {
        let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) else {
            return CartEffect::Unchanged;
        };
        let selected = next(line.selected);
        if selected == line.selected {
            return CartEffect::Unchanged;
        }
        line.selected = selected;
        CartEffect::SelectionChanged
    }
}

/// Selection state kept between requests.
///
/// Stores the lines the user unchecked, so a line added later starts out
/// selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSelection {
    deselected: BTreeSet<ProductId>,
}

impl CartSelection {
    #[must_use]
    pub fn is_selected(&self, product_id: ProductId) -> bool {
        !self.deselected.contains(&product_id)
    }
}
