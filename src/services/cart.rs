use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

/// A single cart line. `unit_price` is the display price the storefront knew
/// when the line was added; it is never trusted at checkout time (the
/// commerce system re-prices the order from its own catalog).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

/// Session cart with derived totals. Totals are recomputed inside every
/// mutation and never set directly; `total_price` always carries exactly two
/// decimal places.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub lines: Vec<CartLine>,
    pub total_items: i64,
    pub total_price: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            total_items: 0,
            total_price: two_decimals(Decimal::ZERO),
            updated_at: Utc::now(),
        }
    }
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn recompute_totals(&mut self) {
        self.total_items = self.lines.iter().map(|l| i64::from(l.quantity)).sum();
        let total: Decimal = self
            .lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();
        self.total_price = two_decimals(total);
        self.updated_at = Utc::now();
    }
}

fn two_decimals(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    rounded
}

/// Input for adding a line to a cart
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddLineInput {
    pub product_id: String,
    pub product_name: String,
    pub unit_price: Decimal,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub image_ref: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

/// Session-keyed cart store.
///
/// All cart mutation goes through this one type so the totals invariant
/// lives in a single place. Mutations are deliberately infallible: malformed
/// quantities are clamped to 1 and operations on unknown lines are no-ops,
/// favoring always-valid state over rejecting input.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    carts: Arc<DashMap<String, Cart>>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a line, merging by product id: an existing line has its quantity
    /// incremented, otherwise the line is appended (insertion order is
    /// display order). Quantities below 1 are clamped to 1.
    pub fn add_line(&self, session_id: &str, input: AddLineInput) -> Cart {
        let quantity = input.quantity.max(1);
        let mut entry = self
            .carts
            .entry(session_id.to_string())
            .or_default();

        if let Some(line) = entry
            .lines
            .iter_mut()
            .find(|l| l.product_id == input.product_id)
        {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            entry.lines.push(CartLine {
                product_id: input.product_id,
                product_name: input.product_name,
                unit_price: input.unit_price,
                quantity,
                image_ref: input.image_ref,
            });
        }

        entry.recompute_totals();
        info!(session_id = %session_id, items = entry.total_items, "cart line added");
        entry.clone()
    }

    /// Sets a line's quantity; a quantity of zero or less removes the line.
    /// Unknown sessions are left alone, not materialized.
    pub fn update_quantity(&self, session_id: &str, product_id: &str, quantity: i32) -> Cart {
        if quantity <= 0 {
            return self.remove_line(session_id, product_id);
        }

        let Some(mut entry) = self.carts.get_mut(session_id) else {
            return Cart::default();
        };

        if let Some(line) = entry.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }

        entry.recompute_totals();
        entry.clone()
    }

    /// Removes the line for `product_id`, if present. Unknown sessions are
    /// left alone, not materialized.
    pub fn remove_line(&self, session_id: &str, product_id: &str) -> Cart {
        let Some(mut entry) = self.carts.get_mut(session_id) else {
            return Cart::default();
        };

        entry.lines.retain(|l| l.product_id != product_id);
        entry.recompute_totals();
        entry.clone()
    }

    /// Resets the session to an empty cart. Used after successful checkout.
    pub fn clear(&self, session_id: &str) {
        self.carts.remove(session_id);
        info!(session_id = %session_id, "cart cleared");
    }

    /// Returns a snapshot of the session cart (empty when unknown).
    pub fn get(&self, session_id: &str) -> Cart {
        self.carts
            .get(session_id)
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn session_count(&self) -> usize {
        self.carts.len()
    }

    /// Drops carts that have not been touched within `idle`; returns how
    /// many were evicted. Run periodically by the janitor task.
    pub fn evict_idle(&self, idle: chrono::Duration) -> usize {
        let cutoff = Utc::now() - idle;
        let before = self.carts.len();
        self.carts.retain(|_, cart| cart.updated_at > cutoff);
        before - self.carts.len()
    }
}
