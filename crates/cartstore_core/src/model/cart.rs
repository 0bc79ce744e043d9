//! Cart aggregate and its persisted snapshot format.
//!
//! # Responsibility
//! - Own the merge-by-id, decrement and hard-delete rules.
//! - Derive totals and counts.
//! - Encode/decode the JSON snapshot written to durable storage.
//!
//! # Invariants
//! - No two entries share the same `id`.
//! - Every entry has `quantity >= 1`.
//! - Insertion order is preserved; new entries go last.

use crate::model::item::{CartItem, ItemId};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Snapshot encode/decode failure.
#[derive(Debug)]
pub enum SnapshotError {
    Decode(serde_json::Error),
    Encode(serde_json::Error),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "invalid cart snapshot: {err}"),
            Self::Encode(err) => write!(f, "failed to encode cart snapshot: {err}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Decode(err) | Self::Encode(err) => Some(err),
        }
    }
}

/// Repairs applied while turning raw records into a valid cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Entries dropped because their quantity was zero.
    pub dropped_empty: usize,
    /// Entries folded into an earlier entry with the same id.
    pub merged_duplicates: usize,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_empty == 0 && self.merged_duplicates == 0
    }
}

/// Ordered, unique-by-id collection of line items.
///
/// Only built empty or through [`Cart::from_items`], so the invariants hold
/// for every value of this type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cart from untrusted records, restoring the invariants.
    ///
    /// Zero-quantity entries are dropped. Duplicate ids are merged into the
    /// first occurrence by summing quantities; the first occurrence keeps
    /// its position and descriptive fields.
    pub fn from_items(items: Vec<CartItem>) -> (Self, ReconcileReport) {
        let mut report = ReconcileReport::default();
        let mut positions: HashMap<ItemId, usize> = HashMap::new();
        let mut reconciled: Vec<CartItem> = Vec::with_capacity(items.len());

        for item in items {
            if item.quantity == 0 {
                report.dropped_empty += 1;
                continue;
            }
            if let Some(&index) = positions.get(&item.id) {
                let existing = &mut reconciled[index];
                existing.quantity = existing.quantity.saturating_add(item.quantity);
                report.merged_duplicates += 1;
                continue;
            }
            positions.insert(item.id.clone(), reconciled.len());
            reconciled.push(item);
        }

        (Self { items: reconciled }, report)
    }

    /// Decodes a persisted JSON snapshot and reconciles it.
    pub fn decode_snapshot(raw: &str) -> Result<(Self, ReconcileReport), SnapshotError> {
        let items: Vec<CartItem> = serde_json::from_str(raw).map_err(SnapshotError::Decode)?;
        Ok(Self::from_items(items))
    }

    /// Encodes the cart as a JSON array of item records.
    pub fn encode_snapshot(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(&self.items).map_err(SnapshotError::Encode)
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn get(&self, id: &ItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Adds one unit of `item`.
    ///
    /// An existing entry only gets its quantity bumped; the incoming
    /// descriptive fields are ignored on that path. A new entry is appended
    /// as a copy of `item` with `quantity = 1`.
    ///
    /// Returns `false` without touching the cart when `item` would be
    /// appended with a non-finite price: JSON cannot carry NaN or infinity,
    /// so such an entry would poison the persisted snapshot.
    pub fn add(&mut self, item: &CartItem) -> bool {
        if let Some(existing) = self.items.iter_mut().find(|entry| entry.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(1);
            return true;
        }
        if !item.has_finite_price() {
            return false;
        }

        let mut entry = item.clone();
        entry.quantity = 1;
        self.items.push(entry);
        true
    }

    /// Removes one unit of the entry with `id`, dropping it at zero.
    ///
    /// Returns whether an entry matched. A miss leaves the cart unchanged.
    pub fn decrement(&mut self, id: &ItemId) -> bool {
        let Some(entry) = self.items.iter_mut().find(|entry| &entry.id == id) else {
            return false;
        };
        entry.quantity = entry.quantity.saturating_sub(1);
        self.items.retain(|entry| entry.quantity > 0);
        true
    }

    /// Removes the entry with `id` regardless of its quantity.
    ///
    /// Returns whether an entry matched.
    pub fn remove(&mut self, id: &ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|entry| &entry.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of `price * quantity` over all entries; `0.0` when empty.
    pub fn total(&self) -> f64 {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Number of distinct entries, not units.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities over all entries.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::Cart;
    use crate::model::item::{CartItem, ItemId};

    #[test]
    fn decrement_on_quantity_one_removes_entry() {
        let mut cart = Cart::new();
        cart.add(&CartItem::new("sku-1", 4.0));

        assert!(cart.decrement(&ItemId::from("sku-1")));
        assert!(cart.is_empty());
    }

    #[test]
    fn decrement_miss_reports_false_and_keeps_contents() {
        let mut cart = Cart::new();
        cart.add(&CartItem::new(7, 1.5));

        assert!(!cart.decrement(&ItemId::from(8)));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[test]
    fn integer_and_text_ids_are_distinct() {
        let mut cart = Cart::new();
        cart.add(&CartItem::new(1, 2.0));
        cart.add(&CartItem::new("1", 2.0));

        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn decrement_drops_zero_quantity_entry_without_underflow() {
        let mut empty = CartItem::new(1, 1.0);
        empty.quantity = 0;
        let mut cart = Cart { items: vec![empty] };

        assert!(cart.decrement(&ItemId::from(1)));
        assert!(cart.is_empty());
    }

    #[test]
    fn add_rejects_new_entry_with_non_finite_price() {
        let mut cart = Cart::new();
        cart.add(&CartItem::new("a", 2.0));

        assert!(!cart.add(&CartItem::new("nan", f64::NAN)));
        assert!(!cart.add(&CartItem::new("inf", f64::INFINITY)));
        assert_eq!(cart.len(), 1);

        // Merging ignores the incoming price, so an existing entry still counts up.
        assert!(cart.add(&CartItem::new("a", f64::NAN)));
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.items()[0].price, 2.0);
    }

    #[test]
    fn add_saturates_instead_of_overflowing() {
        let mut item = CartItem::new("bulk", 0.0);
        item.quantity = u32::MAX;
        let (mut cart, _) = Cart::from_items(vec![item.clone()]);

        cart.add(&item);
        assert_eq!(cart.items()[0].quantity, u32::MAX);
    }
}
