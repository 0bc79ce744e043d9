//! Cart domain model.
//!
//! # Responsibility
//! - Define line items, the cart aggregate and the notification signal.
//! - Keep all cart rules free of storage and presentation concerns.
//!
//! # Invariants
//! - Every line item is identified by a stable `ItemId`.
//! - Removal is physical: an item leaving the cart leaves no tombstone.

pub mod cart;
pub mod item;
pub mod notification;
