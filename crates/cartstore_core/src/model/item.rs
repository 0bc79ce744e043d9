//! Cart line item model.
//!
//! # Responsibility
//! - Define the record stored per distinct product in the cart.
//! - Keep caller-provided descriptive fields opaque but lossless.
//!
//! # Invariants
//! - `id` is the only identity used for merge/lookup.
//! - A stored item always has `quantity >= 1`; the cart drops it otherwise.
//! - `attributes` never shadows `id`, `price` or `quantity`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// Field names owned by [`CartItem`] itself; never stored in `attributes`.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "price", "quantity"];

/// Stable product identifier.
///
/// Callers may key products by number or by string. The two spaces are
/// disjoint: `ItemId::Int(1)` and `ItemId::Text("1")` are different items,
/// and the persisted JSON keeps the original shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Text(String),
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One distinct product entry in the cart.
///
/// Serialized as a flat JSON object: known fields plus every opaque
/// attribute (`name`, `image`, ...) side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ItemId,
    /// Unit price supplied by the caller. Only finiteness is checked, by the cart.
    pub price: f64,
    pub quantity: u32,
    /// Descriptive fields passed through without interpretation.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl CartItem {
    /// Creates an item with `quantity = 1` and no attributes.
    pub fn new(id: impl Into<ItemId>, price: f64) -> Self {
        Self {
            id: id.into(),
            price,
            quantity: 1,
            attributes: Map::new(),
        }
    }

    /// Adds one opaque attribute.
    ///
    /// Keys listed in [`RESERVED_FIELDS`] are ignored so the flattened wire
    /// shape never carries duplicate keys.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !is_reserved_field(&key) {
            self.attributes.insert(key, value.into());
        }
        self
    }

    /// Returns an attribute value by name.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Whether `price` can be persisted; JSON has no NaN or infinity.
    pub fn has_finite_price(&self) -> bool {
        self.price.is_finite()
    }

    /// `price * quantity` for this entry.
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

fn is_reserved_field(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}
