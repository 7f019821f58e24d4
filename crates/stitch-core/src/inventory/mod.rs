//! Inventory stock oracle.
//!
//! Answers "is there enough stock for this order's garments?" and performs
//! the guarded decrement when an order leaves preparation.
//!
//! - [`items`]: extracts consumable garments from an order
//! - [`oracle`]: sufficiency checks and decrement planning
//! - [`locks`]: per-record locks around check-then-decrement
//! - [`csv`]: stock and history import/export

use std::collections::HashMap;

use crate::models::StockRecord;

pub mod csv;
pub mod items;
pub mod locks;
pub mod oracle;

pub use items::{consumable_items, parse_size_detail};
pub use locks::RecordLocks;
pub use oracle::{check, plan_decrement, Decrement, Shortfall, StockVerdict};

/// Inventory consulted when a condition names none.
pub const DEFAULT_INVENTORY: &str = "inventory-garments";

/// Collection holding garment stock.
pub const GARMENT_STOCK: &str = "garmentStock";

/// Collection holding product stock.
pub const PRODUCT_STOCK: &str = "productStock";

/// Resolves a logical inventory reference to its stock collection.
///
/// Known kinds map to their fixed collections. Any other reference is
/// camel-cased on its hyphens, so `inventory-caps` reads `inventoryCaps`.
pub fn resolve_collection(inventory_ref: &str) -> String {
    match inventory_ref.trim() {
        "" | "inventory-garments" | "garments" | GARMENT_STOCK => GARMENT_STOCK.to_string(),
        "inventory-products" | "products" | PRODUCT_STOCK => PRODUCT_STOCK.to_string(),
        other => {
            let mut out = String::with_capacity(other.len());
            for (pos, word) in other.split('-').filter(|w| !w.is_empty()).enumerate() {
                if pos == 0 {
                    out.push_str(word);
                } else {
                    let mut chars = word.chars();
                    if let Some(first) = chars.next() {
                        out.extend(first.to_uppercase());
                        out.push_str(chars.as_str());
                    }
                }
            }
            out
        }
    }
}

/// Read access to stock collections during evaluation.
pub trait StockLookup {
    /// Records of a stock collection, or `None` when it is unknown.
    fn records(&self, collection: &str) -> Option<&[StockRecord]>;
}

/// Stock collections loaded ahead of an evaluation.
#[derive(Debug, Clone, Default)]
pub struct StockSnapshot {
    collections: HashMap<String, Vec<StockRecord>>,
}

impl StockSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: impl Into<String>, records: Vec<StockRecord>) {
        self.collections.insert(collection.into(), records);
    }

    pub fn with(mut self, collection: impl Into<String>, records: Vec<StockRecord>) -> Self {
        self.insert(collection, records);
        self
    }

    pub fn contains(&self, collection: &str) -> bool {
        self.collections.contains_key(collection)
    }
}

impl StockLookup for StockSnapshot {
    fn records(&self, collection: &str) -> Option<&[StockRecord]> {
        self.collections.get(collection).map(Vec::as_slice)
    }
}
