//! Stock sufficiency checks and decrement planning.

use serde::{Deserialize, Serialize};

use crate::models::{Garment, StockRecord};

/// Why an order's garments cannot be served from stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Shortfall {
    /// The inventory collection holds no records (or does not exist)
    InventoryEmpty { inventory: String },
    /// Neither a garment list nor a parseable size detail was found
    NoItemsParsed,
    NotFound { item: Garment },
    Insufficient {
        item: Garment,
        requested: i64,
        available: i64,
    },
}

/// Outcome of a sufficiency check.
#[derive(Debug, Clone, PartialEq)]
pub enum StockVerdict {
    Sufficient,
    Short(Shortfall),
}

impl StockVerdict {
    pub fn is_sufficient(&self) -> bool {
        matches!(self, StockVerdict::Sufficient)
    }

    pub fn shortfall(&self) -> Option<&Shortfall> {
        match self {
            StockVerdict::Sufficient => None,
            StockVerdict::Short(shortfall) => Some(shortfall),
        }
    }
}

/// One planned change to a stock record.
#[derive(Debug, Clone, PartialEq)]
pub struct Decrement {
    pub record: StockRecord,
    pub quantity: i64,
}

impl Decrement {
    /// The record as it reads after the decrement.
    pub fn applied(&self) -> StockRecord {
        StockRecord {
            quantity: self.record.quantity - self.quantity,
            exits: self.record.exits + self.quantity,
            ..self.record.clone()
        }
    }
}

/// Checks whether `records` cover every item.
///
/// `items` must already be aggregated per key. Missing or empty inventory
/// is reported as a shortfall, never as sufficient.
pub fn check(inventory: &str, items: &[Garment], records: Option<&[StockRecord]>) -> StockVerdict {
    match plan_decrement(inventory, items, records) {
        Ok(_) => StockVerdict::Sufficient,
        Err(shortfall) => StockVerdict::Short(shortfall),
    }
}

/// Plans the decrements serving `items`, or the first shortfall found.
pub fn plan_decrement(
    inventory: &str,
    items: &[Garment],
    records: Option<&[StockRecord]>,
) -> Result<Vec<Decrement>, Shortfall> {
    let records = match records {
        Some(records) if !records.is_empty() => records,
        _ => {
            return Err(Shortfall::InventoryEmpty {
                inventory: inventory.to_string(),
            })
        }
    };
    if items.is_empty() {
        return Err(Shortfall::NoItemsParsed);
    }

    let mut plan = Vec::with_capacity(items.len());
    for item in items {
        let key = crate::models::stock::stock_key(&item.kind, &item.color, &item.size);
        let record = records
            .iter()
            .find(|r| r.key() == key)
            .ok_or_else(|| Shortfall::NotFound { item: item.clone() })?;
        let requested = i64::from(item.quantity);
        if record.quantity < requested {
            return Err(Shortfall::Insufficient {
                item: item.clone(),
                requested,
                available: record.quantity,
            });
        }
        plan.push(Decrement {
            record: record.clone(),
            quantity: requested,
        });
    }
    Ok(plan)
}
