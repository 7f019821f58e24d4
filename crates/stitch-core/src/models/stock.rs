//! Inventory stock records and stock movement history.

use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// One stock line held in an inventory collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    /// Document id within its collection; empty before first insert
    #[serde(default)]
    pub id: String,

    /// Item kind, e.g. `Polo` or `Hoodie`
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub color: String,

    #[serde(default)]
    pub size: String,

    #[serde(default)]
    pub quantity: i64,

    #[serde(default)]
    pub unit_cost: f64,

    /// Units decremented over the record's lifetime
    #[serde(default)]
    pub exits: i64,
}

impl StockRecord {
    pub fn new(
        kind: impl Into<String>,
        color: impl Into<String>,
        size: impl Into<String>,
        quantity: i64,
    ) -> Self {
        Self {
            id: String::new(),
            kind: kind.into(),
            color: color.into(),
            size: size.into(),
            quantity,
            unit_cost: 0.0,
            exits: 0,
        }
    }

    /// Case-insensitive identity used for matching and CSV merges.
    pub fn key(&self) -> String {
        stock_key(&self.kind, &self.color, &self.size)
    }
}

pub(crate) fn stock_key(kind: &str, color: &str, size: &str) -> String {
    format!(
        "{}|{}|{}",
        kind.trim().to_lowercase(),
        color.trim().to_lowercase(),
        size.trim().to_lowercase()
    )
}

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Entry,
    Exit,
    Adjustment,
}

impl MovementKind {
    /// Label used in history exports.
    pub fn label(&self) -> &'static str {
        match self {
            MovementKind::Entry => "Entrada",
            MovementKind::Exit => "Salida",
            MovementKind::Adjustment => "Ajuste",
        }
    }
}

impl FromStr for MovementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entrada" | "entry" => Ok(MovementKind::Entry),
            "salida" | "exit" => Ok(MovementKind::Exit),
            "ajuste" | "adjustment" => Ok(MovementKind::Adjustment),
            _ => Err(format!("Invalid movement kind: {s}")),
        }
    }
}

/// One row of the stock adjustment history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockMovement {
    pub timestamp: Timestamp,
    pub user: String,
    pub action: MovementKind,
    pub detail: String,
    pub quantity: i64,
}

impl StockMovement {
    /// Standard detail text for a movement of one record.
    pub fn describe(record: &StockRecord, quantity: i64) -> String {
        format!(
            "{} - {} - Talla {} (Cant: {})",
            record.kind, record.color, record.size, quantity
        )
    }
}
