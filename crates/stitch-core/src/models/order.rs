//! Order model definition and its sub-documents.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ChangeLogEntry, Stage};

/// Flow assigned to orders created without an explicit one.
pub const DEFAULT_FLOW_ID: &str = "orders";

fn default_flow_id() -> String {
    DEFAULT_FLOW_ID.to_string()
}

/// A custom-apparel order moving through the pipeline.
///
/// Orders are stored as JSON documents and addressed by field paths such as
/// `stageRecord.design.link` or `lineItems[2].product`. Fields defined at
/// runtime by the field registry that have no typed home here land in
/// [`Order::extra`] at the top level of the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Stable identifier, a zero-padded sequence number for created orders
    pub id: String,

    /// Flow whose stage definitions govern this order
    #[serde(default = "default_flow_id")]
    pub flow_id: String,

    /// Current pipeline stage; exactly one at a time
    pub stage: Stage,

    /// Human status string for the current stage
    pub stage_label: String,

    /// Set while a preparation order waits for stock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold: Option<StockHold>,

    /// Per-stage sub-documents
    #[serde(default)]
    pub stage_record: BTreeMap<Stage, StageRecord>,

    /// Hours spent per exited stage
    #[serde(default)]
    pub elapsed: Elapsed,

    /// Sold products
    #[serde(default)]
    pub line_items: Vec<LineItem>,

    /// Structured consumable garments; when empty the size detail is parsed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub garments: Vec<Garment>,

    /// Free-text size/detail field, e.g. `Polo Negro (M) - Polo Blanco (L)`
    #[serde(default)]
    pub size_detail: String,

    #[serde(default)]
    pub amounts: Amounts,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,

    /// Append-only audit trail
    #[serde(default)]
    pub change_log: Vec<ChangeLogEntry>,

    pub created_at: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<Timestamp>,

    /// True for orders built from an imported spreadsheet row
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub imported: bool,

    /// Registry-defined fields without a typed home (client data, channel...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Order {
    /// Creates a fresh order sitting in the design stage.
    pub fn new(id: impl Into<String>, now: Timestamp) -> Self {
        let mut stage_record = BTreeMap::new();
        stage_record.insert(
            Stage::Design,
            StageRecord {
                entered_at: Some(now),
                ..StageRecord::default()
            },
        );
        Self {
            id: id.into(),
            flow_id: default_flow_id(),
            stage: Stage::Design,
            stage_label: Stage::Design.label().to_string(),
            hold: None,
            stage_record,
            elapsed: Elapsed::default(),
            line_items: Vec::new(),
            garments: Vec::new(),
            size_detail: String::new(),
            amounts: Amounts::default(),
            comments: Vec::new(),
            change_log: Vec::new(),
            created_at: now,
            updated_at: None,
            finalized_at: None,
            imported: false,
            extra: Map::new(),
        }
    }

    /// Record of the given stage, if the order ever carried one.
    pub fn record(&self, stage: Stage) -> Option<&StageRecord> {
        self.stage_record.get(&stage)
    }

    /// Sum of the stage payments recorded during billing.
    pub fn stage_payments(&self) -> f64 {
        self.record(Stage::Billing)
            .map(|r| r.pay1.unwrap_or(0.0) + r.pay2.unwrap_or(0.0))
            .unwrap_or(0.0)
    }

    /// Outstanding balance; may be negative when overpaid.
    pub fn balance(&self) -> f64 {
        self.amounts.total - self.amounts.advance - self.stage_payments()
    }

    /// Recomputes `amounts.pending` from total, advance and stage payments.
    pub fn recompute_pending(&mut self) {
        self.amounts.pending = self.balance().max(0.0);
    }

    /// True once the order sits in a terminal stage.
    pub fn is_closed(&self) -> bool {
        self.stage.is_terminal()
    }
}

/// Per-stage sub-document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StageRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entered_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exited_at: Option<Timestamp>,

    /// Reference of the worker in charge (designer, operator or courier)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_name: Option<String>,

    /// Stage-local status such as `PENDIENTE`, `EN PROCESO` or `LISTO`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Design image or mockup URLs, one per line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay1: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay2: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StageRecord {
    /// True when either the assignee reference or its display name is set.
    pub fn has_assignee(&self) -> bool {
        is_filled(self.assignee.as_deref()) || is_filled(self.assignee_name.as_deref())
    }
}

/// Hours spent in each stage plus their running total.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Elapsed {
    #[serde(flatten)]
    pub stages: BTreeMap<Stage, f64>,

    #[serde(default)]
    pub total: f64,
}

impl Elapsed {
    /// Records the hours for a stage and refreshes the total.
    pub fn record(&mut self, stage: Stage, hours: f64) {
        self.stages.insert(stage, hours);
        self.total = self.stages.values().sum();
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Amounts {
    pub total: f64,
    pub advance: f64,
    /// Derived: `max(0, total - advance - stage payments)`
    pub pending: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default, alias = "productRef")]
    pub product: String,

    #[serde(default = "one")]
    pub quantity: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "variantRef")]
    pub variant: Option<String>,
}

impl LineItem {
    pub fn new(product: impl Into<String>, quantity: u32) -> Self {
        Self {
            product: product.into(),
            quantity,
            unit_price: None,
            variant: None,
        }
    }
}

/// A consumable garment drawn from stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Garment {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub size: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

impl Garment {
    pub fn new(
        kind: impl Into<String>,
        color: impl Into<String>,
        size: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            kind: kind.into(),
            color: color.into(),
            size: size.into(),
            quantity,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Comment {
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub text: String,
}

/// Marks a preparation order that is waiting for stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockHold {
    pub since: Timestamp,
    /// Inventory collection that was consulted
    pub inventory: String,
    /// Human description of the shortfall
    pub reason: String,
}

fn one() -> u32 {
    1
}

pub(crate) fn is_filled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}
