//! Parameter structures for pipeline operations
//!
//! These structures are shared by every interface (the CLI today) and carry
//! no framework-specific derives. Interface layers build them from their own
//! argument types and pass them to [`crate::Pipeline`] methods.
//!
//! Raw values arrive as strings; the pipeline coerces them using the value
//! type of the field they target.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::conditions::Condition;
use crate::fields::ColumnConfig;
use crate::models::{Actor, LineItem, Stage};

/// Generic parameters for operations requiring just an order ID.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Id {
    pub id: String,
}

/// Parameters for registering a new order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder {
    /// Flow governing the order; the default flow when absent
    #[serde(default)]
    pub flow_id: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    /// Free-text garment detail, e.g. `Polo Negro (M)`
    #[serde(default)]
    pub size_detail: Option<String>,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub advance: f64,
    /// Raw `(field id or path, value)` pairs coerced through the registry
    #[serde(default)]
    pub values: Vec<(String, String)>,
    #[serde(default)]
    pub actor: Option<Actor>,
}

/// Parameters for listing orders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrders {
    /// Only orders currently in this stage
    pub stage: Option<Stage>,
    /// Whether finalized and cancelled orders are included
    #[serde(default)]
    pub include_closed: bool,
}

/// Parameters for a direct field edit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetField {
    pub id: String,
    /// Field id or field path
    pub field: String,
    /// Raw value, coerced using the field's value type
    pub value: String,
    #[serde(default)]
    pub actor: Option<Actor>,
}

/// Parameters for advancing an order out of its stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceOrder {
    pub id: String,
    /// Stage the caller believes the order is in
    pub from: Stage,
    #[serde(default)]
    pub actor: Option<Actor>,
}

/// Parameters for cancelling an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelOrder {
    pub id: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub actor: Option<Actor>,
}

/// Parameters for mapping spreadsheet headers onto fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapHeaders {
    pub headers: Vec<String>,
    /// Manual `header → field path or id` choices
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

/// Parameters for importing one spreadsheet row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportRow {
    pub headers: Vec<String>,
    pub values: Vec<String>,
    #[serde(default)]
    pub overrides: HashMap<String, String>,
    #[serde(default)]
    pub actor: Option<Actor>,
}

/// Parameters for a stock CSV import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportStock {
    /// Logical inventory reference; the default inventory when absent
    #[serde(default)]
    pub inventory: Option<String>,
    pub csv: String,
    #[serde(default)]
    pub actor: Option<Actor>,
}

/// Parameters for replacing a stage's conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetConditions {
    #[serde(default)]
    pub flow_id: Option<String>,
    pub stage: Stage,
    pub exit_conditions: Vec<Condition>,
    /// Entry conditions are left untouched when absent
    #[serde(default)]
    pub entry_conditions: Option<Vec<Condition>>,
}

/// Parameters for saving a stage's column layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetColumns {
    pub stage: Stage,
    pub config: ColumnConfig,
}
