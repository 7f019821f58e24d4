//! Stage exit and entry conditions.
//!
//! A [`Condition`] is a declarative predicate over an order (plus stock
//! context for the stock kinds). Flows attach lists of them to stages; the
//! transition controller calls [`evaluate_all`] before letting an order
//! leave its stage and [`evaluate`] for entry auto-skips.
//!
//! Condition kinds are a closed set. Kinds written by a newer configuration
//! deserialize as [`ConditionKind::Unknown`] and always evaluate to true.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::inventory::{self, StockLookup, DEFAULT_INVENTORY};
use crate::models::{order::is_filled, Order, Stage};


/// What a condition checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionKind {
    AssigneeSet,
    LinkAdded,
    SizesAdded,
    CommentAdded,
    NoBalanceDue,
    StockAvailable,
    StockUnavailable,
    OperatorAssigned,
    CourierAssigned,
    StageStatusEquals,
    StockReduced,
    /// A kind this build does not know; kept verbatim
    Unknown(String),
}

impl ConditionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ConditionKind::AssigneeSet => "assignee_set",
            ConditionKind::LinkAdded => "link_added",
            ConditionKind::SizesAdded => "sizes_added",
            ConditionKind::CommentAdded => "comment_added",
            ConditionKind::NoBalanceDue => "no_balance_due",
            ConditionKind::StockAvailable => "stock_available",
            ConditionKind::StockUnavailable => "stock_unavailable",
            ConditionKind::OperatorAssigned => "operator_assigned",
            ConditionKind::CourierAssigned => "courier_assigned",
            ConditionKind::StageStatusEquals => "stage_status_equals",
            ConditionKind::StockReduced => "stock_reduced",
            ConditionKind::Unknown(kind) => kind,
        }
    }

    /// True for kinds that consult an inventory.
    pub fn reads_stock(&self) -> bool {
        matches!(
            self,
            ConditionKind::StockAvailable
                | ConditionKind::StockUnavailable
                | ConditionKind::StockReduced
        )
    }
}

impl From<String> for ConditionKind {
    fn from(kind: String) -> Self {
        match kind.trim() {
            "assignee_set" => ConditionKind::AssigneeSet,
            "link_added" => ConditionKind::LinkAdded,
            "sizes_added" => ConditionKind::SizesAdded,
            "comment_added" => ConditionKind::CommentAdded,
            "no_balance_due" => ConditionKind::NoBalanceDue,
            "stock_available" => ConditionKind::StockAvailable,
            "stock_unavailable" => ConditionKind::StockUnavailable,
            "operator_assigned" => ConditionKind::OperatorAssigned,
            "courier_assigned" => ConditionKind::CourierAssigned,
            "stage_status_equals" => ConditionKind::StageStatusEquals,
            "stock_reduced" => ConditionKind::StockReduced,
            _ => ConditionKind::Unknown(kind),
        }
    }
}

impl From<ConditionKind> for String {
    fn from(kind: ConditionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional knobs of a condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConditionParams {
    /// Logical inventory for the stock kinds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_ref: Option<String>,

    /// Stage whose record the predicate reads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,

    /// Redirect target of an auto-skip entry condition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_stage_id: Option<Stage>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub auto_skip: bool,

    /// Status compared by `stage_status_equals`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<String>,
}

impl ConditionParams {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn required_default() -> bool {
    true
}

/// A declarative predicate attached to a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,

    /// Only required conditions gate an exit
    #[serde(default = "required_default")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "ConditionParams::is_empty")]
    pub params: ConditionParams,
}

impl Condition {
    pub fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            required: true,
            params: ConditionParams::default(),
        }
    }

    pub fn on_stage(mut self, stage: Stage) -> Self {
        self.params.stage = Some(stage);
        self
    }

    pub fn with_inventory(mut self, inventory_ref: impl Into<String>) -> Self {
        self.params.inventory_ref = Some(inventory_ref.into());
        self
    }

    pub fn with_expected_status(mut self, status: impl Into<String>) -> Self {
        self.params.expected_status = Some(status.into());
        self
    }

    /// Turns this into an entry condition redirecting to `target` when it
    /// holds.
    pub fn auto_skip_to(mut self, target: Stage) -> Self {
        self.params.auto_skip = true;
        self.params.target_stage_id = Some(target);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Stage whose record this condition reads, if it names one.
    ///
    /// Auto-skip conditions use `targetStageId` as their redirect, so only
    /// plain conditions fall back to it.
    pub fn subject_stage(&self) -> Option<Stage> {
        self.params.stage.or(if self.params.auto_skip {
            None
        } else {
            self.params.target_stage_id
        })
    }

    /// Inventory reference, or the default one.
    pub fn inventory(&self) -> &str {
        self.params
            .inventory_ref
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(DEFAULT_INVENTORY)
    }

    /// Human-readable name reported when the condition is unmet.
    pub fn label(&self) -> String {
        match &self.kind {
            ConditionKind::AssigneeSet => "Diseñador Asignado".to_string(),
            ConditionKind::LinkAdded => "URL Agregado".to_string(),
            ConditionKind::SizesAdded => "Tallas Agregadas".to_string(),
            ConditionKind::CommentAdded => "Comentario".to_string(),
            ConditionKind::NoBalanceDue => "No Debe Nada".to_string(),
            ConditionKind::StockAvailable => "Hay Stock".to_string(),
            ConditionKind::StockUnavailable => "No Hay Stock".to_string(),
            ConditionKind::OperatorAssigned => "Operador Asignado".to_string(),
            ConditionKind::CourierAssigned => "Repartidor Asignado".to_string(),
            ConditionKind::StageStatusEquals => format!("Estado {}", self.expected_status()),
            ConditionKind::StockReduced => "Stock Reducido".to_string(),
            ConditionKind::Unknown(kind) => kind.clone(),
        }
    }

    fn expected_status(&self) -> &str {
        self.params
            .expected_status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("LISTO")
    }
}

/// Result of evaluating a condition list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    pub satisfied: bool,
    /// Labels of the unmet required conditions, in list order
    pub missing: Vec<String>,
}

/// Evaluates one condition against an order.
pub fn evaluate(condition: &Condition, order: &Order, stock: &dyn StockLookup) -> bool {
    let stage_record = |stage: Stage| order.record(stage);

    match &condition.kind {
        ConditionKind::AssigneeSet => {
            let stage = condition.subject_stage().unwrap_or(Stage::Design);
            stage_record(stage).is_some_and(|r| r.has_assignee())
        }
        ConditionKind::LinkAdded => {
            let stage = condition.subject_stage().unwrap_or(Stage::Design);
            stage_record(stage).is_some_and(|r| is_filled(r.link.as_deref()))
        }
        ConditionKind::SizesAdded => {
            !order.size_detail.trim().is_empty() || !order.garments.is_empty()
        }
        ConditionKind::CommentAdded => {
            let stage = condition.subject_stage().unwrap_or(Stage::Design);
            stage_record(stage).is_some_and(|r| is_filled(r.notes.as_deref()))
        }
        ConditionKind::NoBalanceDue => order.balance() <= 0.0,
        ConditionKind::StockAvailable | ConditionKind::StockReduced => {
            stock_verdict(condition, order, stock).is_sufficient()
        }
        ConditionKind::StockUnavailable => !stock_verdict(condition, order, stock).is_sufficient(),
        ConditionKind::OperatorAssigned => match condition.subject_stage() {
            Some(stage) => stage_record(stage).is_some_and(|r| r.has_assignee()),
            None => Stage::OPERATOR_STAGES
                .iter()
                .any(|stage| stage_record(*stage).is_some_and(|r| r.has_assignee())),
        },
        ConditionKind::CourierAssigned => {
            stage_record(Stage::Delivery).is_some_and(|r| r.has_assignee())
        }
        ConditionKind::StageStatusEquals => {
            let stage = condition.subject_stage().unwrap_or(Stage::Preparation);
            let expected = condition.expected_status().trim().to_uppercase();
            stage_record(stage)
                .and_then(|r| r.status.as_deref())
                .is_some_and(|status| status.trim().to_uppercase() == expected)
        }
        ConditionKind::Unknown(kind) => {
            log::debug!("Condition kind '{kind}' is unknown; treating as satisfied");
            true
        }
    }
}

fn stock_verdict(condition: &Condition, order: &Order, stock: &dyn StockLookup) -> inventory::StockVerdict {
    let collection = inventory::resolve_collection(condition.inventory());
    let items = inventory::consumable_items(order);
    inventory::check(&collection, &items, stock.records(&collection))
}

/// Evaluates a condition list. Optional conditions never block; an empty
/// list is satisfied.
pub fn evaluate_all(conditions: &[Condition], order: &Order, stock: &dyn StockLookup) -> Evaluation {
    let missing: Vec<String> = conditions
        .iter()
        .filter(|c| c.required && !evaluate(c, order, stock))
        .map(Condition::label)
        .collect();
    Evaluation {
        satisfied: missing.is_empty(),
        missing,
    }
}

/// Exit conditions applied when a stage has none configured.
pub fn builtin_exit_conditions(stage: Stage) -> Vec<Condition> {
    match stage {
        Stage::Design => vec![
            Condition::new(ConditionKind::LinkAdded),
            Condition::new(ConditionKind::SizesAdded),
        ],
        Stage::Billing => vec![Condition::new(ConditionKind::NoBalanceDue)],
        Stage::Preparation | Stage::Stamping | Stage::Packaging => {
            vec![Condition::new(ConditionKind::OperatorAssigned).on_stage(stage)]
        }
        Stage::Delivery => vec![Condition::new(ConditionKind::CourierAssigned)],
        Stage::Finalized | Stage::Cancelled => Vec::new(),
    }
}
