//! Pure transition planning.
//!
//! [`plan_advance`] and [`plan_cancel`] read an order snapshot together with
//! the configuration and stock they need and return the [`Patch`] that moves
//! the order. They never write; the async operations in this module's parent
//! commit what they plan.

use std::collections::BTreeSet;

use jiff::Timestamp;

use crate::conditions::{evaluate, evaluate_all};
use crate::config::Configuration;
use crate::error::{PipelineError, Result};
use crate::fields::formula::hours_between;
use crate::flows::Flow;
use crate::inventory::{self, StockLookup, StockVerdict};
use crate::models::{
    Actor, ChangeLogEntry, Garment, Order, Stage, StockHold, PAUSED_LABEL, READY_LABEL,
};
use crate::store::{Patch, PatchOp};

/// Inputs shared by every planning call.
pub struct TransitionContext<'a> {
    pub config: &'a Configuration,
    pub stock: &'a dyn StockLookup,
    pub actor: &'a Actor,
    pub now: Timestamp,
}

/// Stock an exit has to draw before it may commit.
#[derive(Debug, Clone, PartialEq)]
pub struct StockDraw {
    /// Physical stock collection
    pub collection: String,
    pub items: Vec<Garment>,
}

/// A transition whose exit conditions hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: Stage,
    pub to: Stage,
    /// Where the flow led before entry auto-skips redirected the order
    pub nominal: Stage,
    pub stage_label: String,
    pub hold: Option<StockHold>,
    /// Set when leaving preparation
    pub draw: Option<StockDraw>,
    pub entry: ChangeLogEntry,
    pub patch: Patch,
}

impl Transition {
    pub fn auto_skipped(&self) -> bool {
        self.to != self.nominal
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionPlan {
    /// Required exit conditions are unmet; nothing may change
    Rejected { missing: Vec<String> },
    Move(Box<Transition>),
}

/// Plans moving `order` out of its current stage.
///
/// # Errors
///
/// Returns `PipelineError::InvalidTransition` for a closed order and
/// `PipelineError::Configuration` when the order's flow does not exist.
pub fn plan_advance(order: &Order, ctx: &TransitionContext<'_>) -> Result<TransitionPlan> {
    let from = order.stage;
    if from.is_terminal() {
        return Err(closed(order));
    }
    let flow = ctx.config.flows.require(&order.flow_id)?;

    let evaluation = evaluate_all(&flow.exit_conditions(from), order, ctx.stock);
    if !evaluation.satisfied {
        log::debug!(
            "Order {} stays in {}: missing {:?}",
            order.id,
            from.as_str(),
            evaluation.missing
        );
        return Ok(TransitionPlan::Rejected {
            missing: evaluation.missing,
        });
    }

    let nominal = next_stage(flow, order);
    let to = follow_auto_skips(flow, order, nominal, ctx.stock);

    let (stage_label, hold) = if to == Stage::Preparation {
        let hold = preparation_hold(flow, order, ctx.stock, ctx.now);
        if let Some(hold) = &hold {
            log::info!("Order {} paused for stock: {}", order.id, hold.reason);
        }
        (preparation_label(hold.as_ref()).to_string(), hold)
    } else {
        (to.label().to_string(), None)
    };

    let draw = (from == Stage::Preparation).then(|| StockDraw {
        collection: inventory::resolve_collection(flow.preparation_inventory()),
        items: inventory::consumable_items(order),
    });

    let mut patch = exit_patch(order, ctx.now);
    if let Some(status) = from.exit_status() {
        patch.push_set(format!("stageRecord.{}.status", from.as_str()), status);
    }
    patch.push_set("stage", to.as_str());
    patch.push_set("stageLabel", stage_label.clone());
    match &hold {
        Some(hold) => patch.push_set("hold", serde_json::to_value(hold)?),
        None if order.hold.is_some() => patch.push(PatchOp::Remove {
            path: "hold".to_string(),
        }),
        None => {}
    }
    patch.push_set(
        format!("stageRecord.{}.enteredAt", to.as_str()),
        ctx.now.to_string(),
    );
    if to == Stage::Finalized {
        patch.push_set("finalizedAt", ctx.now.to_string());
    }
    patch.push_set("updatedAt", ctx.now.to_string());

    let detail = if to == nominal {
        format!("{} → {} por {}", order.stage_label, stage_label, ctx.actor.label)
    } else {
        format!(
            "{} → {} por {} (salto automático desde {})",
            order.stage_label,
            stage_label,
            ctx.actor.label,
            nominal.label()
        )
    };
    let entry = ChangeLogEntry::new(ctx.now, ctx.actor, from.exit_action(), detail);
    patch.push(PatchOp::Append {
        path: "changeLog".to_string(),
        value: serde_json::to_value(&entry)?,
    });

    Ok(TransitionPlan::Move(Box::new(Transition {
        from,
        to,
        nominal,
        stage_label,
        hold,
        draw,
        entry,
        patch,
    })))
}

/// Plans moving `order` to the cancelled stage.
///
/// # Errors
///
/// Returns `PipelineError::InvalidTransition` when the order is already
/// finalized or cancelled.
pub fn plan_cancel(
    order: &Order,
    reason: Option<&str>,
    actor: &Actor,
    now: Timestamp,
) -> Result<Patch> {
    if order.is_closed() {
        return Err(closed(order));
    }
    let cancelled = Stage::Cancelled;
    let mut patch = exit_patch(order, now);
    patch.push_set("stage", cancelled.as_str());
    patch.push_set("stageLabel", cancelled.label());
    if order.hold.is_some() {
        patch.push(PatchOp::Remove {
            path: "hold".to_string(),
        });
    }
    patch.push_set(
        format!("stageRecord.{}.enteredAt", cancelled.as_str()),
        now.to_string(),
    );
    patch.push_set("updatedAt", now.to_string());

    let mut detail = format!("{} → {} por {}", order.stage_label, cancelled.label(), actor.label);
    if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
        detail = format!("{detail}: {reason}");
    }
    let entry = ChangeLogEntry::new(now, actor, "Pedido Anulado", detail);
    patch.push(PatchOp::Append {
        path: "changeLog".to_string(),
        value: serde_json::to_value(&entry)?,
    });
    Ok(patch)
}

/// Applies a patch to an order snapshot.
///
/// # Errors
///
/// Returns `PipelineError::Serialization` if the patched document no longer
/// reads as an order.
pub fn apply(order: &Order, patch: &Patch) -> Result<Order> {
    let mut doc = serde_json::to_value(order)?;
    patch.apply(&mut doc)?;
    Ok(serde_json::from_value(doc)?)
}

fn closed(order: &Order) -> PipelineError {
    PipelineError::InvalidTransition {
        id: order.id.clone(),
        stage: order.stage,
        reason: "the order is already closed".to_string(),
    }
}

/// Stamps the exit of the current stage and its elapsed hours.
fn exit_patch(order: &Order, now: Timestamp) -> Patch {
    let stage = order.stage;
    let entered = order.record(stage).and_then(|r| r.entered_at).unwrap_or(now);
    let hours = hours_between(entered, now.max(entered));
    let mut elapsed = order.elapsed.clone();
    elapsed.record(stage, hours);

    let mut patch = Patch::new();
    patch.push_set(
        format!("stageRecord.{}.exitedAt", stage.as_str()),
        now.to_string(),
    );
    patch.push_set(format!("elapsed.{}", stage.as_str()), hours);
    patch.push_set("elapsed.total", elapsed.total);
    patch
}

/// Stage the flow leads to. Design skips billing when nothing is owed.
fn next_stage(flow: &Flow, order: &Order) -> Stage {
    let next = flow.next_after(order.stage).unwrap_or(Stage::Finalized);
    if order.stage == Stage::Design && next == Stage::Billing && order.balance() <= 0.0 {
        return flow.next_after(Stage::Billing).unwrap_or(Stage::Finalized);
    }
    next
}

/// Follows entry auto-skips from `nominal`, never revisiting a stage.
fn follow_auto_skips(flow: &Flow, order: &Order, nominal: Stage, stock: &dyn StockLookup) -> Stage {
    let mut visited = BTreeSet::from([order.stage, nominal]);
    let mut target = nominal;
    while !target.is_terminal() {
        let Some(redirect) = auto_skip_target(flow, target, order, stock) else {
            break;
        };
        if !flow.contains(redirect) {
            log::warn!(
                "Auto-skip from {} targets {}, which flow '{}' does not contain; ignoring",
                target.as_str(),
                redirect.as_str(),
                flow.id
            );
            break;
        }
        if flow.bypasses_preparation(target, redirect) {
            log::warn!(
                "Auto-skip from {} to {} would bypass preparation; ignoring",
                target.as_str(),
                redirect.as_str()
            );
            break;
        }
        if !visited.insert(redirect) {
            log::warn!(
                "Auto-skip from {} back to {} would loop; stopping",
                target.as_str(),
                redirect.as_str()
            );
            break;
        }
        log::debug!(
            "Order {} skips {} for {}",
            order.id,
            target.as_str(),
            redirect.as_str()
        );
        target = redirect;
    }
    target
}

fn auto_skip_target(flow: &Flow, stage: Stage, order: &Order, stock: &dyn StockLookup) -> Option<Stage> {
    flow.stage(stage)?
        .entry_conditions
        .iter()
        .filter(|c| c.params.auto_skip)
        .find(|c| evaluate(c, order, stock))
        .and_then(|c| c.params.target_stage_id)
}

/// Ready-or-paused verdict for entering preparation.
pub fn preparation_hold(
    flow: &Flow,
    order: &Order,
    stock: &dyn StockLookup,
    now: Timestamp,
) -> Option<StockHold> {
    let collection = inventory::resolve_collection(flow.preparation_inventory());
    let items = inventory::consumable_items(order);
    match inventory::check(&collection, &items, stock.records(&collection)) {
        StockVerdict::Sufficient => None,
        StockVerdict::Short(shortfall) => Some(StockHold {
            since: now,
            inventory: collection,
            reason: shortfall.to_string(),
        }),
    }
}

/// Label stored for a preparation order with or without a hold.
pub fn preparation_label(hold: Option<&StockHold>) -> &'static str {
    if hold.is_some() {
        PAUSED_LABEL
    } else {
        READY_LABEL
    }
}
