//! Stage transitions for the Pipeline.

use std::sync::Arc;

use jiff::Timestamp;
use serde_json::Value;

use super::{order_key, read_order, stock_snapshot, AdvanceOutcome, Pipeline, StockDraw, Transition, TransitionContext, TransitionPlan};
use crate::error::{PipelineError, Result};
use crate::inventory::{plan_decrement, Decrement, RecordLocks, Shortfall};
use crate::models::{stock::stock_key, Actor, MovementKind, Order, StockMovement, StockRecord};
use crate::params::AdvanceOrder;
use crate::store::{self, DocumentStore, Patch, ORDERS, STOCK_HISTORY};

impl Pipeline {
    /// Moves an order out of its current stage.
    ///
    /// Pending writes are committed first, so the exit conditions see the
    /// latest values. Unmet conditions and stock conflicts are reported as
    /// outcomes and leave the order untouched. The order stays locked from
    /// the stage check until it is written, so concurrent advances of the
    /// same order commit at most once.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::StageMismatch` when the order is no longer in
    /// `params.from`, `PipelineError::InvalidTransition` when it is closed and
    /// store errors unchanged.
    pub async fn advance(&self, params: &AdvanceOrder) -> Result<AdvanceOutcome> {
        self.flush(&params.id).await?;
        let config = self.configuration();
        let locks = Arc::clone(&self.locks);
        let params = params.clone();

        self.blocking(move |store| {
            let _order_guard = locks.acquire([order_key(&params.id)]);
            let order = read_order(store, &params.id)?;
            if order.stage != params.from {
                return Err(PipelineError::StageMismatch {
                    id: order.id,
                    expected: params.from,
                    actual: order.stage,
                });
            }

            let stock = stock_snapshot(store, &config)?;
            let actor = Actor::or_system(params.actor.as_ref());
            let ctx = TransitionContext {
                config: &config,
                stock: &stock,
                actor: &actor,
                now: Timestamp::now(),
            };
            match super::plan_advance(&order, &ctx)? {
                TransitionPlan::Rejected { missing } => Ok(AdvanceOutcome::Rejected { missing }),
                TransitionPlan::Move(transition) => commit(store, &locks, &order, &actor, *transition),
            }
        })
        .await
    }
}

fn commit(
    store: &dyn DocumentStore,
    locks: &RecordLocks,
    order: &Order,
    actor: &Actor,
    transition: Transition,
) -> Result<AdvanceOutcome> {
    let Transition {
        from, to, draw, patch, ..
    } = transition;

    let doc = match draw {
        None => store.update(ORDERS, &order.id, &patch)?,
        Some(draw) => match draw_and_commit(store, locks, order, actor, &draw, &patch)? {
            Ok(doc) => doc,
            Err(shortfall) => {
                log::warn!("Order {} cannot leave preparation: {shortfall}", order.id);
                return Ok(AdvanceOutcome::StockConflict { shortfall });
            }
        },
    };

    log::info!(
        "Order {} advanced from {} to {}",
        order.id,
        from.as_str(),
        to.as_str()
    );
    Ok(AdvanceOutcome::Advanced {
        order: Box::new(serde_json::from_value(doc)?),
        from,
        to,
    })
}

/// Decrements stock and moves the order as one guarded sequence.
///
/// The touched records stay locked from the re-read until the order is
/// written. A store failure part-way restores every record already written.
fn draw_and_commit(
    store: &dyn DocumentStore,
    locks: &RecordLocks,
    order: &Order,
    actor: &Actor,
    draw: &StockDraw,
    patch: &Patch,
) -> Result<std::result::Result<Value, Shortfall>> {
    let keys = draw
        .items
        .iter()
        .map(|item| format!("{}/{}", draw.collection, stock_key(&item.kind, &item.color, &item.size)));
    let _guard = locks.acquire(keys);

    let records: Vec<StockRecord> = store::load_all(store, &draw.collection)?;
    let decrements = match plan_decrement(&draw.collection, &draw.items, Some(records.as_slice())) {
        Ok(decrements) => decrements,
        Err(shortfall) => return Ok(Err(shortfall)),
    };

    let mut written: Vec<&Decrement> = Vec::with_capacity(decrements.len());
    for decrement in &decrements {
        if let Err(e) = write_record(store, &draw.collection, &decrement.applied()) {
            restore(store, &draw.collection, &written);
            return Err(e);
        }
        written.push(decrement);
    }

    let doc = match store.update(ORDERS, &order.id, patch) {
        Ok(doc) => doc,
        Err(e) => {
            restore(store, &draw.collection, &written);
            return Err(e);
        }
    };

    let now = Timestamp::now();
    for decrement in &decrements {
        let movement = StockMovement {
            timestamp: now,
            user: actor.label.clone(),
            action: MovementKind::Exit,
            detail: format!(
                "{} - Pedido {}",
                StockMovement::describe(&decrement.record, decrement.quantity),
                order.id
            ),
            quantity: decrement.quantity,
        };
        if let Err(e) = serde_json::to_value(&movement)
            .map_err(PipelineError::from)
            .and_then(|doc| store.add(STOCK_HISTORY, doc))
        {
            log::warn!("Could not record stock exit for order {}: {e}", order.id);
        }
    }
    Ok(Ok(doc))
}

fn write_record(store: &dyn DocumentStore, collection: &str, record: &StockRecord) -> Result<()> {
    store.set(collection, &record.id, serde_json::to_value(record)?)
}

fn restore(store: &dyn DocumentStore, collection: &str, written: &[&Decrement]) {
    for decrement in written {
        if let Err(e) = write_record(store, collection, &decrement.record) {
            log::error!(
                "Could not restore stock record {} in {collection}: {e}",
                decrement.record.id
            );
        }
    }
}
