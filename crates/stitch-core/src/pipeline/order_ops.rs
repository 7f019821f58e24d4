//! Order operations for the Pipeline.

use jiff::Timestamp;

use std::sync::Arc;

use super::{order_key, read_order, transition, with_pending, Pipeline};
use crate::error::{PipelineError, Result};
use crate::fields::{coerce_for_path, format_value_in, FieldDefinition, FieldRegistry};
use crate::models::{Actor, ChangeLogEntry, Order, DEFAULT_FLOW_ID};
use crate::params::{CancelOrder, CreateOrder, Id, ListOrders, SetField};
use crate::path;
use crate::store::{self, DocumentStore, Patch, PatchOp, ORDERS};

/// Paths only the pipeline itself may write.
const PROTECTED_PATHS: [&str; 3] = ["id", "stage", "stageLabel"];

impl Pipeline {
    /// Registers a new order in the design stage under a fresh sequence id.
    ///
    /// Raw `values` are coerced through the field registry before the order
    /// is stored, and `amounts.pending` is derived from the final amounts.
    pub async fn create_order(&self, params: &CreateOrder) -> Result<Order> {
        let config = self.configuration();
        let tz = self.tz.clone();
        let params = params.clone();

        self.blocking(move |store| {
            let flow_id = params.flow_id.unwrap_or_else(|| DEFAULT_FLOW_ID.to_string());
            config.flows.require(&flow_id)?;

            let now = Timestamp::now();
            let actor = Actor::or_system(params.actor.as_ref());
            let mut order = Order::new(String::new(), now);
            order.flow_id = flow_id;
            order.line_items = params.line_items;
            order.size_detail = params.size_detail.unwrap_or_default();
            order.amounts.total = params.total;
            order.amounts.advance = params.advance;

            let mut doc = serde_json::to_value(&order)?;
            for (key, raw) in &params.values {
                let field = editable_field(&config.fields, key)?;
                path::set(&mut doc, &field.path, coerce_for_path(&field.path, raw, field.value_type, &tz))?;
            }
            let mut order: Order = serde_json::from_value(doc)?;
            order.recompute_pending();
            order.change_log.push(ChangeLogEntry::new(
                now,
                &actor,
                "Pedido Creado",
                format!("Pedido registrado por {}", actor.label),
            ));

            let id = store.add(ORDERS, serde_json::to_value(&order)?)?;
            log::info!("Created order {id}");
            read_order(store, &id)
        })
        .await
    }

    /// Retrieves an order by its ID after committing its pending writes.
    pub async fn get_order(&self, params: &Id) -> Result<Option<Order>> {
        self.flush(&params.id).await?;
        let id = params.id.clone();
        self.blocking(move |store| store::load(store, ORDERS, &id)).await
    }

    /// Lists orders, open ones only unless closed ones are requested.
    pub async fn list_orders(&self, params: &ListOrders) -> Result<Vec<Order>> {
        self.flush_all().await?;
        let params = params.clone();
        self.blocking(move |store| {
            let orders: Vec<Order> = store::load_all(store, ORDERS)?;
            Ok(orders
                .into_iter()
                .filter(|o| params.include_closed || !o.is_closed())
                .filter(|o| params.stage.map_or(true, |stage| o.stage == stage))
                .collect())
        })
        .await
    }

    /// Edits one field of an order without changing its stage.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidInput` for unknown or non-editable
    /// fields and `PipelineError::OrderNotFound` for unknown orders.
    pub async fn set_field(&self, params: &SetField) -> Result<Order> {
        self.flush(&params.id).await?;
        let config = self.configuration();
        let tz = self.tz.clone();
        let params = params.clone();

        self.blocking(move |store| {
            let field = editable_field(&config.fields, &params.field)?;
            let order = read_order(store, &params.id)?;
            let value = coerce_for_path(&field.path, &params.value, field.value_type, &tz);

            let doc = serde_json::to_value(&order)?;
            let old = format_value_in(field, path::get(&doc, &field.path), &tz);
            let new = format_value_in(field, Some(&value), &tz);

            let now = Timestamp::now();
            let actor = Actor::or_system(params.actor.as_ref());
            let patch = Patch::new()
                .set(field.path.clone(), value)
                .set("updatedAt", now.to_string());
            let mut patch = with_pending(&order, patch)?;
            let entry = ChangeLogEntry::new(
                now,
                &actor,
                "Campo Actualizado",
                format!("{}: {old} → {new}", field.label),
            );
            patch.push(PatchOp::Append {
                path: "changeLog".to_string(),
                value: serde_json::to_value(&entry)?,
            });

            let doc = store.update(ORDERS, &order.id, &patch)?;
            Ok(serde_json::from_value(doc)?)
        })
        .await
    }

    /// Moves an open order to the cancelled stage.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidTransition` for a finalized or already
    /// cancelled order.
    pub async fn cancel_order(&self, params: &CancelOrder) -> Result<Order> {
        self.flush(&params.id).await?;
        let locks = Arc::clone(&self.locks);
        let params = params.clone();

        self.blocking(move |store| {
            let _order_guard = locks.acquire([order_key(&params.id)]);
            let order = read_order(store, &params.id)?;
            let actor = Actor::or_system(params.actor.as_ref());
            let patch = transition::plan_cancel(&order, params.reason.as_deref(), &actor, Timestamp::now())?;
            let doc = store.update(ORDERS, &order.id, &patch)?;
            log::info!("Cancelled order {}", order.id);
            Ok(serde_json::from_value(doc)?)
        })
        .await
    }

    /// Stages a field edit to be committed after the debounce delay.
    ///
    /// Re-queuing the same field before the commit replaces the value. Any
    /// operation that reads the order first commits what is pending.
    pub async fn queue_field(&self, params: &SetField) -> Result<()> {
        let config = self.configuration();
        let field = editable_field(&config.fields, &params.field)?;
        let value = coerce_for_path(&field.path, &params.value, field.value_type, &self.tz);

        let scheduled = self.buffer.has_pending(&params.id);
        self.buffer.stage(&params.id, &field.path, value);
        if !scheduled {
            let pipeline = self.clone();
            let id = params.id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(pipeline.debounce).await;
                if let Err(e) = pipeline.flush(&id).await {
                    log::warn!("Deferred write to order {id} failed: {e}");
                }
            });
        }
        Ok(())
    }

    /// Commits the pending writes of one order. Returns whether anything
    /// was written.
    ///
    /// On a store failure the writes go back into the buffer, unless the
    /// order no longer exists.
    pub async fn flush(&self, order_id: &str) -> Result<bool> {
        let Some(patch) = self.buffer.take(order_id) else {
            return Ok(false);
        };
        let staged = patch.clone();
        let id = order_id.to_string();
        let result = self
            .blocking(move |store| commit_staged(store, &id, patch))
            .await;
        match result {
            Ok(()) => Ok(true),
            Err(PipelineError::OrderNotFound { id }) => {
                log::warn!("Dropping pending writes for missing order {id}");
                Err(PipelineError::OrderNotFound { id })
            }
            Err(e) => {
                self.buffer.restore(order_id, staged);
                Err(e)
            }
        }
    }

    /// Commits every order's pending writes. Returns how many orders were
    /// written.
    pub async fn flush_all(&self) -> Result<usize> {
        let mut flushed = 0;
        for id in self.buffer.order_ids() {
            if self.flush(&id).await? {
                flushed += 1;
            }
        }
        Ok(flushed)
    }

    pub fn has_pending_writes(&self, order_id: &str) -> bool {
        self.buffer.has_pending(order_id)
    }
}

fn commit_staged(store: &dyn DocumentStore, id: &str, patch: Patch) -> Result<()> {
    let order = read_order(store, id)?;
    let mut patch = with_pending(&order, patch)?;
    patch.push_set("updatedAt", Timestamp::now().to_string());
    store.update(ORDERS, id, &patch)?;
    log::debug!("Committed {} pending writes to order {id}", patch.len());
    Ok(())
}

/// Resolves a field by id or path and checks that callers may write it.
pub(crate) fn editable_field<'a>(registry: &'a FieldRegistry, key: &str) -> Result<&'a FieldDefinition> {
    let field = registry
        .by_id(key)
        .or_else(|| registry.by_path(key))
        .ok_or_else(|| PipelineError::invalid_input("field").with_reason(format!("Unknown field '{key}'")))?;
    if field.is_system && PROTECTED_PATHS.contains(&field.path.as_str()) {
        return Err(PipelineError::invalid_input(field.id.clone())
            .with_reason("this field is maintained by the pipeline"));
    }
    if !field.editable || field.is_formula() {
        return Err(PipelineError::invalid_input(field.id.clone()).with_reason("this field is not editable"));
    }
    Ok(field)
}
