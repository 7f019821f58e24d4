//! Spreadsheet import for the Pipeline: header mapping and row import.

use std::collections::HashSet;
use std::sync::Arc;

use jiff::Timestamp;
use serde_json::Value;

use super::{order_key, read_order, Pipeline};
use crate::error::{PipelineError, Result};
use crate::fields::coerce_for_path;
use crate::flows::FlowRegistry;
use crate::inventory::resolve_collection;
use crate::mapping::{self, HeaderMapping};
use crate::models::{Actor, ChangeLogEntry, Order, Stage, StockHold, PAUSED_LABEL};
use crate::params::{ImportRow, MapHeaders};
use crate::path;
use crate::store::{self, ORDERS};

/// Reason recorded on orders imported while paused.
const IMPORTED_PAUSED: &str = "Importado en pausa por falta de stock";

impl Pipeline {
    /// Maps spreadsheet headers onto the current field registry.
    pub fn map_headers(&self, params: &MapHeaders) -> HeaderMapping {
        let config = self.configuration();
        mapping::map_headers(&params.headers, &config.fields, &params.overrides)
    }

    /// Builds or updates an order from one spreadsheet row.
    ///
    /// A mapped `id` column selects the order to update; rows without one
    /// create a new order. Empty cells never overwrite stored values.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::UnmappedColumns` when a header is neither
    /// mapped nor skipped with an override, and `PipelineError::InvalidInput`
    /// when the row is longer than its headers or a mapped path does not fit
    /// the order document.
    pub async fn import_row(&self, params: &ImportRow) -> Result<Order> {
        if params.values.len() > params.headers.len() {
            return Err(PipelineError::invalid_input("values").with_reason(format!(
                "Row has {} values for {} headers",
                params.values.len(),
                params.headers.len()
            )));
        }

        let config = self.configuration();
        let mapping = mapping::map_headers(&params.headers, &config.fields, &params.overrides);
        if !mapping.is_complete() {
            return Err(PipelineError::UnmappedColumns {
                headers: mapping.unmapped,
            });
        }
        let mut assignments: Vec<(String, Value)> = Vec::new();
        let mut seen = HashSet::new();
        for (header, raw) in params.headers.iter().zip(&params.values) {
            if !seen.insert(header.as_str()) {
                continue;
            }
            let Some(mapped) = mapping.get(header) else {
                continue;
            };
            if raw.trim().is_empty() {
                continue;
            }
            let value = coerce_for_path(&mapped.path, raw, mapped.value_type, &self.tz);
            assignments.push((mapped.path.clone(), value));
        }
        let actor = Actor::or_system(params.actor.as_ref());
        let locks = Arc::clone(&self.locks);

        self.blocking(move |store| {
            let now = Timestamp::now();
            let id = assignments
                .iter()
                .find(|(p, _)| p == "id")
                .and_then(|(_, v)| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            let _order_guard = id.as_deref().map(|id| locks.acquire([order_key(id)]));
            let existing: Option<Order> = match &id {
                Some(id) => store::load(store, ORDERS, id)?,
                None => None,
            };
            let is_new = existing.is_none();
            let base = existing.unwrap_or_else(|| Order::new(id.clone().unwrap_or_default(), now));

            let mut doc = serde_json::to_value(&base)?;
            let mut relabelled = false;
            for (field_path, value) in assignments {
                if field_path == "id" {
                    continue;
                }
                relabelled |= field_path == "stageLabel";
                path::set(&mut doc, &field_path, value)?;
            }
            let mut order: Order = serde_json::from_value(doc)?;
            order.imported = true;
            order.line_items.retain(|item| !item.product.trim().is_empty());
            order.comments.retain(|c| !c.text.trim().is_empty());

            if relabelled || is_new {
                settle_stage(&mut order, &config.flows, now);
            }
            order
                .stage_record
                .entry(order.stage)
                .or_default()
                .entered_at
                .get_or_insert(now);
            if order.stage == Stage::Finalized && order.finalized_at.is_none() {
                order.finalized_at = Some(now);
            }
            order.recompute_pending();
            order.updated_at = Some(now);
            order.change_log.push(ChangeLogEntry::new(
                now,
                &actor,
                "Pedido Importado",
                format!("Importado en {} por {}", order.stage_label, actor.label),
            ));

            let doc = serde_json::to_value(&order)?;
            let id = match id {
                Some(id) => {
                    store.set(ORDERS, &id, doc)?;
                    id
                }
                None => store.add(ORDERS, doc)?,
            };
            log::info!(
                "Imported order {id} ({}) in stage {}",
                if is_new { "new" } else { "updated" },
                order.stage.as_str()
            );
            read_order(store, &id)
        })
        .await
    }
}

/// Derives the stage from the (already normalized) label. Unknown labels
/// fall back to design.
fn settle_stage(order: &mut Order, flows: &FlowRegistry, now: Timestamp) {
    match Stage::from_label(&order.stage_label) {
        Some(stage) => order.stage = stage,
        None => {
            if !order.stage_label.trim().is_empty() {
                log::warn!(
                    "Order {} carries unknown stage label '{}'; placing it in design",
                    order.id,
                    order.stage_label
                );
            }
            order.stage = Stage::Design;
            order.stage_label = Stage::Design.label().to_string();
        }
    }

    order.hold = if order.stage_label == PAUSED_LABEL {
        let inventory = flows
            .flow(&order.flow_id)
            .map_or_else(|| resolve_collection(""), |flow| resolve_collection(flow.preparation_inventory()));
        Some(StockHold {
            since: now,
            inventory,
            reason: IMPORTED_PAUSED.to_string(),
        })
    } else {
        None
    };
}
