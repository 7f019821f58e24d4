//! Inventory operations for the Pipeline: stock sheets, history, checks and
//! the paused-order recheck.

use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::transition::preparation_hold;
use super::{order_key, read_order, stock_snapshot, Pipeline};
use crate::error::Result;
use crate::inventory::{self, csv, StockVerdict};
use crate::models::stock::stock_key;
use crate::models::{
    Actor, ChangeLogEntry, MovementKind, Order, Stage, StockMovement, StockRecord, PAUSED_LABEL,
    READY_LABEL,
};
use crate::params::{Id, ImportStock};
use crate::store::{self, DocumentStore, Patch, PatchOp, ORDERS, STOCK_HISTORY};

/// Change-log action recorded when a paused order is released.
pub const RELEASED_ACTION: &str = "Movido automáticamente a Listo para Preparar";

impl Pipeline {
    /// Merges a stock sheet into an inventory and records one entry movement
    /// per row.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Csv` for a sheet without the required
    /// columns.
    pub async fn import_stock(&self, params: &ImportStock) -> Result<csv::StockMerge> {
        let rows = csv::parse_stock(&params.csv)?;
        let collection = self.stock_collection(params.inventory.as_deref());
        let actor = Actor::or_system(params.actor.as_ref());
        let locks = Arc::clone(&self.locks);

        self.blocking(move |store| {
            let keys = rows
                .iter()
                .map(|row| format!("{collection}/{}", stock_key(&row.kind, &row.color, &row.size)));
            let _guard = locks.acquire(keys);

            let existing: Vec<StockRecord> = store::load_all(store, &collection)?;
            let mut merge = csv::merge_stock(&existing, &rows);
            for record in &mut merge.records {
                let doc = serde_json::to_value(&*record)?;
                if record.id.is_empty() {
                    record.id = store.add(&collection, doc)?;
                } else {
                    store.set(&collection, &record.id, doc)?;
                }
            }

            let now = Timestamp::now();
            for row in &rows {
                let record = StockRecord::new(&row.kind, &row.color, &row.size, row.quantity);
                let movement = StockMovement {
                    timestamp: now,
                    user: actor.label.clone(),
                    action: MovementKind::Entry,
                    detail: StockMovement::describe(&record, row.quantity),
                    quantity: row.quantity,
                };
                store.add(STOCK_HISTORY, serde_json::to_value(&movement)?)?;
            }
            log::info!(
                "Imported {} stock rows ({} units) into {collection}",
                merge.rows,
                merge.units
            );
            Ok(merge)
        })
        .await
    }

    /// Records of one inventory, sorted by type, color and size.
    pub async fn list_stock(&self, inventory: Option<&str>) -> Result<Vec<StockRecord>> {
        let collection = self.stock_collection(inventory);
        self.blocking(move |store| {
            let mut records: Vec<StockRecord> = store::load_all(store, &collection)?;
            records.sort_by_key(StockRecord::key);
            Ok(records)
        })
        .await
    }

    /// One inventory as a stock sheet.
    pub async fn export_stock(&self, inventory: Option<&str>) -> Result<String> {
        let records = self.list_stock(inventory).await?;
        Ok(csv::export_stock(&records))
    }

    /// Whether the stock consulted for preparation covers an order.
    pub async fn check_stock(&self, params: &Id) -> Result<StockVerdict> {
        self.flush(&params.id).await?;
        let config = self.configuration();
        let id = params.id.clone();

        self.blocking(move |store| {
            let order = read_order(store, &id)?;
            let flow = config.flows.require(&order.flow_id)?;
            let collection = inventory::resolve_collection(flow.preparation_inventory());
            let records: Vec<StockRecord> = store::load_all(store, &collection)?;
            let items = inventory::consumable_items(&order);
            Ok(inventory::check(&collection, &items, Some(records.as_slice())))
        })
        .await
    }

    /// Every recorded stock movement, oldest first.
    pub async fn stock_history(&self) -> Result<Vec<StockMovement>> {
        self.blocking(|store| {
            let mut movements: Vec<StockMovement> = store::load_all(store, STOCK_HISTORY)?;
            movements.sort_by_key(|m| m.timestamp);
            Ok(movements)
        })
        .await
    }

    /// The stock history as CSV, dates rendered in the pipeline's zone.
    pub async fn export_history(&self) -> Result<String> {
        let movements = self.stock_history().await?;
        Ok(csv::export_history(&movements, &self.tz))
    }

    /// Appends the movements of a history sheet. Returns how many were
    /// stored.
    pub async fn import_history(&self, text: &str) -> Result<usize> {
        let movements = csv::parse_history(text, &self.tz)?;
        self.blocking(move |store| {
            for movement in &movements {
                store.add(STOCK_HISTORY, serde_json::to_value(movement)?)?;
            }
            log::info!("Imported {} stock movements", movements.len());
            Ok(movements.len())
        })
        .await
    }

    /// Releases every paused preparation order whose stock now suffices.
    /// Returns the released order ids.
    ///
    /// Each candidate is re-read under its order lock, so an order that moved
    /// on since the listing is left alone.
    pub async fn recheck_paused(&self, actor: Option<&Actor>) -> Result<Vec<String>> {
        self.flush_all().await?;
        let config = self.configuration();
        let actor = Actor::or_system(actor);
        let locks = Arc::clone(&self.locks);

        self.blocking(move |store| {
            let stock = stock_snapshot(store, &config)?;
            let orders: Vec<Order> = store::load_all(store, ORDERS)?;
            let now = Timestamp::now();

            let mut released = Vec::new();
            for id in orders.iter().filter(|o| is_paused(o)).map(|o| &o.id) {
                let _order_guard = locks.acquire([order_key(id)]);
                let order = match store::load::<Order>(store, ORDERS, id)? {
                    Some(order) if is_paused(&order) => order,
                    _ => continue,
                };
                let Some(flow) = config.flows.flow(&order.flow_id) else {
                    log::warn!("Order {} names unknown flow '{}'", order.id, order.flow_id);
                    continue;
                };
                if preparation_hold(flow, &order, &stock, now).is_some() {
                    continue;
                }
                release(store, &order, &actor, now)?;
                released.push(order.id);
            }
            if !released.is_empty() {
                log::info!("Released {} paused orders", released.len());
            }
            Ok(released)
        })
        .await
    }

    /// Spawns a task that rechecks paused orders every `period` until
    /// `shutdown` turns true or its sender is dropped.
    pub fn spawn_watcher(
        &self,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let pipeline = self.clone();
        let period = if period.is_zero() { Duration::from_secs(1) } else { period };

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = pipeline.recheck_paused(None).await {
                            log::warn!("Paused-order recheck failed: {e}");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            log::debug!("Paused-order watcher stopping");
                            break;
                        }
                    }
                }
            }
        })
    }

    fn stock_collection(&self, inventory_ref: Option<&str>) -> String {
        let config = self.configuration();
        let inventory_ref = inventory_ref
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(&config.settings.default_inventory);
        inventory::resolve_collection(inventory_ref)
    }
}

fn is_paused(order: &Order) -> bool {
    order.stage == Stage::Preparation && order.hold.is_some()
}

fn release(store: &dyn DocumentStore, order: &Order, actor: &Actor, now: Timestamp) -> Result<()> {
    let entry = ChangeLogEntry::new(
        now,
        actor,
        RELEASED_ACTION,
        format!("{PAUSED_LABEL} → {READY_LABEL} por {}", actor.label),
    );
    let mut patch = Patch::new()
        .remove("hold")
        .set("stageLabel", READY_LABEL)
        .set("updatedAt", now.to_string());
    patch.push(PatchOp::Append {
        path: "changeLog".to_string(),
        value: serde_json::to_value(&entry)?,
    });
    store.update(ORDERS, &order.id, &patch)?;
    Ok(())
}
