//! High-level pipeline API.
//!
//! [`Pipeline`] is the coordinator between callers and the document store.
//! It owns the configuration snapshot, the per-record locks and the
//! debounced write buffer, and exposes every order, inventory, import and
//! configuration operation as an async method.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   Operations    │    │   Transition    │    │  DocumentStore  │
//! │ (order_ops,     │───▶│   (pure plans   │───▶│ (memory/sqlite) │
//! │  advance_ops..) │    │    + patches)   │    │                 │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! ## Submodules
//!
//! - [`builder`]: factory for [`Pipeline`] instances
//! - [`transition`]: pure planning of advances and cancellations
//! - [`order_ops`]: create, read, list, edit and cancel orders
//! - [`advance_ops`]: stage transitions, including the guarded stock draw
//! - [`inventory_ops`]: stock and history CSV, checks, paused-order recheck
//! - [`import_ops`]: header mapping and spreadsheet row import
//! - [`config_ops`]: flow conditions, field registry and column layouts
//!
//! Store calls run on `spawn_blocking`. Each mutating operation commits
//! inside a single blocking section, so a caller that abandons its future
//! never leaves a half-applied order behind.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use stitch_core::params::{AdvanceOrder, CreateOrder};
//! use stitch_core::store::MemoryStore;
//! use stitch_core::{AdvanceOutcome, PipelineBuilder, Stage};
//!
//! # async fn example() -> stitch_core::Result<()> {
//! let pipeline = PipelineBuilder::new()
//!     .with_store(Arc::new(MemoryStore::new()))
//!     .build()
//!     .await?;
//!
//! let order = pipeline
//!     .create_order(&CreateOrder {
//!         total: 150.0,
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! let outcome = pipeline
//!     .advance(&AdvanceOrder {
//!         id: order.id.clone(),
//!         from: Stage::Design,
//!         actor: None,
//!     })
//!     .await?;
//! assert!(matches!(outcome, AdvanceOutcome::Rejected { .. }));
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use jiff::tz::TimeZone;
use tokio::task;

use crate::config::Configuration;
use crate::error::{PipelineError, Result};
use crate::inventory::{resolve_collection, RecordLocks, Shortfall, StockSnapshot};
use crate::models::{Order, Stage, StockRecord};
use crate::pending::WriteBuffer;
use crate::store::{self, DocumentStore, Patch, ORDERS};

pub mod advance_ops;
pub mod builder;
pub mod config_ops;
pub mod import_ops;
pub mod inventory_ops;
pub mod order_ops;
pub mod transition;

#[cfg(test)]
mod tests;

pub use builder::PipelineBuilder;
pub use transition::{plan_advance, plan_cancel, StockDraw, Transition, TransitionContext, TransitionPlan};

/// Result of asking an order to leave its stage.
///
/// Only `Advanced` changes anything. The other variants leave the order
/// exactly as it was and are safe to retry once the data is fixed.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Advanced {
        order: Box<Order>,
        from: Stage,
        to: Stage,
    },
    /// Required exit conditions are unmet
    Rejected { missing: Vec<String> },
    /// Stock ran short between the check and the decrement
    StockConflict { shortfall: Shortfall },
}

impl AdvanceOutcome {
    pub fn is_advanced(&self) -> bool {
        matches!(self, AdvanceOutcome::Advanced { .. })
    }
}

/// Main pipeline interface.
#[derive(Clone)]
pub struct Pipeline {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) config: Arc<RwLock<Arc<Configuration>>>,
    /// Serializes configuration writers
    pub(crate) config_writer: Arc<tokio::sync::Mutex<()>>,
    pub(crate) locks: Arc<RecordLocks>,
    pub(crate) buffer: Arc<WriteBuffer>,
    pub(crate) tz: TimeZone,
    pub(crate) debounce: Duration,
}

impl Pipeline {
    pub(crate) fn new(
        store: Arc<dyn DocumentStore>,
        config: Configuration,
        tz: TimeZone,
        debounce: Duration,
    ) -> Self {
        Self {
            store,
            config: Arc::new(RwLock::new(Arc::new(config))),
            config_writer: Arc::new(tokio::sync::Mutex::new(())),
            locks: Arc::new(RecordLocks::new()),
            buffer: Arc::new(WriteBuffer::new()),
            tz,
            debounce,
        }
    }

    /// The underlying document store, e.g. for snapshot subscriptions.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Current configuration snapshot.
    pub fn configuration(&self) -> Arc<Configuration> {
        Arc::clone(&self.config.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn time_zone(&self) -> &TimeZone {
        &self.tz
    }

    pub(crate) fn replace_configuration(&self, config: Arc<Configuration>) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Runs `f` against the store on the blocking pool.
    pub(crate) async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DocumentStore) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(PipelineError::join)?
    }
}

/// Lock key guarding stage changes of one order.
pub(crate) fn order_key(id: &str) -> String {
    format!("{ORDERS}/{id}")
}

/// Reads an order, failing when it does not exist.
pub(crate) fn read_order(store: &dyn DocumentStore, id: &str) -> Result<Order> {
    store::load::<Order>(store, ORDERS, id)?.ok_or_else(|| PipelineError::OrderNotFound { id: id.to_string() })
}

/// Loads every stock collection the configured flows can consult.
pub(crate) fn stock_snapshot(store: &dyn DocumentStore, config: &Configuration) -> Result<StockSnapshot> {
    let mut snapshot = StockSnapshot::new();
    let refs = config
        .flows
        .flows
        .iter()
        .flat_map(|flow| flow.inventory_refs())
        .chain([config.settings.default_inventory.as_str()]);
    for inventory_ref in refs {
        let collection = resolve_collection(inventory_ref);
        if snapshot.contains(&collection) {
            continue;
        }
        let records: Vec<StockRecord> = store::load_all(store, &collection)?;
        snapshot.insert(collection, records);
    }
    Ok(snapshot)
}

/// Adds the recomputed pending amount to a patch that touches amounts or
/// stage payments.
pub(crate) fn with_pending(order: &Order, mut patch: Patch) -> Result<Patch> {
    if patch.touches("amounts") || patch.touches("stageRecord.billing") {
        let mut preview = transition::apply(order, &patch)?;
        preview.recompute_pending();
        patch.push_set("amounts.pending", preview.amounts.pending);
    }
    Ok(patch)
}
