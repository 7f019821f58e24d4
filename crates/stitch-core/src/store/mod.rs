//! Document store contract and its implementations.
//!
//! The pipeline only relies on [`DocumentStore`]: a collection-oriented store
//! keyed by document id, with field-path partial updates ([`Patch`]) and
//! per-collection snapshot listeners.
//!
//! - [`MemoryStore`]: mutex-guarded in-process maps
//! - [`SqliteStore`]: one JSON document per SQLite row, via [`crate::db`]
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use stitch_core::store::{DocumentStore, MemoryStore, Patch};
//!
//! # fn example() -> stitch_core::Result<()> {
//! let store = MemoryStore::new();
//! let id = store.add("orders", json!({ "stage": "design" }))?;
//! assert_eq!(id, "000001");
//!
//! store.update("orders", &id, &Patch::new().set("stageRecord.design.link", "https://x"))?;
//! let doc = store.get("orders", &id)?.unwrap();
//! assert_eq!(doc["stageRecord"]["design"]["link"], "https://x");
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{PipelineError, Result};

pub mod memory;
pub mod patch;
pub mod sqlite;

pub use memory::MemoryStore;
pub use patch::{Patch, PatchOp};
pub use sqlite::SqliteStore;

/// Collection holding orders.
pub const ORDERS: &str = "orders";
/// Collection holding configuration documents.
pub const CONFIGURATION: &str = "configuration";
/// Collection holding stock movements.
pub const STOCK_HISTORY: &str = "stockHistory";

/// Full contents of a collection delivered to listeners.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub collection: String,
    pub documents: Vec<Value>,
}

/// Listener invoked with every new snapshot of a collection.
pub type SnapshotCallback = Box<dyn Fn(&Snapshot) + Send + Sync>;

/// Store adapter contract consumed by the pipeline.
///
/// Documents are JSON objects that carry their own `id` field. Every method
/// is synchronous; async callers wrap them in `spawn_blocking`.
pub trait DocumentStore: Send + Sync {
    /// Inserts a document under a freshly assigned id and returns that id.
    fn add(&self, collection: &str, doc: Value) -> Result<String>;

    /// Inserts or replaces the document stored under `id`.
    fn set(&self, collection: &str, id: &str, doc: Value) -> Result<()>;

    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Applies a field-path patch atomically and returns the new document.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::DocumentNotFound` if no document has `id`.
    fn update(&self, collection: &str, id: &str, patch: &Patch) -> Result<Value>;

    fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Every document of a collection, ordered by id.
    fn list(&self, collection: &str) -> Result<Vec<Value>>;

    /// Registers a snapshot listener. The callback receives the current
    /// snapshot right away and again after every committed write.
    fn subscribe(&self, collection: &str, callback: SnapshotCallback) -> Result<Subscription>;
}

/// Reads and deserializes one document.
pub fn load<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> Result<Option<T>> {
    store
        .get(collection, id)?
        .map(serde_json::from_value)
        .transpose()
        .map_err(Into::into)
}

/// Reads and deserializes a whole collection.
pub fn load_all<T: DeserializeOwned>(store: &dyn DocumentStore, collection: &str) -> Result<Vec<T>> {
    store
        .list(collection)?
        .into_iter()
        .map(|doc| serde_json::from_value(doc).map_err(Into::into))
        .collect()
}

type SharedCallback = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Per-collection listener registry shared by the store implementations.
#[derive(Default)]
pub struct Listeners {
    next_id: AtomicU64,
    by_collection: Mutex<HashMap<String, Vec<(u64, SharedCallback)>>>,
}

impl Listeners {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// True when at least one listener watches `collection`.
    pub fn watching(&self, collection: &str) -> bool {
        self.by_collection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .is_some_and(|l| !l.is_empty())
    }

    /// Registers `callback` and delivers `initial` to it.
    pub fn register(
        self: &Arc<Self>,
        collection: &str,
        callback: SnapshotCallback,
        initial: Vec<Value>,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: SharedCallback = Arc::from(callback);
        self.by_collection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .push((id, Arc::clone(&callback)));

        callback(&Snapshot {
            collection: collection.to_string(),
            documents: initial,
        });

        Subscription {
            id,
            collection: collection.to_string(),
            listeners: Arc::downgrade(self),
        }
    }

    /// Delivers a snapshot to every listener of its collection.
    ///
    /// Callbacks run outside the registry lock so they may call back into
    /// the store.
    pub fn notify(&self, snapshot: &Snapshot) {
        let callbacks: Vec<SharedCallback> = self
            .by_collection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&snapshot.collection)
            .map(|l| l.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();
        for callback in callbacks {
            callback(snapshot);
        }
    }

    fn unregister(&self, collection: &str, id: u64) {
        if let Some(listeners) = self
            .by_collection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(collection)
        {
            listeners.retain(|(listener_id, _)| *listener_id != id);
        }
    }
}

/// Handle returned by [`DocumentStore::subscribe`]; dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    collection: String,
    listeners: Weak<Listeners>,
}

impl Subscription {
    /// Stops delivery to the listener.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.unregister(&self.collection, self.id);
        }
    }
}

/// Writes `id` into a document, rejecting anything but JSON objects.
pub(crate) fn with_id(mut doc: Value, id: &str) -> Result<Value> {
    let map = doc.as_object_mut().ok_or_else(|| {
        PipelineError::invalid_input("document").with_reason("documents must be JSON objects")
    })?;
    map.insert("id".to_string(), Value::String(id.to_string()));
    Ok(doc)
}

/// Formats a sequence number as a document id.
pub(crate) fn sequence_id(value: u64) -> String {
    format!("{value:06}")
}
