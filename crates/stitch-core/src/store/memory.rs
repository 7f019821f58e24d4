//! In-process document store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::{sequence_id, with_id, DocumentStore, Listeners, Patch, Snapshot, SnapshotCallback, Subscription};
use crate::error::{PipelineError, Result};

type Collections = HashMap<String, BTreeMap<String, Value>>;

/// Document store backed by mutex-guarded maps.
///
/// Every write holds the collection lock for its whole read-merge-write, so
/// patches are atomic with respect to each other.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
    sequences: Mutex<HashMap<String, u64>>,
    listeners: Arc<Listeners>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, collection: &str) {
        if !self.listeners.watching(collection) {
            return;
        }
        let documents = self
            .lock()
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        self.listeners.notify(&Snapshot {
            collection: collection.to_string(),
            documents,
        });
    }

    fn next_id(&self, collection: &str, existing: &BTreeMap<String, Value>) -> String {
        let mut sequences = self
            .sequences
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let counter = sequences.entry(collection.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let id = sequence_id(*counter);
            if !existing.contains_key(&id) {
                return id;
            }
        }
    }
}

impl DocumentStore for MemoryStore {
    fn add(&self, collection: &str, doc: Value) -> Result<String> {
        let id = {
            let mut collections = self.lock();
            let docs = collections.entry(collection.to_string()).or_default();
            let id = self.next_id(collection, docs);
            docs.insert(id.clone(), with_id(doc, &id)?);
            id
        };
        self.publish(collection);
        Ok(id)
    }

    fn set(&self, collection: &str, id: &str, doc: Value) -> Result<()> {
        let doc = with_id(doc, id)?;
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        self.publish(collection);
        Ok(())
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .lock()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    fn update(&self, collection: &str, id: &str, patch: &Patch) -> Result<Value> {
        let updated = {
            let mut collections = self.lock();
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| PipelineError::DocumentNotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            let mut next = doc.clone();
            patch.apply(&mut next)?;
            let next = with_id(next, id)?;
            *doc = next.clone();
            next
        };
        self.publish(collection);
        Ok(updated)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let removed = self
            .lock()
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            self.publish(collection);
        }
        Ok(())
    }

    fn list(&self, collection: &str) -> Result<Vec<Value>> {
        Ok(self
            .lock()
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    fn subscribe(&self, collection: &str, callback: SnapshotCallback) -> Result<Subscription> {
        let initial = self.list(collection)?;
        Ok(self.listeners.register(collection, callback, initial))
    }
}
