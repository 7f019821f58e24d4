//! Debounced field writes.
//!
//! Rapid edits to the same order are staged here and committed as one
//! [`Patch`]. Re-staging a path replaces its value, so the last edit wins.
//! Anything that reads an order for a decision flushes its pending writes
//! first.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use crate::path;
use crate::store::{Patch, PatchOp};

#[derive(Debug, Default)]
pub struct WriteBuffer {
    pending: Mutex<HashMap<String, Vec<(String, Value)>>>,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `value` at `field_path` of an order, replacing any value
    /// already staged for that path.
    pub fn stage(&self, order_id: &str, field_path: &str, value: Value) {
        let field_path = path::canonical(field_path);
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let writes = pending.entry(order_id.to_string()).or_default();
        writes.retain(|(p, _)| *p != field_path);
        writes.push((field_path, value));
    }

    /// Removes and returns the staged writes of an order as one patch, in
    /// staging order.
    pub fn take(&self, order_id: &str) -> Option<Patch> {
        let writes = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(order_id)?;
        let mut patch = Patch::new();
        for (field_path, value) in writes {
            patch.push_set(field_path, value);
        }
        Some(patch)
    }

    /// Puts writes back after a failed commit, unless newer ones were staged
    /// for the same paths meanwhile.
    pub fn restore(&self, order_id: &str, patch: Patch) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let writes = pending.entry(order_id.to_string()).or_default();
        let mut restored = Vec::new();
        for op in patch.ops() {
            if let PatchOp::Set { path, value } = op {
                if !writes.iter().any(|(p, _)| p == path) {
                    restored.push((path.clone(), value.clone()));
                }
            }
        }
        restored.append(writes);
        *writes = restored;
    }

    pub fn has_pending(&self, order_id: &str) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(order_id)
            .is_some_and(|w| !w.is_empty())
    }

    /// Ids of orders with staged writes.
    pub fn order_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, w)| !w.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}
