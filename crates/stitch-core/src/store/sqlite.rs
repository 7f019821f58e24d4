//! SQLite-backed document store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use super::{DocumentStore, Listeners, Patch, Snapshot, SnapshotCallback, Subscription};
use crate::{
    db::Database,
    error::{PipelineError, Result},
};

/// Document store persisting every collection in one SQLite file.
///
/// Each call opens its own connection. Updates run read-merge-write inside
/// an immediate transaction, so concurrent patches from other connections
/// are serialized by SQLite rather than overwriting each other.
pub struct SqliteStore {
    path: PathBuf,
    listeners: Arc<Listeners>,
}

impl SqliteStore {
    /// Opens (and if needed creates) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::FileSystem` if the parent directory cannot be
    /// created and `PipelineError::Database` if the schema cannot be set up.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::FileSystem {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        Database::new(&path)?;
        Ok(Self {
            path,
            listeners: Listeners::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Database> {
        Database::new(&self.path)
    }

    fn publish(&self, collection: &str) -> Result<()> {
        if self.listeners.watching(collection) {
            let documents = self.connect()?.list_documents(collection)?;
            self.listeners.notify(&Snapshot {
                collection: collection.to_string(),
                documents,
            });
        }
        Ok(())
    }
}

impl DocumentStore for SqliteStore {
    fn add(&self, collection: &str, doc: Value) -> Result<String> {
        let id = self.connect()?.insert_document(collection, doc)?;
        self.publish(collection)?;
        Ok(id)
    }

    fn set(&self, collection: &str, id: &str, doc: Value) -> Result<()> {
        self.connect()?.put_document(collection, id, doc)?;
        self.publish(collection)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        self.connect()?.get_document(collection, id)
    }

    fn update(&self, collection: &str, id: &str, patch: &Patch) -> Result<Value> {
        let doc = self.connect()?.update_document(collection, id, patch)?;
        self.publish(collection)?;
        Ok(doc)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        if self.connect()?.delete_document(collection, id)? {
            self.publish(collection)?;
        }
        Ok(())
    }

    fn list(&self, collection: &str) -> Result<Vec<Value>> {
        self.connect()?.list_documents(collection)
    }

    fn subscribe(&self, collection: &str, callback: SnapshotCallback) -> Result<Subscription> {
        let initial = self.list(collection)?;
        Ok(self.listeners.register(collection, callback, initial))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_documents_survive_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join("stitch.db");

        let id = {
            let store = SqliteStore::open(&path).unwrap();
            store.add("orders", json!({ "stage": "billing" })).unwrap()
        };

        let store = SqliteStore::open(&path).unwrap();
        let doc = store.get("orders", &id).unwrap().unwrap();
        assert_eq!(doc["stage"], "billing");
    }

    #[test]
    fn test_listener_sees_committed_update() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = SqliteStore::open(temp_dir.path().join("stitch.db")).unwrap();
        let id = store.add("orders", json!({ "stage": "design" })).unwrap();

        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&stages);
        let _subscription = store
            .subscribe(
                "orders",
                Box::new(move |snapshot: &Snapshot| {
                    let stage = snapshot.documents[0]["stage"].as_str().unwrap_or("").to_string();
                    sink.lock().unwrap().push(stage);
                }),
            )
            .unwrap();

        store
            .update("orders", &id, &Patch::new().set("stage", "billing"))
            .unwrap();

        assert_eq!(*stages.lock().unwrap(), vec!["design", "billing"]);
    }
}
