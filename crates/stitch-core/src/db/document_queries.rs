//! Document CRUD operations and queries.

use jiff::Timestamp;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde_json::Value;

use crate::{
    error::{DatabaseResultExt, PipelineError, Result},
    store::{sequence_id, with_id, Patch},
};

const NEXT_SEQUENCE_SQL: &str = "INSERT INTO sequences (collection, next_value) VALUES (?1, 1) \
     ON CONFLICT(collection) DO UPDATE SET next_value = next_value + 1 RETURNING next_value";
const DOCUMENT_EXISTS_SQL: &str =
    "SELECT EXISTS(SELECT 1 FROM documents WHERE collection = ?1 AND id = ?2)";
const INSERT_DOCUMENT_SQL: &str = "INSERT INTO documents (collection, id, body, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)";
const UPSERT_DOCUMENT_SQL: &str = "INSERT INTO documents (collection, id, body, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4) \
     ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at";
const SELECT_DOCUMENT_SQL: &str = "SELECT body FROM documents WHERE collection = ?1 AND id = ?2";
const UPDATE_DOCUMENT_SQL: &str =
    "UPDATE documents SET body = ?1, updated_at = ?2 WHERE collection = ?3 AND id = ?4";
const DELETE_DOCUMENT_SQL: &str = "DELETE FROM documents WHERE collection = ?1 AND id = ?2";
const SELECT_COLLECTION_SQL: &str =
    "SELECT body FROM documents WHERE collection = ?1 ORDER BY id";

impl super::Database {
    /// Inserts a document under the next free sequence id of its collection.
    pub fn insert_document(&mut self, collection: &str, doc: Value) -> Result<String> {
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")?;

        let id = loop {
            let next: i64 = tx
                .query_row(NEXT_SEQUENCE_SQL, params![collection], |row| row.get(0))
                .db_context("Failed to advance sequence")?;
            let candidate = sequence_id(next as u64);
            let taken: bool = tx
                .query_row(DOCUMENT_EXISTS_SQL, params![collection, &candidate], |row| {
                    row.get(0)
                })
                .db_context("Failed to check document existence")?;
            if !taken {
                break candidate;
            }
        };

        let body = serde_json::to_string(&with_id(doc, &id)?)?;
        tx.execute(
            INSERT_DOCUMENT_SQL,
            params![collection, &id, body, Timestamp::now().to_string()],
        )
        .db_context("Failed to insert document")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(id)
    }

    /// Inserts or replaces a document under a caller-chosen id.
    pub fn put_document(&mut self, collection: &str, id: &str, doc: Value) -> Result<()> {
        let body = serde_json::to_string(&with_id(doc, id)?)?;
        self.connection
            .execute(
                UPSERT_DOCUMENT_SQL,
                params![collection, id, body, Timestamp::now().to_string()],
            )
            .db_context("Failed to store document")?;
        Ok(())
    }

    /// Retrieves a document by collection and id.
    pub fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let body: Option<String> = self
            .connection
            .query_row(SELECT_DOCUMENT_SQL, params![collection, id], |row| row.get(0))
            .optional()
            .db_context("Failed to fetch document")?;
        body.map(|b| serde_json::from_str::<Value>(&b).map_err(Into::into))
            .transpose()
    }

    /// Applies a field-path patch inside one immediate transaction.
    pub fn update_document(&mut self, collection: &str, id: &str, patch: &Patch) -> Result<Value> {
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")?;

        let body: Option<String> = tx
            .query_row(SELECT_DOCUMENT_SQL, params![collection, id], |row| row.get(0))
            .optional()
            .db_context("Failed to fetch document")?;
        let Some(body) = body else {
            return Err(PipelineError::DocumentNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        };

        let mut doc: Value = serde_json::from_str(&body)?;
        patch.apply(&mut doc)?;
        let doc = with_id(doc, id)?;

        tx.execute(
            UPDATE_DOCUMENT_SQL,
            params![
                serde_json::to_string(&doc)?,
                Timestamp::now().to_string(),
                collection,
                id
            ],
        )
        .db_context("Failed to update document")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(doc)
    }

    /// Deletes a document; returns whether a row was removed.
    pub fn delete_document(&mut self, collection: &str, id: &str) -> Result<bool> {
        let affected = self
            .connection
            .execute(DELETE_DOCUMENT_SQL, params![collection, id])
            .db_context("Failed to delete document")?;
        Ok(affected > 0)
    }

    /// Lists every document of a collection ordered by id.
    pub fn list_documents(&self, collection: &str) -> Result<Vec<Value>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_COLLECTION_SQL)
            .db_context("Failed to prepare collection query")?;
        let bodies = stmt
            .query_map(params![collection], |row| row.get::<_, String>(0))
            .db_context("Failed to query collection")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_context("Failed to read collection rows")?;
        bodies
            .iter()
            .map(|b| serde_json::from_str::<Value>(b).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::super::Database;
    use super::*;

    fn create_test_db() -> (TempDir, Database) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::new(temp_dir.path().join("test.db")).expect("Failed to open database");
        (temp_dir, db)
    }

    #[test]
    fn test_insert_and_fetch_document() {
        let (_temp_dir, mut db) = create_test_db();
        let id = db.insert_document("orders", json!({ "stage": "design" })).unwrap();
        assert_eq!(id, "000001");

        let doc = db.get_document("orders", &id).unwrap().unwrap();
        assert_eq!(doc["id"], "000001");
        assert_eq!(doc["stage"], "design");
        assert!(db.get_document("orders", "999999").unwrap().is_none());
    }

    #[test]
    fn test_sequences_are_per_collection() {
        let (_temp_dir, mut db) = create_test_db();
        db.insert_document("orders", json!({})).unwrap();
        db.insert_document("orders", json!({})).unwrap();
        let stock_id = db.insert_document("garmentStock", json!({})).unwrap();
        assert_eq!(stock_id, "000001");
    }

    #[test]
    fn test_update_merges_field_paths() {
        let (_temp_dir, mut db) = create_test_db();
        let id = db
            .insert_document("orders", json!({ "stageRecord": { "design": { "link": "a" } } }))
            .unwrap();
        let doc = db
            .update_document(
                "orders",
                &id,
                &Patch::new().set("stageRecord.design.notes", "rush"),
            )
            .unwrap();
        assert_eq!(doc["stageRecord"]["design"]["link"], "a");
        assert_eq!(doc["stageRecord"]["design"]["notes"], "rush");
    }

    #[test]
    fn test_update_missing_document() {
        let (_temp_dir, mut db) = create_test_db();
        let err = db
            .update_document("orders", "000001", &Patch::new().set("a", 1))
            .unwrap_err();
        assert!(matches!(err, PipelineError::DocumentNotFound { .. }));
    }

    #[test]
    fn test_put_list_and_delete() {
        let (_temp_dir, mut db) = create_test_db();
        db.put_document("configuration", "flows", json!({ "v": 1 })).unwrap();
        db.put_document("configuration", "fields", json!({ "v": 2 })).unwrap();
        db.put_document("configuration", "flows", json!({ "v": 3 })).unwrap();

        let docs = db.list_documents("configuration").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["id"], "fields");
        assert_eq!(docs[1]["v"], 3);

        assert!(db.delete_document("configuration", "fields").unwrap());
        assert!(!db.delete_document("configuration", "fields").unwrap());
    }
}
