//! SQLite storage for JSON documents.
//!
//! This module provides the low-level database operations behind
//! [`crate::store::SqliteStore`]: connection setup, schema management and
//! the document queries.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::{DatabaseResultExt, Result};

pub mod document_queries;
pub mod migrations;

/// Time a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection and operations handler.
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Creates a new database connection and initializes the schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = Connection::open(path).db_context("Failed to open database connection")?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .db_context("Failed to set busy timeout")?;

        let db = Self { connection };
        db.initialize_schema()?;
        Ok(db)
    }
}
