//! Database schema initialization and migrations.

use crate::error::{DatabaseResultExt, Result};

/// Schema revision written to `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 1;

impl super::Database {
    /// Initializes the database schema using the embedded SQL file.
    pub(super) fn initialize_schema(&self) -> Result<()> {
        let schema_sql = include_str!("../../assets/schema.sql");
        self.connection
            .execute_batch(schema_sql)
            .db_context("Failed to initialize database schema")?;

        self.apply_migrations()
    }

    /// Apply database migrations for existing databases
    fn apply_migrations(&self) -> Result<()> {
        let version: i64 = self
            .connection
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .db_context("Failed to read schema version")?;

        if version < SCHEMA_VERSION {
            self.connection
                .execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
                .db_context("Failed to record schema version")?;
        }

        Ok(())
    }
}
