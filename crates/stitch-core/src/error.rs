//! Error types for the pipeline library.
//!
//! Condition rejections and stock conflicts are not errors: they are reported
//! through [`crate::pipeline::AdvanceOutcome`]. This enum covers lookups that
//! cannot be answered permissively, malformed input and persistence failures.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::Stage;

/// Error type for all pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Database connection or query errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// Order not found for the given ID
    #[error("Order with ID {id} not found")]
    OrderNotFound { id: String },
    /// Any other document missing from its collection
    #[error("Document '{id}' not found in collection '{collection}'")]
    DocumentNotFound { collection: String, id: String },
    /// Invalid input validation errors
    #[error("Invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
    /// The order cannot take the requested transition from its stage
    #[error("Order {id} cannot leave stage {stage}: {reason}")]
    InvalidTransition {
        id: String,
        stage: Stage,
        reason: String,
    },
    /// The caller acted on a stale view of the order
    #[error("Order {id} is in stage {actual}, not {expected}")]
    StageMismatch {
        id: String,
        expected: Stage,
        actual: Stage,
    },
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Spreadsheet columns no field claims
    #[error(
        "Unmapped columns: {}. Map them or mark them 'no-mapear'",
        .headers.join(", ")
    )]
    UnmappedColumns { headers: Vec<String> },
    /// Malformed CSV input
    #[error("CSV error on line {line}: {reason}")]
    Csv { line: usize, reason: String },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Builder for creating database errors with optional context.
pub struct DatabaseErrorBuilder {
    message: String,
}

impl DatabaseErrorBuilder {
    /// Create a new database error builder with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build the error with the given source.
    pub fn with_source(self, source: rusqlite::Error) -> PipelineError {
        PipelineError::Database {
            message: self.message,
            source,
        }
    }
}

/// Builder for creating input validation errors.
pub struct InvalidInputBuilder {
    field: String,
}

impl InvalidInputBuilder {
    /// Create a new invalid input error builder for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> PipelineError {
        PipelineError::InvalidInput {
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl PipelineError {
    /// Creates a builder for database errors.
    pub fn database(message: impl Into<String>) -> DatabaseErrorBuilder {
        DatabaseErrorBuilder::new(message)
    }

    /// Creates a builder for input validation errors.
    pub fn invalid_input(field: impl Into<String>) -> InvalidInputBuilder {
        InvalidInputBuilder::new(field)
    }

    /// Shorthand for a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn join(e: tokio::task::JoinError) -> Self {
        Self::configuration(format!("Task join error: {e}"))
    }
}

/// Extension trait for Result to provide concise error mapping with
/// anyhow-style context.
pub trait ResultExt<T, E> {
    /// Add context to any error type, converting to PipelineError.
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;
}

/// Specialized extension trait for database-related Results.
pub trait DatabaseResultExt<T> {
    /// Map database errors with a message.
    fn db_context(self, message: &str) -> Result<T>;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| PipelineError::Configuration {
            message: format!("{context}: {e}"),
        })
    }
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> Result<T> {
        self.map_err(|e| PipelineError::database(message).with_source(e))
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
