//! Builder for creating and configuring Pipeline instances.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use jiff::tz::TimeZone;
use tokio::task;

use super::Pipeline;
use crate::config::Configuration;
use crate::error::{PipelineError, Result};
use crate::store::{DocumentStore, SqliteStore};

/// Delay before a queued field edit is committed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Builder for creating and configuring Pipeline instances.
#[derive(Clone)]
pub struct PipelineBuilder {
    database_path: Option<PathBuf>,
    store: Option<Arc<dyn DocumentStore>>,
    time_zone: Option<TimeZone>,
    debounce: Duration,
}

impl PipelineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            database_path: None,
            store: None,
            time_zone: None,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Sets a custom database file path.
    ///
    /// If not specified, uses XDG Base Directory specification:
    /// `$XDG_DATA_HOME/stitch/stitch.db` or `~/.local/share/stitch/stitch.db`
    pub fn with_database_path<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        if let Some(path) = path {
            self.database_path = Some(path.as_ref().to_path_buf());
        }
        self
    }

    /// Uses an existing store instead of opening a database file.
    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Zone used for calendar dates in imports and CSV files. Defaults to
    /// the system zone.
    pub fn with_time_zone(mut self, time_zone: TimeZone) -> Self {
        self.time_zone = Some(time_zone);
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Builds the configured pipeline, seeding the default configuration on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::FileSystem` if the database directory cannot
    /// be created, `PipelineError::XdgDirectory` if no default path can be
    /// determined and `PipelineError::Database` if initialization fails.
    pub async fn build(self) -> Result<Pipeline> {
        let store: Arc<dyn DocumentStore> = match self.store {
            Some(store) => store,
            None => {
                let db_path = if let Some(path) = self.database_path {
                    path
                } else {
                    Self::default_database_path()?
                };

                if let Some(parent) = db_path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| PipelineError::FileSystem {
                        path: parent.to_path_buf(),
                        source: e,
                    })?;
                }

                let store = task::spawn_blocking(move || SqliteStore::open(&db_path))
                    .await
                    .map_err(PipelineError::join)??;
                Arc::new(store)
            }
        };

        let seed_store = Arc::clone(&store);
        let config = task::spawn_blocking(move || Configuration::load_or_seed(seed_store.as_ref()))
            .await
            .map_err(PipelineError::join)??;

        let time_zone = self.time_zone.unwrap_or_else(TimeZone::system);
        Ok(Pipeline::new(store, config, time_zone, self.debounce))
    }

    /// Returns the default database path following XDG Base Directory
    /// specification.
    fn default_database_path() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("stitch")
            .place_data_file("stitch.db")
            .map_err(|e| PipelineError::XdgDirectory(e.to_string()))
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("database_path", &self.database_path)
            .field("custom_store", &self.store.is_some())
            .field("time_zone", &self.time_zone)
            .field("debounce", &self.debounce)
            .finish()
    }
}
