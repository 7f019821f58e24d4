//! Runtime configuration snapshot.
//!
//! Flows, the field registry, per-stage column layouts and a few settings
//! are stored as plain JSON documents in the configuration collection. They
//! are loaded once into a [`Configuration`], seeded with defaults on first
//! use, and passed explicitly to the components that need them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::fields::{visible_columns, ColumnConfig, FieldDefinition, FieldRegistry};
use crate::flows::FlowRegistry;
use crate::inventory::DEFAULT_INVENTORY;
use crate::models::Stage;
use crate::store::{self, DocumentStore, CONFIGURATION};

pub const FLOWS_DOC: &str = "flows";
pub const FIELDS_DOC: &str = "fields";
pub const COLUMNS_DOC: &str = "columns";
pub const SETTINGS_DOC: &str = "settings";

/// Scalar settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Inventory consulted when no stock condition names one
    pub default_inventory: String,
    /// Stage payments tracked during billing
    pub billing_payments: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_inventory: DEFAULT_INVENTORY.to_string(),
            billing_payments: 2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ColumnsDocument {
    stages: BTreeMap<Stage, ColumnConfig>,
}

/// Everything the pure components read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    pub flows: FlowRegistry,
    pub fields: FieldRegistry,
    /// Saved column layouts; stages without one use category defaults
    pub columns: BTreeMap<Stage, ColumnConfig>,
    pub settings: Settings,
}

impl Configuration {
    /// Loads the configuration, writing defaults for any missing document.
    ///
    /// # Errors
    ///
    /// Returns store errors, or `PipelineError::Serialization` when a stored
    /// document does not match its shape.
    pub fn load_or_seed(store: &dyn DocumentStore) -> Result<Self> {
        let flows = load_or_seed_doc(store, FLOWS_DOC, FlowRegistry::default)?;
        let fields = load_or_seed_doc(store, FIELDS_DOC, FieldRegistry::default)?;
        let columns: ColumnsDocument = load_or_seed_doc(store, COLUMNS_DOC, ColumnsDocument::default)?;
        let settings = load_or_seed_doc(store, SETTINGS_DOC, Settings::default)?;
        Ok(Self {
            flows,
            fields,
            columns: columns.stages,
            settings,
        })
    }

    /// Writes every configuration document.
    pub fn save(&self, store: &dyn DocumentStore) -> Result<()> {
        self.save_flows(store)?;
        self.save_fields(store)?;
        self.save_columns(store)?;
        store.set(CONFIGURATION, SETTINGS_DOC, serde_json::to_value(&self.settings)?)
    }

    pub fn save_flows(&self, store: &dyn DocumentStore) -> Result<()> {
        store.set(CONFIGURATION, FLOWS_DOC, serde_json::to_value(&self.flows)?)
    }

    pub fn save_fields(&self, store: &dyn DocumentStore) -> Result<()> {
        store.set(CONFIGURATION, FIELDS_DOC, serde_json::to_value(&self.fields)?)
    }

    pub fn save_columns(&self, store: &dyn DocumentStore) -> Result<()> {
        let doc = ColumnsDocument {
            stages: self.columns.clone(),
        };
        store.set(CONFIGURATION, COLUMNS_DOC, serde_json::to_value(doc)?)
    }

    pub fn column_config(&self, stage: Stage) -> Option<&ColumnConfig> {
        self.columns.get(&stage)
    }

    /// Fields shown as columns for `stage`.
    pub fn visible_columns(&self, stage: Stage) -> Vec<&FieldDefinition> {
        visible_columns(&self.fields, stage, self.column_config(stage))
    }
}

fn load_or_seed_doc<T, F>(store: &dyn DocumentStore, id: &str, default: F) -> Result<T>
where
    T: Serialize + serde::de::DeserializeOwned,
    F: FnOnce() -> T,
{
    if let Some(value) = store::load::<T>(store, CONFIGURATION, id)? {
        return Ok(value);
    }
    let value = default();
    log::info!("Seeding default configuration document '{id}'");
    let doc: Value = serde_json::to_value(&value)?;
    store.set(CONFIGURATION, id, doc)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{Condition, ConditionKind};
    use crate::models::DEFAULT_FLOW_ID;
    use crate::store::MemoryStore;

    #[test]
    fn test_first_load_seeds_defaults() {
        let store = MemoryStore::new();
        let config = Configuration::load_or_seed(&store).unwrap();
        assert_eq!(config.flows, FlowRegistry::default());
        assert_eq!(config.settings.billing_payments, 2);
        assert!(config.columns.is_empty());

        for id in [FLOWS_DOC, FIELDS_DOC, COLUMNS_DOC, SETTINGS_DOC] {
            assert!(store.get(CONFIGURATION, id).unwrap().is_some(), "{id} not seeded");
        }
    }

    #[test]
    fn test_saved_changes_survive_reload() {
        let store = MemoryStore::new();
        let mut config = Configuration::load_or_seed(&store).unwrap();
        config
            .flows
            .set_exit_conditions(
                DEFAULT_FLOW_ID,
                Stage::Design,
                vec![Condition::new(ConditionKind::AssigneeSet)],
            )
            .unwrap();
        config
            .columns
            .insert(Stage::Design, ColumnConfig::new().show("designLink"));
        config.save(&store).unwrap();

        let reloaded = Configuration::load_or_seed(&store).unwrap();
        assert_eq!(reloaded, config);
        assert_eq!(reloaded.visible_columns(Stage::Design)[0].id, "designLink");
    }
}
