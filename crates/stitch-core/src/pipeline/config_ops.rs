//! Configuration operations for the Pipeline.
//!
//! Every write clones the current snapshot, mutates the clone, persists the
//! touched document and only then swaps the snapshot in. Readers keep the
//! snapshot they started with.

use std::sync::Arc;

use crate::config::Configuration;
use crate::error::{PipelineError, Result};
use crate::fields::{FieldDefinition, FieldUpdate};
use crate::flows::Flow;
use crate::models::{Stage, DEFAULT_FLOW_ID};
use crate::params::{SetColumns, SetConditions};
use crate::store::DocumentStore;

use super::Pipeline;

type SaveFn = fn(&Configuration, &dyn DocumentStore) -> Result<()>;

impl Pipeline {
    /// Replaces the exit (and optionally entry) conditions of one stage.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Configuration` for an unknown flow and
    /// `PipelineError::InvalidInput` when the stage is not part of it or an
    /// auto-skip targets a stage outside the flow.
    pub async fn set_conditions(&self, params: &SetConditions) -> Result<Flow> {
        let flow_id = params
            .flow_id
            .clone()
            .unwrap_or_else(|| DEFAULT_FLOW_ID.to_string());
        let stage = params.stage;
        let params = params.clone();

        let flow = self
            .change_configuration(Configuration::save_flows, move |config| {
                config
                    .flows
                    .set_exit_conditions(&flow_id, params.stage, params.exit_conditions)?;
                if let Some(entry) = params.entry_conditions {
                    config
                        .flows
                        .set_entry_conditions(&flow_id, params.stage, entry)?;
                }
                Ok(config.flows.require(&flow_id)?.clone())
            })
            .await?;
        log::info!("Updated conditions of stage {} in flow {}", stage.as_str(), flow.id);
        Ok(flow)
    }

    /// Saves the column layout of one stage.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidInput` when the layout names a field
    /// the registry does not know.
    pub async fn set_columns(&self, params: &SetColumns) -> Result<()> {
        let params = params.clone();
        self.change_configuration(Configuration::save_columns, move |config| {
            let unknown = params
                .config
                .visibility
                .keys()
                .chain(params.config.order.iter())
                .find(|id| config.fields.by_id(id).is_none());
            if let Some(id) = unknown {
                return Err(PipelineError::invalid_input("columns")
                    .with_reason(format!("Unknown field '{id}'")));
            }
            config.columns.insert(params.stage, params.config);
            Ok(())
        })
        .await
    }

    /// Fields shown as columns for `stage`, in display order.
    pub fn visible_columns(&self, stage: Stage) -> Vec<FieldDefinition> {
        self.configuration()
            .visible_columns(stage)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn add_field(&self, field: FieldDefinition) -> Result<FieldDefinition> {
        let id = field.id.clone();
        self.change_configuration(Configuration::save_fields, move |config| {
            config.fields.add_field(field)?;
            registered(config, &id)
        })
        .await
    }

    pub async fn update_field(&self, id: &str, update: FieldUpdate) -> Result<FieldDefinition> {
        let id = id.to_string();
        self.change_configuration(Configuration::save_fields, move |config| {
            config.fields.update_field(&id, update)?;
            registered(config, &id)
        })
        .await
    }

    /// Removes a custom field. Stored order values are left in place.
    pub async fn remove_field(&self, id: &str) -> Result<FieldDefinition> {
        let id = id.to_string();
        self.change_configuration(Configuration::save_fields, move |config| {
            config.fields.remove_field(&id)
        })
        .await
    }

    pub async fn reorder_fields(&self, ids: &[String]) -> Result<()> {
        let ids = ids.to_vec();
        self.change_configuration(Configuration::save_fields, move |config| {
            config.fields.reorder(&ids)
        })
        .await
    }

    /// Reloads the configuration from the store, e.g. after another process
    /// changed it.
    pub async fn reload_configuration(&self) -> Result<()> {
        let _writer = self.config_writer.lock().await;
        let config = self.blocking(Configuration::load_or_seed).await?;
        self.replace_configuration(Arc::new(config));
        Ok(())
    }

    async fn change_configuration<T, F>(&self, save: SaveFn, mutate: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Configuration) -> Result<T>,
    {
        let _writer = self.config_writer.lock().await;
        let mut next = Configuration::clone(&self.configuration());
        let value = mutate(&mut next)?;

        let next = Arc::new(next);
        let to_save = Arc::clone(&next);
        self.blocking(move |store| save(&to_save, store)).await?;
        self.replace_configuration(next);
        Ok(value)
    }
}

fn registered(config: &Configuration, id: &str) -> Result<FieldDefinition> {
    config
        .fields
        .by_id(id)
        .cloned()
        .ok_or_else(|| PipelineError::configuration(format!("Field '{id}' vanished during update")))
}
