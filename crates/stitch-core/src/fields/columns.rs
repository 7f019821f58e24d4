//! Per-stage column visibility and ordering.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{FieldDefinition, FieldRegistry, BASIC_CATEGORY};
use crate::models::Stage;

/// Size of the subset shown when a saved configuration hides everything.
pub const COLUMN_FALLBACK_CAP: usize = 15;

/// Saved column configuration of one stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Explicit visibility per field id
    pub visibility: BTreeMap<String, bool>,
    /// Field ids in their saved display order
    #[serde(alias = "orden")]
    pub order: Vec<String>,
}

impl ColumnConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(mut self, field_id: impl Into<String>) -> Self {
        let id = field_id.into();
        self.visibility.insert(id.clone(), true);
        if !self.order.contains(&id) {
            self.order.push(id);
        }
        self
    }

    pub fn hide(mut self, field_id: impl Into<String>) -> Self {
        self.visibility.insert(field_id.into(), false);
        self
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|o| o == id)
    }
}

fn category_default(field: &FieldDefinition, stage: Stage) -> bool {
    field.visible || field.category == BASIC_CATEGORY || field.category == stage.as_str()
}

/// Fields shown as columns for `stage`, in display order.
///
/// A field listed in the saved visibility map follows it. Without any saved
/// configuration the defaults are the field's own visibility flag, the
/// basic category and the stage's category. Saved-order fields come first,
/// the rest follow in intrinsic order. When nothing is left visible a
/// capped category subset is returned instead.
pub fn visible_columns<'a>(
    registry: &'a FieldRegistry,
    stage: Stage,
    config: Option<&ColumnConfig>,
) -> Vec<&'a FieldDefinition> {
    let mut columns: Vec<&FieldDefinition> = registry
        .fields()
        .iter()
        .filter(|field| match config {
            Some(config) => config
                .visibility
                .get(&field.id)
                .copied()
                .unwrap_or(field.visible),
            None => category_default(field, stage),
        })
        .collect();

    if let Some(config) = config {
        columns.sort_by_key(|field| (config.position(&field.id).unwrap_or(usize::MAX), field.order));
    }

    if columns.is_empty() {
        log::debug!("No visible columns for {}; using category fallback", stage.as_str());
        columns = registry
            .fields()
            .iter()
            .filter(|field| category_default(field, stage))
            .take(COLUMN_FALLBACK_CAP)
            .collect();
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(columns: &[&FieldDefinition]) -> Vec<String> {
        columns.iter().map(|f| f.id.clone()).collect()
    }

    #[test]
    fn test_defaults_cover_basic_and_stage_category() {
        let registry = FieldRegistry::default();
        let columns = visible_columns(&registry, Stage::Design, None);
        let ids = ids(&columns);
        assert!(ids.contains(&"id".to_string()));
        assert!(ids.contains(&"designLink".to_string()));
        assert!(ids.contains(&"designNotes".to_string()));
        assert!(!ids.contains(&"stampingNotes".to_string()));
    }

    #[test]
    fn test_saved_order_precedes_intrinsic_order() {
        let registry = FieldRegistry::default();
        let config = ColumnConfig::new()
            .show("designLink")
            .show("id")
            .hide("createdAt")
            .show("clientEmail");
        let columns = visible_columns(&registry, Stage::Design, Some(&config));
        let ids = ids(&columns);
        assert_eq!(&ids[..3], ["designLink", "id", "clientEmail"]);
        assert!(!ids.contains(&"createdAt".to_string()));
        // unlisted fields keep their own visibility flag
        assert!(ids.contains(&"stageLabel".to_string()));
        assert!(!ids.contains(&"clientSurname".to_string()));
    }

    #[test]
    fn test_everything_hidden_falls_back_to_capped_subset() {
        let registry = FieldRegistry::default();
        let mut config = ColumnConfig::new();
        for field in registry.fields() {
            config.visibility.insert(field.id.clone(), false);
        }
        let columns = visible_columns(&registry, Stage::Billing, Some(&config));
        assert!(!columns.is_empty());
        assert!(columns.len() <= COLUMN_FALLBACK_CAP);
        assert_eq!(columns[0].id, "id");
    }

    #[test]
    fn test_orden_alias_is_read() {
        let config: ColumnConfig =
            serde_json::from_str(r#"{"visibility": {"id": true}, "orden": ["id"]}"#).unwrap();
        assert_eq!(config.order, vec!["id"]);
    }
}
