//! Field/column registry.
//!
//! The registry is the catalog of every field an order can carry: system
//! fields, per-stage fields and formula fields. It is data, persisted with
//! the rest of the configuration, and can be extended, reordered and hidden
//! at runtime. Orders are read and written through field paths, so a field
//! added here needs no code change to be importable, editable or displayed.
//!
//! - [`defaults`]: the catalog seeded on first use
//! - [`formula`]: declarative formulas evaluated on read
//! - [`columns`]: per-stage column visibility
//! - [`values`]: coercion of raw input and display formatting

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::path;

pub mod columns;
pub mod defaults;
pub mod formula;
pub mod values;

#[cfg(test)]
mod tests;

pub use columns::{visible_columns, ColumnConfig, COLUMN_FALLBACK_CAP};
pub use formula::Formula;
pub use values::{coerce_for_path, coerce_value, format_value, format_value_in, normalize_stage_label, parse_amount, parse_date, parse_line_items_text};

/// Category of the always-relevant fields.
pub const BASIC_CATEGORY: &str = "basic";

/// Value type of a field, used to coerce raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Text,
    Number,
    Date,
    Boolean,
    /// Text restricted to the field's options
    Enum,
}

/// Display format of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    Currency,
    Percentage,
    Hours,
    Date,
}

/// One registered field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: String,
    pub label: String,
    /// Dotted locator into the order document
    pub path: String,
    pub value_type: ValueType,
    pub category: String,
    /// Intrinsic display order
    pub order: u32,
    #[serde(default)]
    pub editable: bool,
    /// Shown by default when a stage has no saved column configuration
    #[serde(default)]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<Formula>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FieldFormat>,
    #[serde(default)]
    pub required: bool,
    /// System fields cannot be removed and keep their path and type
    #[serde(default)]
    pub is_system: bool,
}

impl FieldDefinition {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        path: impl Into<String>,
        value_type: ValueType,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            path: path::canonical(&path.into()),
            value_type,
            category: category.into(),
            order: 0,
            editable: false,
            visible: false,
            options: Vec::new(),
            formula: None,
            format: None,
            required: false,
            is_system: false,
        }
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn visible(mut self) -> Self {
        self.visible = true;
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    pub fn with_format(mut self, format: FieldFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_formula(mut self, formula: Formula) -> Self {
        self.formula = Some(formula);
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_formula(&self) -> bool {
        self.formula.is_some()
    }

    /// Last segment of the path, e.g. `link` for `stageRecord.design.link`.
    pub fn leaf(&self) -> &str {
        path::leaf(&self.path)
    }
}

/// Changes applied by [`FieldRegistry::update_field`]; `None` keeps the
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldUpdate {
    pub label: Option<String>,
    pub order: Option<u32>,
    pub visible: Option<bool>,
    pub editable: Option<bool>,
    pub options: Option<Vec<String>>,
    pub category: Option<String>,
    pub format: Option<FieldFormat>,
    /// Ignored for system fields
    pub path: Option<String>,
    /// Ignored for system fields
    pub value_type: Option<ValueType>,
    pub formula: Option<Formula>,
}

/// The catalog of fields, kept sorted by intrinsic order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRegistry {
    fields: Vec<FieldDefinition>,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::from_fields(defaults::default_fields())
    }
}

impl FieldRegistry {
    /// Builds a registry, sorting by intrinsic order (stable on ties).
    pub fn from_fields(mut fields: Vec<FieldDefinition>) -> Self {
        fields.sort_by_key(|f| f.order);
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn by_id(&self, id: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Field registered for a path, in either dotted or bracketed form.
    pub fn by_path(&self, field_path: &str) -> Option<&FieldDefinition> {
        let wanted = path::canonical(field_path);
        self.fields.iter().find(|f| f.path == wanted)
    }

    /// Fields of one category, in order.
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a FieldDefinition> + 'a {
        self.fields.iter().filter(move |f| f.category == category)
    }

    /// Registers a new field. A zero order places it last.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidInput` when the id or path is empty or
    /// already taken, or the path does not parse.
    pub fn add_field(&mut self, mut field: FieldDefinition) -> Result<()> {
        if field.id.trim().is_empty() {
            return Err(PipelineError::invalid_input("id").with_reason("Field id cannot be empty"));
        }
        path::parse(&field.path)?;
        field.path = path::canonical(&field.path);
        if self.by_id(&field.id).is_some() {
            return Err(PipelineError::invalid_input("id")
                .with_reason(format!("Field id '{}' already exists", field.id)));
        }
        if self.by_path(&field.path).is_some() {
            return Err(PipelineError::invalid_input("path")
                .with_reason(format!("Path '{}' already has a field", field.path)));
        }
        if field.order == 0 {
            field.order = self.fields.iter().map(|f| f.order).max().unwrap_or(0) + 1;
        }
        self.fields.push(field);
        self.fields.sort_by_key(|f| f.order);
        Ok(())
    }

    /// Applies an update to one field.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidInput` for an unknown id, or a new path
    /// that does not parse or is already taken.
    pub fn update_field(&mut self, id: &str, update: FieldUpdate) -> Result<()> {
        let new_path = match update.path.as_deref() {
            Some(p) => {
                path::parse(p)?;
                let canonical = path::canonical(p);
                if self.fields.iter().any(|f| f.path == canonical && f.id != id) {
                    return Err(PipelineError::invalid_input("path")
                        .with_reason(format!("Path '{canonical}' already has a field")));
                }
                Some(canonical)
            }
            None => None,
        };

        let field = self
            .fields
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| unknown_field(id))?;

        if let Some(label) = update.label {
            field.label = label;
        }
        if let Some(order) = update.order {
            field.order = order;
        }
        if let Some(visible) = update.visible {
            field.visible = visible;
        }
        if let Some(editable) = update.editable {
            field.editable = editable;
        }
        if let Some(options) = update.options {
            field.options = options;
        }
        if let Some(category) = update.category {
            field.category = category;
        }
        if update.format.is_some() {
            field.format = update.format;
        }
        if !field.is_system {
            if let Some(new_path) = new_path {
                field.path = new_path;
            }
            if let Some(value_type) = update.value_type {
                field.value_type = value_type;
            }
            if update.formula.is_some() {
                field.formula = update.formula;
            }
        }
        self.fields.sort_by_key(|f| f.order);
        Ok(())
    }

    /// Removes a non-system field and returns it.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidInput` for an unknown id or a system
    /// field.
    pub fn remove_field(&mut self, id: &str) -> Result<FieldDefinition> {
        let pos = self
            .fields
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| unknown_field(id))?;
        if self.fields[pos].is_system {
            return Err(PipelineError::invalid_input("id")
                .with_reason(format!("System field '{id}' cannot be removed")));
        }
        Ok(self.fields.remove(pos))
    }

    /// Renumbers fields so `ids` come first in the given order; the rest
    /// keep their relative order after them.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidInput` when an id is unknown.
    pub fn reorder(&mut self, ids: &[String]) -> Result<()> {
        if let Some(missing) = ids.iter().find(|id| self.by_id(id).is_none()) {
            return Err(unknown_field(missing));
        }
        let mut reordered: Vec<FieldDefinition> = Vec::with_capacity(self.fields.len());
        for id in ids {
            if let Some(pos) = self.fields.iter().position(|f| &f.id == id) {
                reordered.push(self.fields.remove(pos));
            }
        }
        reordered.append(&mut self.fields);
        for (pos, field) in reordered.iter_mut().enumerate() {
            field.order = u32::try_from(pos + 1).unwrap_or(u32::MAX);
        }
        self.fields = reordered;
        Ok(())
    }

    /// Current value of a field on an order document; formula fields are
    /// evaluated here rather than read from storage.
    pub fn value_of(&self, field: &FieldDefinition, doc: &Value) -> Option<Value> {
        match &field.formula {
            Some(formula) => formula.evaluate(doc).map(Value::from),
            None => path::get(doc, &field.path)
                .filter(|v| !v.is_null())
                .cloned(),
        }
    }

    /// Value of a field by id, formatted for display.
    pub fn display_value(&self, id: &str, doc: &Value) -> Option<String> {
        let field = self.by_id(id)?;
        Some(format_value(field, self.value_of(field, doc).as_ref()))
    }
}

fn unknown_field(id: &str) -> PipelineError {
    PipelineError::invalid_input("id").with_reason(format!("Unknown field '{id}'"))
}
