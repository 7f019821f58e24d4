use serde_json::json;

use super::*;

fn custom(id: &str, path: &str) -> FieldDefinition {
    FieldDefinition::new(id, "Mostacero", path, ValueType::Number, "billing").editable()
}

#[test]
fn test_default_catalog_is_consistent() {
    let registry = FieldRegistry::default();
    let mut ids: Vec<&str> = registry.fields().iter().map(|f| f.id.as_str()).collect();
    let mut paths: Vec<&str> = registry.fields().iter().map(|f| f.path.as_str()).collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    paths.sort_unstable();
    paths.dedup();
    assert_eq!(ids.len(), total, "field ids must be unique");
    assert_eq!(paths.len(), total, "field paths must be unique");

    assert_eq!(registry.by_path("lineItems.2.product").unwrap().label, "Producto 3");
    assert_eq!(registry.by_path("comments[3].text").unwrap().label, "Texto C4");
    assert_eq!(registry.by_id("clientContact").unwrap().label, "Teléfono");
    assert!(registry.by_id("amountPending").unwrap().is_formula());
    assert!(registry.fields().windows(2).all(|w| w[0].order <= w[1].order));
}

#[test]
fn test_add_field_rejects_duplicates() {
    let mut registry = FieldRegistry::default();
    registry.add_field(custom("mostacero", "amounts.mostacero")).unwrap();
    let added = registry.by_id("mostacero").unwrap();
    assert_eq!(added.order, registry.fields().last().unwrap().order);

    let same_id = registry.add_field(custom("mostacero", "amounts.other")).unwrap_err();
    assert!(matches!(same_id, PipelineError::InvalidInput { ref field, .. } if field == "id"));

    let same_path = registry.add_field(custom("other", "amounts.mostacero")).unwrap_err();
    assert!(matches!(same_path, PipelineError::InvalidInput { ref field, .. } if field == "path"));

    assert!(registry.add_field(custom("broken", "a..b")).is_err());
}

#[test]
fn test_update_field_keeps_system_path_and_type() {
    let mut registry = FieldRegistry::default();
    registry
        .update_field(
            "stageLabel",
            FieldUpdate {
                label: Some("Estado".to_string()),
                path: Some("status".to_string()),
                value_type: Some(ValueType::Number),
                ..FieldUpdate::default()
            },
        )
        .unwrap();
    let field = registry.by_id("stageLabel").unwrap();
    assert_eq!(field.label, "Estado");
    assert_eq!(field.path, "stageLabel");
    assert_eq!(field.value_type, ValueType::Text);

    let err = registry
        .update_field("nope", FieldUpdate::default())
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput { .. }));
}

#[test]
fn test_remove_field_protects_system_fields() {
    let mut registry = FieldRegistry::default();
    assert!(registry.remove_field("id").is_err());
    let removed = registry.remove_field("clientEmail").unwrap();
    assert_eq!(removed.path, "clientEmail");
    assert!(registry.by_id("clientEmail").is_none());
}

#[test]
fn test_reorder_moves_listed_ids_first() {
    let mut registry = FieldRegistry::default();
    registry
        .reorder(&["designLink".to_string(), "clientName".to_string()])
        .unwrap();
    let fields = registry.fields();
    assert_eq!(fields[0].id, "designLink");
    assert_eq!(fields[1].id, "clientName");
    assert_eq!(fields[2].id, "id");
    assert_eq!(fields[0].order, 1);

    assert!(registry.reorder(&["missing".to_string()]).is_err());
}

#[test]
fn test_value_of_evaluates_formulas_lazily() {
    let registry = FieldRegistry::default();
    let doc = json!({
        "amounts": { "total": 150.0, "advance": 50.0, "pending": 999.0 },
        "stageRecord": {
            "billing": { "pay1": 25.0 },
            "design": { "enteredAt": "2026-01-01T00:00:00Z", "exitedAt": "2026-01-01T03:00:00Z" }
        },
        "clientName": "Ana"
    });

    let pending = registry.by_id("amountPending").unwrap();
    assert_eq!(registry.value_of(pending, &doc), Some(json!(75.0)));

    let design_hours = registry.by_id("designHours").unwrap();
    assert_eq!(registry.value_of(design_hours, &doc), Some(json!(3.0)));

    let name = registry.by_id("clientName").unwrap();
    assert_eq!(registry.value_of(name, &doc), Some(json!("Ana")));
    assert_eq!(registry.value_of(registry.by_id("seller").unwrap(), &doc), None);

    assert_eq!(registry.display_value("amountPending", &doc).unwrap(), "S/ 75.00");
}
