//! Tests for the pipeline module.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jiff::tz::TimeZone;
use tempfile::TempDir;

use super::*;
use crate::conditions::{Condition, ConditionKind};
use crate::fields::{ColumnConfig, FieldDefinition, FieldUpdate, ValueType};
use crate::inventory::GARMENT_STOCK;
use crate::models::{Actor, MovementKind, PAUSED_LABEL, READY_LABEL};
use crate::params::{
    AdvanceOrder, CancelOrder, CreateOrder, Id, ImportRow, ImportStock, ListOrders, MapHeaders,
    SetColumns, SetConditions, SetField,
};
use crate::store::{DocumentStore, MemoryStore, Patch, SnapshotCallback, Subscription};

const STOCK_SHEET: &str = "Type,Color,Size,Quantity\nPolo,Negro,M,5\nPolo,Blanco,L,1\n";

/// Helper function to create a test pipeline over an in-memory store
async fn create_test_pipeline() -> Pipeline {
    PipelineBuilder::new()
        .with_store(Arc::new(MemoryStore::new()))
        .with_time_zone(TimeZone::UTC)
        .with_debounce(Duration::from_millis(20))
        .build()
        .await
        .expect("Failed to create pipeline")
}

async fn create_order(pipeline: &Pipeline, size_detail: &str, total: f64) -> Order {
    pipeline
        .create_order(&CreateOrder {
            size_detail: Some(size_detail.to_string()),
            total,
            ..Default::default()
        })
        .await
        .expect("Failed to create order")
}

async fn set(pipeline: &Pipeline, id: &str, field: &str, value: &str) -> Order {
    pipeline
        .set_field(&SetField {
            id: id.to_string(),
            field: field.to_string(),
            value: value.to_string(),
            actor: Some(Actor::new("u1", "Ana")),
        })
        .await
        .expect("Failed to set field")
}

async fn advance(pipeline: &Pipeline, id: &str, from: Stage) -> AdvanceOutcome {
    pipeline
        .advance(&AdvanceOrder {
            id: id.to_string(),
            from,
            actor: Some(Actor::new("u1", "Ana")),
        })
        .await
        .expect("Failed to advance")
}

async fn stored(pipeline: &Pipeline, id: &str) -> Order {
    pipeline
        .get_order(&Id { id: id.to_string() })
        .await
        .expect("Failed to read order")
        .expect("Order missing")
}

async fn stock_in(pipeline: &Pipeline, csv: &str) {
    pipeline
        .import_stock(&ImportStock {
            inventory: None,
            csv: csv.to_string(),
            actor: None,
        })
        .await
        .expect("Failed to import stock");
}

/// Walks a fresh order into preparation with its stock already loaded.
async fn order_in_preparation(pipeline: &Pipeline) -> Order {
    stock_in(pipeline, STOCK_SHEET).await;
    let order = create_order(pipeline, "Polo Negro (M) x2", 0.0).await;
    set(pipeline, &order.id, "designLink", "https://x/mock.png").await;
    let outcome = advance(pipeline, &order.id, Stage::Design).await;
    assert!(outcome.is_advanced());
    stored(pipeline, &order.id).await
}

#[tokio::test]
async fn test_create_order_starts_in_design() {
    let pipeline = create_test_pipeline().await;
    let order = pipeline
        .create_order(&CreateOrder {
            total: 150.0,
            advance: 50.0,
            values: vec![("clientName".to_string(), "Rosa".to_string())],
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(order.id, "000001");
    assert_eq!(order.stage, Stage::Design);
    assert_eq!(order.stage_label, Stage::Design.label());
    assert_eq!(order.amounts.pending, 100.0);
    assert_eq!(order.extra["clientName"], "Rosa");
    assert!(order.record(Stage::Design).unwrap().entered_at.is_some());
    assert_eq!(order.change_log.len(), 1);
    assert_eq!(order.change_log[0].action, "Pedido Creado");
}

#[tokio::test]
async fn test_create_order_rejects_unknown_flow() {
    let pipeline = create_test_pipeline().await;
    let result = pipeline
        .create_order(&CreateOrder {
            flow_id: Some("nope".to_string()),
            ..Default::default()
        })
        .await;
    assert!(matches!(result, Err(PipelineError::Configuration { .. })));
}

#[tokio::test]
async fn test_advance_rejected_reports_missing_and_changes_nothing() {
    let pipeline = create_test_pipeline().await;
    let order = create_order(&pipeline, "Polo Negro (M)", 100.0).await;

    let outcome = advance(&pipeline, &order.id, Stage::Design).await;
    assert_eq!(
        outcome,
        AdvanceOutcome::Rejected {
            missing: vec!["URL Agregado".to_string()]
        }
    );
    assert_eq!(stored(&pipeline, &order.id).await, order);
}

#[tokio::test]
async fn test_design_to_billing_stamps_both_records() {
    let pipeline = create_test_pipeline().await;
    let order = create_order(&pipeline, "Polo Negro (M)", 100.0).await;
    set(&pipeline, &order.id, "designLink", "https://x/mock.png").await;

    let AdvanceOutcome::Advanced { order: moved, from, to } =
        advance(&pipeline, &order.id, Stage::Design).await
    else {
        panic!("expected an advance");
    };
    assert_eq!((from, to), (Stage::Design, Stage::Billing));
    assert_eq!(moved.stage, Stage::Billing);
    assert_eq!(moved.stage_label, "En Cobranza");
    let design = moved.record(Stage::Design).unwrap();
    assert!(design.exited_at.is_some());
    assert_eq!(design.status.as_deref(), Some("TERMINADO"));
    assert!(moved.record(Stage::Billing).unwrap().entered_at.is_some());
    assert!(moved.elapsed.total >= 0.0);

    let last = moved.change_log.last().unwrap();
    assert_eq!(last.action, "Diseño Completado");
    assert_eq!(last.detail, "En Diseño → En Cobranza por Ana");
}

#[tokio::test]
async fn test_each_advance_appends_exactly_one_entry() {
    let pipeline = create_test_pipeline().await;
    let order = create_order(&pipeline, "Polo Negro (M)", 100.0).await;
    set(&pipeline, &order.id, "designLink", "https://x").await;
    let before = stored(&pipeline, &order.id).await.change_log.len();

    advance(&pipeline, &order.id, Stage::Design).await;
    assert_eq!(stored(&pipeline, &order.id).await.change_log.len(), before + 1);

    // rejected attempts log nothing
    advance(&pipeline, &order.id, Stage::Billing).await;
    assert_eq!(stored(&pipeline, &order.id).await.change_log.len(), before + 1);

    set(&pipeline, &order.id, "billingPay1", "100").await;
    advance(&pipeline, &order.id, Stage::Billing).await;
    let after = stored(&pipeline, &order.id).await;
    assert_eq!(after.change_log.len(), before + 3);
    assert_eq!(after.stage, Stage::Preparation);
}

#[tokio::test]
async fn test_billing_requires_no_balance() {
    let pipeline = create_test_pipeline().await;
    let order = create_order(&pipeline, "Polo Negro (M)", 100.0).await;
    set(&pipeline, &order.id, "designLink", "https://x").await;
    advance(&pipeline, &order.id, Stage::Design).await;

    let outcome = advance(&pipeline, &order.id, Stage::Billing).await;
    assert_eq!(
        outcome,
        AdvanceOutcome::Rejected {
            missing: vec!["No Debe Nada".to_string()]
        }
    );

    let paid = set(&pipeline, &order.id, "billingPay1", "60").await;
    assert_eq!(paid.amounts.pending, 40.0);
    let paid = set(&pipeline, &order.id, "billingPay2", "40").await;
    assert_eq!(paid.amounts.pending, 0.0);
    assert!(advance(&pipeline, &order.id, Stage::Billing).await.is_advanced());
}

#[tokio::test]
async fn test_stage_mismatch_and_closed_orders() {
    let pipeline = create_test_pipeline().await;
    let order = create_order(&pipeline, "Polo Negro (M)", 0.0).await;

    let err = pipeline
        .advance(&AdvanceOrder {
            id: order.id.clone(),
            from: Stage::Billing,
            actor: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::StageMismatch {
            expected: Stage::Billing,
            actual: Stage::Design,
            ..
        }
    ));

    pipeline
        .cancel_order(&CancelOrder {
            id: order.id.clone(),
            reason: None,
            actor: None,
        })
        .await
        .unwrap();
    let err = pipeline
        .advance(&AdvanceOrder {
            id: order.id.clone(),
            from: Stage::Cancelled,
            actor: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_advance_unknown_order() {
    let pipeline = create_test_pipeline().await;
    let err = pipeline
        .advance(&AdvanceOrder {
            id: "404".to_string(),
            from: Stage::Design,
            actor: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::OrderNotFound { .. }));
}

#[tokio::test]
async fn test_nothing_owed_skips_billing() {
    let pipeline = create_test_pipeline().await;
    let order = create_order(&pipeline, "Polo Negro (M)", 0.0).await;
    set(&pipeline, &order.id, "designLink", "https://x").await;

    let outcome = advance(&pipeline, &order.id, Stage::Design).await;
    let AdvanceOutcome::Advanced { to, order: moved, .. } = outcome else {
        panic!("expected an advance");
    };
    assert_eq!(to, Stage::Preparation);
    assert!(moved.record(Stage::Billing).is_none());
}

#[tokio::test]
async fn test_entry_auto_skip_redirects() {
    let pipeline = create_test_pipeline().await;
    pipeline
        .set_conditions(&SetConditions {
            flow_id: None,
            stage: Stage::Stamping,
            exit_conditions: Vec::new(),
            entry_conditions: Some(vec![Condition::new(ConditionKind::OperatorAssigned)
                .on_stage(Stage::Preparation)
                .auto_skip_to(Stage::Packaging)]),
        })
        .await
        .unwrap();

    let order = order_in_preparation(&pipeline).await;
    set(&pipeline, &order.id, "preparationAssignee", "Luis").await;

    let AdvanceOutcome::Advanced { to, order: moved, .. } =
        advance(&pipeline, &order.id, Stage::Preparation).await
    else {
        panic!("expected an advance");
    };
    assert_eq!(to, Stage::Packaging);
    assert_eq!(moved.stage_label, "En Empaquetado");
    assert!(moved.record(Stage::Stamping).is_none());
    assert!(moved
        .change_log
        .last()
        .unwrap()
        .detail
        .ends_with("(salto automático desde En Estampado)"));
}

#[tokio::test]
async fn test_preparation_pauses_without_stock_and_recheck_releases() {
    let pipeline = create_test_pipeline().await;
    let order = create_order(&pipeline, "Polo Negro (M)", 0.0).await;
    set(&pipeline, &order.id, "designLink", "https://x").await;

    let AdvanceOutcome::Advanced { order: moved, .. } =
        advance(&pipeline, &order.id, Stage::Design).await
    else {
        panic!("expected an advance");
    };
    assert_eq!(moved.stage, Stage::Preparation);
    assert_eq!(moved.stage_label, PAUSED_LABEL);
    assert!(moved.hold.is_some());

    assert!(pipeline.recheck_paused(None).await.unwrap().is_empty());

    stock_in(&pipeline, STOCK_SHEET).await;
    let released = pipeline.recheck_paused(None).await.unwrap();
    assert_eq!(released, vec![order.id.clone()]);

    let order = stored(&pipeline, &order.id).await;
    assert_eq!(order.stage_label, READY_LABEL);
    assert!(order.hold.is_none());
    assert_eq!(
        order.change_log.last().unwrap().action,
        inventory_ops::RELEASED_ACTION
    );
}

#[tokio::test]
async fn test_leaving_preparation_draws_stock() {
    let pipeline = create_test_pipeline().await;
    let order = order_in_preparation(&pipeline).await;
    assert_eq!(order.stage_label, READY_LABEL);

    let outcome = advance(&pipeline, &order.id, Stage::Preparation).await;
    assert_eq!(
        outcome,
        AdvanceOutcome::Rejected {
            missing: vec!["Operador Asignado".to_string()]
        }
    );

    set(&pipeline, &order.id, "preparationAssignee", "Luis").await;
    assert!(advance(&pipeline, &order.id, Stage::Preparation)
        .await
        .is_advanced());

    let stock = pipeline.list_stock(None).await.unwrap();
    let polo = stock.iter().find(|r| r.color == "Negro").unwrap();
    assert_eq!(polo.quantity, 3);
    assert_eq!(polo.exits, 2);

    let history = pipeline.stock_history().await.unwrap();
    let exit = history
        .iter()
        .find(|m| m.action == MovementKind::Exit)
        .expect("no exit movement");
    assert_eq!(exit.quantity, 2);
    assert!(exit.detail.ends_with(&format!("Pedido {}", order.id)));
}

#[tokio::test]
async fn test_stock_conflict_leaves_everything_unchanged() {
    let pipeline = create_test_pipeline().await;
    let order = order_in_preparation(&pipeline).await;
    set(&pipeline, &order.id, "preparationAssignee", "Luis").await;

    // someone else consumed the stock after the order became ready
    let records = pipeline.list_stock(None).await.unwrap();
    let mut polo = records.into_iter().find(|r| r.color == "Negro").unwrap();
    polo.quantity = 1;
    pipeline
        .store()
        .set(GARMENT_STOCK, &polo.id, serde_json::to_value(&polo).unwrap())
        .unwrap();
    let before = stored(&pipeline, &order.id).await;

    let outcome = advance(&pipeline, &order.id, Stage::Preparation).await;
    assert!(matches!(
        outcome,
        AdvanceOutcome::StockConflict {
            shortfall: Shortfall::Insufficient {
                requested: 2,
                available: 1,
                ..
            }
        }
    ));
    assert_eq!(stored(&pipeline, &order.id).await, before);
    let polo = pipeline
        .list_stock(None)
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.color == "Negro")
        .unwrap();
    assert_eq!(polo.quantity, 1);
    assert_eq!(polo.exits, 0);
}

/// Memory store whose listings are slow enough to interleave callers.
struct SlowListStore {
    inner: MemoryStore,
    delay: Duration,
}

impl DocumentStore for SlowListStore {
    fn add(&self, collection: &str, doc: serde_json::Value) -> Result<String> {
        self.inner.add(collection, doc)
    }

    fn set(&self, collection: &str, id: &str, doc: serde_json::Value) -> Result<()> {
        self.inner.set(collection, id, doc)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<serde_json::Value>> {
        self.inner.get(collection, id)
    }

    fn update(&self, collection: &str, id: &str, patch: &Patch) -> Result<serde_json::Value> {
        self.inner.update(collection, id, patch)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.inner.delete(collection, id)
    }

    fn list(&self, collection: &str) -> Result<Vec<serde_json::Value>> {
        std::thread::sleep(self.delay);
        self.inner.list(collection)
    }

    fn subscribe(&self, collection: &str, callback: SnapshotCallback) -> Result<Subscription> {
        self.inner.subscribe(collection, callback)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_advances_commit_once() {
    let pipeline = PipelineBuilder::new()
        .with_store(Arc::new(SlowListStore {
            inner: MemoryStore::new(),
            delay: Duration::from_millis(10),
        }))
        .with_time_zone(TimeZone::UTC)
        .build()
        .await
        .unwrap();
    let order = order_in_preparation(&pipeline).await;
    set(&pipeline, &order.id, "preparationAssignee", "Luis").await;

    let spawn_advance = |pipeline: Pipeline, id: String| {
        tokio::spawn(async move {
            pipeline
                .advance(&AdvanceOrder {
                    id,
                    from: Stage::Preparation,
                    actor: None,
                })
                .await
        })
    };
    let first = spawn_advance(pipeline.clone(), order.id.clone());
    let second = spawn_advance(pipeline.clone(), order.id.clone());
    let results = [first.await.unwrap(), second.await.unwrap()];

    let advanced = results
        .iter()
        .filter(|r| matches!(r, Ok(outcome) if outcome.is_advanced()))
        .count();
    let stale = results
        .iter()
        .filter(|r| matches!(r, Err(PipelineError::StageMismatch { .. })))
        .count();
    assert_eq!((advanced, stale), (1, 1));

    let polo = pipeline
        .list_stock(None)
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.color == "Negro")
        .unwrap();
    assert_eq!(polo.quantity, 3);
    assert_eq!(polo.exits, 2);

    let moved = stored(&pipeline, &order.id).await;
    assert_eq!(moved.stage, Stage::Stamping);
    let exits = moved
        .change_log
        .iter()
        .filter(|e| e.action == Stage::Preparation.exit_action())
        .count();
    assert_eq!(exits, 1);
    let history = pipeline.stock_history().await.unwrap();
    assert_eq!(history.iter().filter(|m| m.action == MovementKind::Exit).count(), 1);
}

#[tokio::test]
async fn test_recheck_skips_orders_that_moved_on() {
    let pipeline = create_test_pipeline().await;
    let order = create_order(&pipeline, "Polo Negro (M)", 0.0).await;
    set(&pipeline, &order.id, "designLink", "https://x").await;
    assert!(advance(&pipeline, &order.id, Stage::Design).await.is_advanced());
    stock_in(&pipeline, STOCK_SHEET).await;

    // moved on by hand, leaving the stale hold behind
    pipeline
        .store()
        .update(
            ORDERS,
            &order.id,
            &Patch::new()
                .set("stage", Stage::Stamping.as_str())
                .set("stageLabel", Stage::Stamping.label()),
        )
        .unwrap();

    assert!(pipeline.recheck_paused(None).await.unwrap().is_empty());
    let order = stored(&pipeline, &order.id).await;
    assert_eq!(order.stage_label, Stage::Stamping.label());
}

#[tokio::test]
async fn test_check_stock_uses_preparation_inventory() {
    let pipeline = create_test_pipeline().await;
    let order = create_order(&pipeline, "Polo Blanco (L) x2", 0.0).await;
    stock_in(&pipeline, STOCK_SHEET).await;

    let verdict = pipeline.check_stock(&Id { id: order.id.clone() }).await.unwrap();
    assert!(!verdict.is_sufficient());
    assert!(matches!(
        verdict.shortfall(),
        Some(Shortfall::Insufficient { available: 1, .. })
    ));
}

#[tokio::test]
async fn test_cancel_records_reason() {
    let pipeline = create_test_pipeline().await;
    let order = create_order(&pipeline, "", 0.0).await;
    let cancelled = pipeline
        .cancel_order(&CancelOrder {
            id: order.id.clone(),
            reason: Some("cliente desistió".to_string()),
            actor: Some(Actor::new("u2", "Leo")),
        })
        .await
        .unwrap();
    assert_eq!(cancelled.stage, Stage::Cancelled);
    assert_eq!(cancelled.stage_label, "Anulado");
    let last = cancelled.change_log.last().unwrap();
    assert_eq!(last.action, "Pedido Anulado");
    assert_eq!(last.detail, "En Diseño → Anulado por Leo: cliente desistió");

    let open = pipeline.list_orders(&ListOrders::default()).await.unwrap();
    assert!(open.is_empty());
    let all = pipeline
        .list_orders(&ListOrders {
            stage: None,
            include_closed: true,
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_set_field_guards() {
    let pipeline = create_test_pipeline().await;
    let order = create_order(&pipeline, "", 0.0).await;

    for field in ["stage", "stageLabel", "amountPending", "designEnteredAt", "nope"] {
        let result = pipeline
            .set_field(&SetField {
                id: order.id.clone(),
                field: field.to_string(),
                value: "x".to_string(),
                actor: None,
            })
            .await;
        assert!(
            matches!(result, Err(PipelineError::InvalidInput { .. })),
            "{field} should be rejected"
        );
    }

    let updated = set(&pipeline, &order.id, "stageRecord.design.link", "https://x").await;
    assert_eq!(updated.record(Stage::Design).unwrap().link.as_deref(), Some("https://x"));
    assert_eq!(updated.change_log.last().unwrap().action, "Campo Actualizado");
}

#[tokio::test]
async fn test_queued_edits_are_flushed_before_advance() {
    let pipeline = create_test_pipeline().await;
    let order = create_order(&pipeline, "Polo Negro (M)", 0.0).await;

    pipeline
        .queue_field(&SetField {
            id: order.id.clone(),
            field: "designLink".to_string(),
            value: "https://draft".to_string(),
            actor: None,
        })
        .await
        .unwrap();
    pipeline
        .queue_field(&SetField {
            id: order.id.clone(),
            field: "designLink".to_string(),
            value: "https://final".to_string(),
            actor: None,
        })
        .await
        .unwrap();
    assert!(pipeline.has_pending_writes(&order.id));

    let AdvanceOutcome::Advanced { order: moved, .. } =
        advance(&pipeline, &order.id, Stage::Design).await
    else {
        panic!("queued link was not committed");
    };
    assert!(!pipeline.has_pending_writes(&order.id));
    assert_eq!(
        moved.record(Stage::Design).unwrap().link.as_deref(),
        Some("https://final")
    );
}

#[tokio::test]
async fn test_queued_edit_commits_after_debounce() {
    let pipeline = create_test_pipeline().await;
    let order = create_order(&pipeline, "", 0.0).await;
    pipeline
        .queue_field(&SetField {
            id: order.id.clone(),
            field: "clientName".to_string(),
            value: "Rosa".to_string(),
            actor: None,
        })
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!pipeline.has_pending_writes(&order.id));
    let doc = pipeline.store().get(crate::store::ORDERS, &order.id).unwrap().unwrap();
    assert_eq!(doc["clientName"], "Rosa");
}

#[tokio::test]
async fn test_stock_import_merges_and_exports() {
    let pipeline = create_test_pipeline().await;
    stock_in(&pipeline, STOCK_SHEET).await;
    stock_in(&pipeline, "TIPO,TALLA,CANTIDAD\npolo,m,2\nGorra,U,3\n").await;

    let records = pipeline.list_stock(None).await.unwrap();
    assert_eq!(records.len(), 4);
    let unico = records.iter().find(|r| r.kind == "Gorra").unwrap();
    assert_eq!(unico.color, "Unico");

    let csv = pipeline.export_stock(None).await.unwrap();
    assert!(csv.starts_with("Type,Color,Size,Quantity\n"));
    assert!(csv.contains("Polo,Negro,M,5"));

    let entries = pipeline.stock_history().await.unwrap();
    assert_eq!(entries.len(), 4);
    assert!(entries.iter().all(|m| m.action == MovementKind::Entry));
}

#[tokio::test]
async fn test_history_round_trip() {
    let pipeline = create_test_pipeline().await;
    stock_in(&pipeline, STOCK_SHEET).await;
    let exported = pipeline.export_history().await.unwrap();

    let other = create_test_pipeline().await;
    assert_eq!(other.import_history(&exported).await.unwrap(), 2);

    let original = pipeline.stock_history().await.unwrap();
    let imported = other.stock_history().await.unwrap();
    for (a, b) in original.iter().zip(&imported) {
        assert_eq!(a.user, b.user);
        assert_eq!(a.action, b.action);
        assert_eq!(a.detail, b.detail);
        assert_eq!(a.quantity, b.quantity);
        assert_eq!(a.timestamp.as_second(), b.timestamp.as_second());
    }
}

#[tokio::test]
async fn test_import_row_creates_and_updates() {
    let pipeline = create_test_pipeline().await;
    let headers: Vec<String> = ["N° Pedido", "Nombre", "Total", "Adelanto", "Producto", "Estado General"]
        .iter()
        .map(ToString::to_string)
        .collect();

    let mapping = pipeline.map_headers(&MapHeaders {
        headers: headers.clone(),
        overrides: HashMap::new(),
    });
    assert!(mapping.unmapped.is_empty(), "unmapped: {:?}", mapping.unmapped);

    let row = |values: [&str; 6]| ImportRow {
        headers: headers.clone(),
        values: values.iter().map(ToString::to_string).collect(),
        overrides: HashMap::new(),
        actor: None,
    };

    let order = pipeline
        .import_row(&row(["120", "Rosa", "S/ 1.234,50", "234,50", "Polera x2, Gorra", "en pausa"]))
        .await
        .unwrap();
    assert_eq!(order.id, "120");
    assert!(order.imported);
    assert_eq!(order.amounts.total, 1234.5);
    assert_eq!(order.amounts.pending, 1000.0);
    assert_eq!(order.line_items.len(), 2);
    assert_eq!(order.line_items[0].quantity, 2);
    assert_eq!(order.stage, Stage::Preparation);
    assert_eq!(order.stage_label, PAUSED_LABEL);
    assert!(order.hold.is_some());
    assert_eq!(order.change_log.last().unwrap().action, "Pedido Importado");

    let updated = pipeline
        .import_row(&row(["120", "", "", "", "", "Finalizado"]))
        .await
        .unwrap();
    assert_eq!(updated.extra["clientName"], "Rosa");
    assert_eq!(updated.stage, Stage::Finalized);
    assert!(updated.finalized_at.is_some());
    assert!(updated.hold.is_none());
}

#[tokio::test]
async fn test_import_row_without_label_defaults_to_design() {
    let pipeline = create_test_pipeline().await;
    let order = pipeline
        .import_row(&ImportRow {
            headers: vec!["Nombre".to_string()],
            values: vec!["Rosa".to_string()],
            overrides: HashMap::new(),
            actor: None,
        })
        .await
        .unwrap();
    assert_eq!(order.id, "000001");
    assert_eq!(order.stage, Stage::Design);
    assert_eq!(order.stage_label, Stage::Design.label());
}

#[tokio::test]
async fn test_import_row_refuses_columns_it_cannot_place() {
    let pipeline = create_test_pipeline().await;
    let row = |headers: [&str; 2], overrides: HashMap<String, String>| ImportRow {
        headers: headers.iter().map(ToString::to_string).collect(),
        values: vec!["Rosa".to_string(), "x".to_string()],
        overrides,
        actor: None,
    };

    for headers in [["Nombre", "Qwxz Zzy"], ["Nombre", "Producto 5000000"]] {
        let err = pipeline.import_row(&row(headers, HashMap::new())).await.unwrap_err();
        match &err {
            PipelineError::UnmappedColumns { headers: unmapped } => {
                assert_eq!(unmapped, &vec![headers[1].to_string()]);
            }
            other => panic!("expected unmapped columns, got {other}"),
        }
    }
    assert!(pipeline
        .list_orders(&ListOrders {
            stage: None,
            include_closed: true,
        })
        .await
        .unwrap()
        .is_empty());

    let skip = HashMap::from([("Qwxz Zzy".to_string(), crate::mapping::DO_NOT_MAP.to_string())]);
    let order = pipeline.import_row(&row(["Nombre", "Qwxz Zzy"], skip)).await.unwrap();
    assert_eq!(order.extra["clientName"], "Rosa");
}

#[tokio::test]
async fn test_field_registry_changes_persist() {
    let pipeline = create_test_pipeline().await;
    let field = FieldDefinition::new("giftNote", "Dedicatoria", "giftNote", ValueType::Text, "order").editable();
    pipeline.add_field(field).await.unwrap();
    pipeline
        .update_field(
            "giftNote",
            FieldUpdate {
                label: Some("Nota de Regalo".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let order = create_order(&pipeline, "", 0.0).await;
    let updated = set(&pipeline, &order.id, "giftNote", "Feliz día").await;
    assert_eq!(updated.extra["giftNote"], "Feliz día");

    pipeline.reload_configuration().await.unwrap();
    assert_eq!(
        pipeline.configuration().fields.by_id("giftNote").unwrap().label,
        "Nota de Regalo"
    );
    assert!(pipeline.remove_field("id").await.is_err());
    pipeline.remove_field("giftNote").await.unwrap();
    assert!(pipeline.configuration().fields.by_id("giftNote").is_none());
}

#[tokio::test]
async fn test_column_layout() {
    let pipeline = create_test_pipeline().await;
    let bad = pipeline
        .set_columns(&SetColumns {
            stage: Stage::Design,
            config: ColumnConfig::new().show("nope"),
        })
        .await;
    assert!(matches!(bad, Err(PipelineError::InvalidInput { .. })));

    pipeline
        .set_columns(&SetColumns {
            stage: Stage::Design,
            config: ColumnConfig::new().show("designLink").show("clientName"),
        })
        .await
        .unwrap();
    let columns = pipeline.visible_columns(Stage::Design);
    assert_eq!(columns[0].id, "designLink");
    assert_eq!(columns[1].id, "clientName");
}

#[tokio::test]
async fn test_sqlite_pipeline_survives_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("nested").join("test.db");

    let id = {
        let pipeline = PipelineBuilder::new()
            .with_database_path(Some(&db_path))
            .with_time_zone(TimeZone::UTC)
            .build()
            .await
            .unwrap();
        let order = create_order(&pipeline, "Polo Negro (M)", 80.0).await;
        set(&pipeline, &order.id, "designLink", "https://x").await;
        assert!(advance(&pipeline, &order.id, Stage::Design).await.is_advanced());
        order.id
    };

    let pipeline = PipelineBuilder::new()
        .with_database_path(Some(&db_path))
        .build()
        .await
        .unwrap();
    let order = stored(&pipeline, &id).await;
    assert_eq!(order.stage, Stage::Billing);
    assert_eq!(order.amounts.pending, 80.0);
}

#[tokio::test]
async fn test_watcher_stops_on_shutdown() {
    let pipeline = create_test_pipeline().await;
    let (tx, rx) = tokio::sync::watch::channel(false);
    let handle = pipeline.spawn_watcher(Duration::from_millis(10), rx);
    tokio::time::sleep(Duration::from_millis(30)).await;
    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("watcher did not stop")
        .unwrap();
}
