use std::time::Duration;

use jiff::tz::TimeZone;
use stitch_core::models::Actor;
use stitch_core::params::{AdvanceOrder, SetField};
use stitch_core::{AdvanceOutcome, Pipeline, PipelineBuilder, Stage};
use tempfile::TempDir;

/// Helper function to create a test pipeline backed by a temporary SQLite file
pub async fn create_test_pipeline() -> (TempDir, Pipeline) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let pipeline = PipelineBuilder::new()
        .with_database_path(Some(&db_path))
        .with_time_zone(TimeZone::UTC)
        .with_debounce(Duration::from_millis(20))
        .build()
        .await
        .expect("Failed to create pipeline");
    (temp_dir, pipeline)
}

pub fn operator() -> Actor {
    Actor::new("op-1", "Luis")
}

pub async fn set(pipeline: &Pipeline, id: &str, field: &str, value: &str) {
    pipeline
        .set_field(&SetField {
            id: id.to_string(),
            field: field.to_string(),
            value: value.to_string(),
            actor: Some(operator()),
        })
        .await
        .expect("Failed to set field");
}

pub async fn advance(pipeline: &Pipeline, id: &str, from: Stage) -> AdvanceOutcome {
    pipeline
        .advance(&AdvanceOrder {
            id: id.to_string(),
            from,
            actor: Some(operator()),
        })
        .await
        .expect("Failed to advance order")
}
