//! Core library for the Stitch order pipeline.
//!
//! Custom-apparel orders move through a fixed sequence of production stages
//! (design, billing, preparation, stamping, packaging, delivery). This crate
//! decides when an order may leave its stage, draws garments from stock when
//! it leaves preparation and keeps every change on an append-only log.
//!
//! # Architecture
//!
//! - **Configuration** ([`fields`], [`flows`], [`config`]): the field
//!   registry, per-stage column layouts and the flows that list each stage's
//!   entry and exit conditions
//! - **Rules** ([`conditions`], [`inventory`], [`mapping`]): pure condition
//!   evaluation, the stock oracle and spreadsheet header mapping
//! - **Persistence** ([`store`], [`db`]): a document store abstraction with
//!   in-memory and SQLite backends
//! - **Coordination** ([`pipeline`]): the async [`Pipeline`] that ties the
//!   pieces together and owns locking and debounced writes
//! - **Display** ([`display`]): markdown formatting for the CLI
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use stitch_core::params::{AdvanceOrder, CreateOrder, SetField};
//! use stitch_core::store::MemoryStore;
//! use stitch_core::{AdvanceOutcome, PipelineBuilder, Stage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = PipelineBuilder::new()
//!     .with_store(Arc::new(MemoryStore::new()))
//!     .build()
//!     .await?;
//!
//! let order = pipeline
//!     .create_order(&CreateOrder {
//!         size_detail: Some("Polo Negro (M) x2".to_string()),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! pipeline
//!     .set_field(&SetField {
//!         id: order.id.clone(),
//!         field: "designLink".to_string(),
//!         value: "https://example.com/mockup.png".to_string(),
//!         actor: None,
//!     })
//!     .await?;
//!
//! let outcome = pipeline
//!     .advance(&AdvanceOrder {
//!         id: order.id.clone(),
//!         from: Stage::Design,
//!         actor: None,
//!     })
//!     .await?;
//!
//! if let AdvanceOutcome::Advanced { order, .. } = outcome {
//!     println!("{order}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod conditions;
pub mod config;
pub mod db;
pub mod display;
pub mod error;
pub mod fields;
pub mod flows;
pub mod inventory;
pub mod mapping;
pub mod models;
pub mod params;
pub mod path;
pub mod pending;
pub mod pipeline;
pub mod store;
pub mod text;

// Re-export commonly used types
pub use conditions::{Condition, ConditionKind};
pub use config::Configuration;
pub use db::Database;
pub use display::{CreateResult, OperationStatus, Orders, StockListing, UpdateResult};
pub use error::{PipelineError, Result};
pub use fields::{FieldDefinition, FieldRegistry, ValueType};
pub use flows::{Flow, FlowRegistry};
pub use inventory::{Shortfall, StockVerdict};
pub use mapping::HeaderMapping;
pub use models::{Actor, Order, Stage, StockMovement, StockRecord};
pub use params::{
    AdvanceOrder, CancelOrder, CreateOrder, Id, ImportRow, ImportStock, ListOrders, MapHeaders,
    SetColumns, SetConditions, SetField,
};
pub use pipeline::{AdvanceOutcome, Pipeline, PipelineBuilder};
