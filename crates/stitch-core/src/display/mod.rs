//! Display formatting for models, collections and operation results.
//!
//! Domain models implement [`std::fmt::Display`] directly (see [`models`]);
//! groups of them and operation outcomes go through the wrapper types
//! re-exported here. Every formatter emits markdown, which the CLI renders
//! for the terminal.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  Domain Models  │    │ Wrappers and    │    │   Markdown      │
//! │ (Order, Stock)  │───▶│ Result Types    │───▶│    Output       │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! - [`collections`]: Orders, StockListing, Fields, StockMovements
//! - [`results`]: create/update results, advance outcomes, mappings
//! - [`status`]: one-line confirmations
//! - [`datetime`]: timestamp and duration formatting
//!
//! # Example
//!
//! ```rust
//! use stitch_core::display::OperationStatus;
//!
//! let status = OperationStatus::success("Saved columns for design");
//! assert_eq!(status.to_string(), "Success: Saved columns for design\n");
//! ```

pub mod collections;
pub mod datetime;
pub mod models;
pub mod results;
pub mod status;

pub use collections::{Fields, Orders, StockListing, StockMovements};
pub use datetime::{Hours, LocalDateTime};
pub use results::{CreateResult, Released, UpdateResult};
pub use status::{OperationStatus, StatusKind};
