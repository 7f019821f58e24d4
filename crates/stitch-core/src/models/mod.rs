//! Data models for orders, stages, audit entries and stock.
//!
//! Display implementations for these models live in
//! [`crate::display::models`], keeping data structures apart from
//! presentation logic.
//!
//! # Examples
//!
//! ```rust
//! use jiff::Timestamp;
//! use stitch_core::models::{Order, Stage};
//!
//! let mut order = Order::new("000001", Timestamp::UNIX_EPOCH);
//! order.amounts.total = 150.0;
//! order.amounts.advance = 50.0;
//! order.recompute_pending();
//!
//! assert_eq!(order.stage, Stage::Design);
//! assert_eq!(order.amounts.pending, 100.0);
//! ```

pub mod change_log;
pub mod order;
pub mod stage;
pub mod stock;

#[cfg(test)]
mod tests;

pub use change_log::{Actor, ChangeLogEntry};
pub use order::{
    Amounts, Comment, Elapsed, Garment, LineItem, Order, StageRecord, StockHold, DEFAULT_FLOW_ID,
};
pub use stage::{Stage, PAUSED_LABEL, READY_LABEL};
pub use stock::{MovementKind, StockMovement, StockRecord};
