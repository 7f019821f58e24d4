use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::{
    ColumnCommands, FieldCommands, FlowCommands, ImportCommands, OrderCommands, StockCommands,
};

/// Command-line interface for the Stitch order pipeline
///
/// Stitch moves custom-apparel orders through design, billing, preparation,
/// stamping, packaging and delivery. Each stage only lets an order go once
/// its exit conditions hold, and leaving preparation draws the garments from
/// stock.
#[derive(Parser)]
#[command(version, about, name = "stitch")]
pub struct Args {
    /// Path to the SQLite database file. Defaults to
    /// $XDG_DATA_HOME/stitch/stitch.db
    #[arg(long, global = true)]
    pub database_file: Option<PathBuf>,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Name recorded in change logs and stock history
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for the Stitch CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Create, inspect, edit and advance orders
    #[command(alias = "o")]
    Order {
        #[command(subcommand)]
        command: OrderCommands,
    },
    /// Inspect the field registry
    #[command(alias = "f")]
    Fields {
        #[command(subcommand)]
        command: FieldCommands,
    },
    /// Show and configure flows
    Flow {
        #[command(subcommand)]
        command: FlowCommands,
    },
    /// Configure per-stage column layouts
    Columns {
        #[command(subcommand)]
        command: ColumnCommands,
    },
    /// Map and import spreadsheet data
    #[command(alias = "i")]
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Manage garment stock and its history
    #[command(alias = "s")]
    Stock {
        #[command(subcommand)]
        command: StockCommands,
    },
    /// Release paused orders whose stock has arrived
    Recheck,
    /// Periodically release paused orders until interrupted
    Watch {
        /// Seconds between rechecks
        #[arg(long, default_value_t = 60)]
        interval: u64,
    },
}
