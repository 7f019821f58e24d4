//! Subcommand definitions and their handlers.
//!
//! Argument structures carry the clap derives and convert into the core
//! parameter types, so nothing framework-specific leaks into `stitch-core`:
//!
//! ```text
//! User Input → CLI Args (clap) → Core Params → Pipeline
//! ```
//!
//! [`Cli`] then runs the resulting parameters against a
//! [`Pipeline`](stitch_core::Pipeline) and hands the markdown produced by the
//! core display types to the terminal renderer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use log::{info, warn};
use stitch_core::{
    conditions::{Condition, ConditionKind},
    display::{
        CreateResult, Fields, OperationStatus, Orders, Released, StockListing, StockMovements,
        UpdateResult,
    },
    fields::{parse_line_items_text, ColumnConfig},
    inventory::csv,
    models::{Actor, DEFAULT_FLOW_ID},
    params::*,
    Pipeline, Stage,
};

use crate::renderer::TerminalRenderer;

/// Parses `key=value` pairs for repeated assignment flags.
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Register a new order
#[derive(Args)]
pub struct CreateOrderArgs {
    /// Free-text garment detail, e.g. "Polo Negro (M) x2"
    #[arg(short, long)]
    pub sizes: Option<String>,
    /// Products, e.g. "Polera x2, Gorra"
    #[arg(short, long)]
    pub products: Option<String>,
    /// Order total
    #[arg(short, long, default_value_t = 0.0)]
    pub total: f64,
    /// Amount paid up front
    #[arg(short, long, default_value_t = 0.0)]
    pub advance: f64,
    /// Flow governing the order
    #[arg(long)]
    pub flow: Option<String>,
    /// Extra field values as FIELD=VALUE; may be repeated
    #[arg(long = "set", value_parser = parse_assignment)]
    pub values: Vec<(String, String)>,
}

impl From<CreateOrderArgs> for CreateOrder {
    fn from(val: CreateOrderArgs) -> Self {
        CreateOrder {
            flow_id: val.flow,
            line_items: val
                .products
                .as_deref()
                .map(parse_line_items_text)
                .unwrap_or_default(),
            size_detail: val.sizes,
            total: val.total,
            advance: val.advance,
            values: val.values,
            actor: None,
        }
    }
}

/// Show one order with its stages and change log
#[derive(Args)]
pub struct ShowOrderArgs {
    #[arg(help = "Identifier of the order to show")]
    pub id: String,
}

impl From<ShowOrderArgs> for Id {
    fn from(val: ShowOrderArgs) -> Self {
        Id { id: val.id }
    }
}

/// List orders
#[derive(Args)]
pub struct ListOrdersArgs {
    /// Only orders currently in this stage
    #[arg(short, long)]
    pub stage: Option<Stage>,
    /// Include finalized and cancelled orders
    #[arg(short, long)]
    pub all: bool,
}

impl From<ListOrdersArgs> for ListOrders {
    fn from(val: ListOrdersArgs) -> Self {
        ListOrders {
            stage: val.stage,
            include_closed: val.all,
        }
    }
}

/// Move an order out of its current stage
///
/// The stage the order is expected to be in must be given, so an advance
/// based on a stale listing is refused instead of skipping a stage.
#[derive(Args)]
pub struct AdvanceOrderArgs {
    pub id: String,
    /// Stage the order is expected to be in
    #[arg(short, long)]
    pub from: Stage,
}

impl From<AdvanceOrderArgs> for AdvanceOrder {
    fn from(val: AdvanceOrderArgs) -> Self {
        AdvanceOrder {
            id: val.id,
            from: val.from,
            actor: None,
        }
    }
}

/// Cancel an open order
#[derive(Args)]
pub struct CancelOrderArgs {
    pub id: String,
    #[arg(short, long)]
    pub reason: Option<String>,
}

impl From<CancelOrderArgs> for CancelOrder {
    fn from(val: CancelOrderArgs) -> Self {
        CancelOrder {
            id: val.id,
            reason: val.reason,
            actor: None,
        }
    }
}

/// Edit one field of an order
#[derive(Args)]
pub struct SetFieldArgs {
    pub id: String,
    #[arg(help = "Field id or field path, e.g. designLink or stageRecord.design.link")]
    pub field: String,
    #[arg(help = "Raw value; converted using the field's type")]
    pub value: String,
}

impl From<SetFieldArgs> for SetField {
    fn from(val: SetFieldArgs) -> Self {
        SetField {
            id: val.id,
            field: val.field,
            value: val.value,
            actor: None,
        }
    }
}

#[derive(Subcommand)]
pub enum OrderCommands {
    /// Register a new order
    #[command(alias = "c")]
    Create(CreateOrderArgs),
    /// Show one order
    #[command(alias = "s")]
    Show(ShowOrderArgs),
    /// List orders
    #[command(aliases = ["l", "ls"])]
    List(ListOrdersArgs),
    /// Move an order out of its current stage
    #[command(alias = "a")]
    Advance(AdvanceOrderArgs),
    /// Cancel an open order
    Cancel(CancelOrderArgs),
    /// Edit one field of an order
    Set(SetFieldArgs),
}

#[derive(Subcommand)]
pub enum FieldCommands {
    /// List every registered field
    #[command(aliases = ["l", "ls"])]
    List,
    /// Show the columns visible in a stage
    Columns {
        stage: Stage,
    },
}

/// Replace the conditions of one stage
///
/// Exit conditions are given either as kinds (`--exit link_added`) or as a
/// JSON list with parameters (`--exit-json '[{"type":"stock_available"}]'`).
#[derive(Args)]
pub struct SetConditionsArgs {
    pub stage: Stage,
    /// Exit condition kinds; may be repeated or comma-separated
    #[arg(long, value_delimiter = ',')]
    pub exit: Vec<String>,
    /// Exit conditions as a JSON list
    #[arg(long, conflicts_with = "exit")]
    pub exit_json: Option<String>,
    /// Entry conditions as a JSON list; entry conditions stay as they are
    /// when omitted
    #[arg(long)]
    pub entry_json: Option<String>,
    /// Inventory consulted by stock conditions given with --exit
    #[arg(long)]
    pub inventory: Option<String>,
    #[arg(long)]
    pub flow: Option<String>,
}

impl SetConditionsArgs {
    fn into_params(self) -> Result<SetConditions> {
        let exit_conditions = match &self.exit_json {
            Some(json) => parse_conditions(json).context("Invalid --exit-json")?,
            None => self
                .exit
                .iter()
                .map(|kind| {
                    let condition = Condition::new(ConditionKind::from(kind.clone()));
                    match &self.inventory {
                        Some(inventory) if condition.kind.reads_stock() => {
                            condition.with_inventory(inventory.clone())
                        }
                        _ => condition,
                    }
                })
                .collect(),
        };
        if let Some(unknown) = exit_conditions
            .iter()
            .find(|c| matches!(c.kind, ConditionKind::Unknown(_)))
        {
            bail!("Unknown condition kind '{}'", unknown.kind);
        }
        let entry_conditions = self
            .entry_json
            .as_deref()
            .map(parse_conditions)
            .transpose()
            .context("Invalid --entry-json")?;

        Ok(SetConditions {
            flow_id: self.flow,
            stage: self.stage,
            exit_conditions,
            entry_conditions,
        })
    }
}

fn parse_conditions(json: &str) -> Result<Vec<Condition>> {
    Ok(serde_json::from_str(json)?)
}

#[derive(Subcommand)]
pub enum FlowCommands {
    /// Show a flow with the effective conditions of every stage
    Show {
        #[arg(long)]
        flow: Option<String>,
    },
    /// Replace the conditions of one stage
    SetConditions(SetConditionsArgs),
}

/// Save which columns a stage shows and in what order
#[derive(Args)]
pub struct SetColumnsArgs {
    pub stage: Stage,
    /// Field ids to show, in display order
    #[arg(long, value_delimiter = ',')]
    pub show: Vec<String>,
    /// Field ids to hide
    #[arg(long, value_delimiter = ',')]
    pub hide: Vec<String>,
}

impl From<SetColumnsArgs> for SetColumns {
    fn from(val: SetColumnsArgs) -> Self {
        let config = val.show.into_iter().fold(ColumnConfig::new(), ColumnConfig::show);
        let config = val.hide.into_iter().fold(config, ColumnConfig::hide);
        SetColumns {
            stage: val.stage,
            config,
        }
    }
}

#[derive(Subcommand)]
pub enum ColumnCommands {
    /// Save a stage's column layout
    Set(SetColumnsArgs),
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Preview how spreadsheet headers map onto fields
    Headers {
        headers: Vec<String>,
        /// Manual choices as HEADER=FIELD, or HEADER=no-mapear to skip
        #[arg(long = "override", value_parser = parse_assignment)]
        overrides: Vec<(String, String)>,
    },
    /// Import every row of a CSV export; the first line holds the headers
    Rows {
        file: PathBuf,
        /// Manual choices as HEADER=FIELD; every unmapped header must be
        /// mapped or skipped before any row is imported
        #[arg(long = "override", value_parser = parse_assignment)]
        overrides: Vec<(String, String)>,
    },
}

#[derive(Subcommand)]
pub enum StockCommands {
    /// Add the quantities of a Type,Color,Size,Quantity file to stock
    Import {
        file: PathBuf,
        #[arg(long)]
        inventory: Option<String>,
    },
    /// List stock records
    #[command(aliases = ["l", "ls"])]
    List {
        #[arg(long)]
        inventory: Option<String>,
    },
    /// Print stock as CSV
    Export {
        #[arg(long)]
        inventory: Option<String>,
    },
    /// Check whether an order's garments are in stock
    Check { id: String },
    /// List stock movements
    History,
    /// Print stock movements as CSV
    HistoryExport,
    /// Load stock movements from a CSV file
    HistoryImport { file: PathBuf },
}

/// Runs parsed commands against a pipeline.
pub struct Cli {
    pipeline: Pipeline,
    renderer: TerminalRenderer,
    actor: Option<Actor>,
}

impl Cli {
    pub fn new(pipeline: Pipeline, renderer: TerminalRenderer, user: Option<String>) -> Self {
        let actor = user
            .filter(|u| !u.trim().is_empty())
            .map(|u| Actor::new(u.clone(), u));
        Self {
            pipeline,
            renderer,
            actor,
        }
    }

    /// Commits queued edits before the process exits.
    pub async fn finish(&self) -> Result<()> {
        self.pipeline
            .flush_all()
            .await
            .context("Failed to commit pending edits")?;
        Ok(())
    }

    pub async fn handle_order_command(&self, command: OrderCommands) -> Result<()> {
        match command {
            OrderCommands::Create(args) => {
                let mut params = CreateOrder::from(args);
                params.actor = self.actor.clone();
                let order = self.pipeline.create_order(&params).await?;
                self.renderer.render(&CreateResult::new(order).to_string())
            }
            OrderCommands::Show(args) => self.show_order(&args.into()).await,
            OrderCommands::List(args) => self.list_orders(&args.into()).await,
            OrderCommands::Advance(args) => {
                let mut params = AdvanceOrder::from(args);
                params.actor = self.actor.clone();
                let outcome = self.pipeline.advance(&params).await?;
                self.renderer.render(&outcome.to_string())
            }
            OrderCommands::Cancel(args) => {
                let mut params = CancelOrder::from(args);
                params.actor = self.actor.clone();
                let order = self.pipeline.cancel_order(&params).await?;
                self.renderer.render(
                    &UpdateResult::with_changes(order, vec!["Cancelled".to_string()]).to_string(),
                )
            }
            OrderCommands::Set(args) => {
                let mut params = SetField::from(args);
                params.actor = self.actor.clone();
                let change = format!("{} = {}", params.field, params.value);
                let order = self.pipeline.set_field(&params).await?;
                self.renderer
                    .render(&UpdateResult::with_changes(order, vec![change]).to_string())
            }
        }
    }

    pub async fn show_order(&self, params: &Id) -> Result<()> {
        match self.pipeline.get_order(params).await? {
            Some(order) => self.renderer.render(&order.to_string()),
            None => bail!("Order with ID {} not found", params.id),
        }
    }

    pub async fn list_orders(&self, params: &ListOrders) -> Result<()> {
        let orders = self.pipeline.list_orders(params).await?;
        self.renderer.render(&Orders(orders).to_string())
    }

    pub fn handle_field_command(&self, command: FieldCommands) -> Result<()> {
        let fields = match command {
            FieldCommands::List => self.pipeline.configuration().fields.fields().to_vec(),
            FieldCommands::Columns { stage } => self.pipeline.visible_columns(stage),
        };
        self.renderer.render(&Fields(fields).to_string())
    }

    pub async fn handle_flow_command(&self, command: FlowCommands) -> Result<()> {
        match command {
            FlowCommands::Show { flow } => {
                let config = self.pipeline.configuration();
                let flow = config
                    .flows
                    .require(flow.as_deref().unwrap_or(DEFAULT_FLOW_ID))?;
                self.renderer.render(&flow.to_string())
            }
            FlowCommands::SetConditions(args) => {
                let flow = self.pipeline.set_conditions(&args.into_params()?).await?;
                self.renderer.render(&flow.to_string())
            }
        }
    }

    pub async fn handle_column_command(&self, command: ColumnCommands) -> Result<()> {
        match command {
            ColumnCommands::Set(args) => {
                let params = SetColumns::from(args);
                self.pipeline.set_columns(&params).await?;
                let columns = self.pipeline.visible_columns(params.stage);
                self.renderer.render(&format!(
                    "{}\n{}",
                    OperationStatus::success(format!("Saved columns for {}", params.stage)),
                    Fields(columns)
                ))
            }
        }
    }

    pub async fn handle_import_command(&self, command: ImportCommands) -> Result<()> {
        match command {
            ImportCommands::Headers { headers, overrides } => {
                let mapping = self.pipeline.map_headers(&MapHeaders {
                    headers,
                    overrides: overrides.into_iter().collect(),
                });
                self.renderer.render(&mapping.to_string())
            }
            ImportCommands::Rows { file, overrides } => {
                self.import_rows(&read_file(&file)?, overrides.into_iter().collect())
                    .await
            }
        }
    }

    async fn import_rows(&self, text: &str, overrides: HashMap<String, String>) -> Result<()> {
        let mut rows = csv::parse_rows(text)?.into_iter();
        let Some(headers) = rows.next() else {
            bail!("The file has no header line");
        };
        let mapping = self.pipeline.map_headers(&MapHeaders {
            headers: headers.clone(),
            overrides: overrides.clone(),
        });
        if !mapping.is_complete() {
            self.renderer.render(&mapping.to_string())?;
            bail!(
                "Unmapped columns: {}. Map them with --override HEADER=FIELD or skip them with --override HEADER=no-mapear",
                mapping.unmapped.join(", ")
            );
        }

        let mut imported = 0usize;
        let mut failed = 0usize;
        for (index, values) in rows.enumerate() {
            if values.iter().all(|v| v.trim().is_empty()) {
                continue;
            }
            let params = ImportRow {
                headers: headers.clone(),
                values,
                overrides: overrides.clone(),
                actor: self.actor.clone(),
            };
            match self.pipeline.import_row(&params).await {
                Ok(_) => imported += 1,
                Err(e) => {
                    // header line is 1
                    warn!("Row {} was not imported: {e}", index + 2);
                    failed += 1;
                }
            }
        }

        info!("Imported {imported} rows, {failed} failed");
        let message = format!("Imported {imported} rows");
        let status = if failed == 0 {
            OperationStatus::success(message)
        } else {
            OperationStatus::warning(format!("{message}; {failed} rows failed"))
        };
        self.renderer.render(&status.to_string())
    }

    pub async fn handle_stock_command(&self, command: StockCommands) -> Result<()> {
        match command {
            StockCommands::Import { file, inventory } => {
                let merge = self
                    .pipeline
                    .import_stock(&ImportStock {
                        inventory,
                        csv: read_file(&file)?,
                        actor: self.actor.clone(),
                    })
                    .await?;
                self.renderer.render(&merge.to_string())
            }
            StockCommands::List { inventory } => {
                let records = self.pipeline.list_stock(inventory.as_deref()).await?;
                self.renderer.render(&StockListing(records).to_string())
            }
            StockCommands::Export { inventory } => {
                print!("{}", self.pipeline.export_stock(inventory.as_deref()).await?);
                Ok(())
            }
            StockCommands::Check { id } => {
                let verdict = self.pipeline.check_stock(&Id { id }).await?;
                self.renderer.render(&verdict.to_string())
            }
            StockCommands::History => {
                let movements = self.pipeline.stock_history().await?;
                self.renderer.render(&StockMovements(movements).to_string())
            }
            StockCommands::HistoryExport => {
                print!("{}", self.pipeline.export_history().await?);
                Ok(())
            }
            StockCommands::HistoryImport { file } => {
                let count = self.pipeline.import_history(&read_file(&file)?).await?;
                self.renderer.render(
                    &OperationStatus::success(format!("Imported {count} stock movements"))
                        .to_string(),
                )
            }
        }
    }

    pub async fn recheck(&self) -> Result<()> {
        let released = self.pipeline.recheck_paused(self.actor.as_ref()).await?;
        self.renderer.render(&Released(released).to_string())
    }

    /// Runs the paused-order watcher until Ctrl-C.
    pub async fn watch(&self, interval: u64) -> Result<()> {
        let (shutdown, receiver) = tokio::sync::watch::channel(false);
        let handle = self
            .pipeline
            .spawn_watcher(Duration::from_secs(interval), receiver);
        self.renderer.render(
            &OperationStatus::success(format!(
                "Rechecking paused orders every {interval}s, press Ctrl-C to stop"
            ))
            .to_string(),
        )?;

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        info!("Stopping the paused-order watcher");
        // the watcher also stops when the sender is gone
        let _ = shutdown.send(true);
        handle.await.context("Watcher task failed")?;
        Ok(())
    }
}
