//! Stitch CLI Application
//!
//! Command-line interface for the Stitch order pipeline.

mod args;
mod cli;
mod renderer;

use anyhow::{Context, Result};
use args::{Args, Commands};
use clap::Parser;
use cli::Cli;
use log::info;
use renderer::TerminalRenderer;
use stitch_core::{params::ListOrders, PipelineBuilder};
use Commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        database_file,
        no_color,
        user,
        command,
    } = Args::parse();

    let pipeline = PipelineBuilder::new()
        .with_database_path(database_file)
        .build()
        .await
        .context("Failed to initialize pipeline")?;

    let cli = Cli::new(pipeline, TerminalRenderer::new(!no_color), user);

    info!("Stitch started");

    match command {
        Some(Order { command }) => cli.handle_order_command(command).await?,
        Some(Fields { command }) => cli.handle_field_command(command)?,
        Some(Flow { command }) => cli.handle_flow_command(command).await?,
        Some(Columns { command }) => cli.handle_column_command(command).await?,
        Some(Import { command }) => cli.handle_import_command(command).await?,
        Some(Stock { command }) => cli.handle_stock_command(command).await?,
        Some(Recheck) => cli.recheck().await?,
        Some(Watch { interval }) => cli.watch(interval).await?,
        None => cli.list_orders(&ListOrders::default()).await?,
    }
    cli.finish().await
}
