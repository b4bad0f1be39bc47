//! # StockBridge Operator CLI
//!
//! Entry point for manual sync triggers and ledger operations.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CLI Startup                                      │
//! │                                                                         │
//! │  1. Initialize tracing (stderr, RUST_LOG aware)                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  2. Parse arguments (clap)                                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  3. Load SyncConfig (defaults → TOML → env) and validate               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  4. Open SQLite database, run migrations                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  5. Dispatch subcommand, print JSON to stdout                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `config` subcommands stop after step 3 and never touch the database.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    config::ConfigCommand, item::ItemCommand, product::ProductCommand, report::ReportCommand,
    sync::SyncCommand, AppContext,
};

/// Stock ledger and TOTVS MODA synchronization.
#[derive(Debug, Parser)]
#[command(name = "stockbridge", version, about, long_about = None)]
struct Cli {
    /// Path to stockbridge.toml (defaults to the platform config dir)
    #[arg(long, global = true, env = "STOCKBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// User recorded as the actor of ledger changes
    #[arg(long, global = true, env = "STOCKBRIDGE_ACTOR", default_value = "operator")]
    actor: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pull from or push to the ERP
    #[command(subcommand)]
    Sync(SyncCommand),

    /// Inventory line operations
    #[command(subcommand)]
    Item(ItemCommand),

    /// Product catalog
    #[command(subcommand)]
    Product(ProductCommand),

    /// Stock reports
    #[command(subcommand)]
    Report(ReportCommand),

    /// Inspect or write the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let command = match cli.command {
        Command::Config(cmd) => return cmd.run(cli.config),
        command => command,
    };

    let ctx = AppContext::open(cli.config, &cli.actor).await?;

    let result = match command {
        Command::Sync(cmd) => cmd.run(&ctx).await,
        Command::Item(cmd) => cmd.run(&ctx).await,
        Command::Product(cmd) => cmd.run(&ctx).await,
        Command::Report(cmd) => cmd.run(&ctx).await,
        // handled before the database is opened
        Command::Config(_) => Ok(()),
    };

    ctx.db.close().await;
    result
}

/// Logs go to stderr so stdout stays machine readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockbridge=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
