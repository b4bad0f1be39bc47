//! # Sync Commands
//!
//! ## Command Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Commands                                    │
//! │                                                                         │
//! │  sync products         - Pull the ERP catalog                          │
//! │  sync stock            - Pull ERP stock levels                         │
//! │  sync full             - Products, settle delay, then stock            │
//! │  sync status           - Local sync counters and session state         │
//! │  sync test-connection  - Fresh login against the ERP                   │
//! │  sync peek             - Fetch one raw page without writing            │
//! │  sync push             - POST a JSON payload to an ERP endpoint        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Subcommand, ValueEnum};
use serde_json::{json, Value};
use stockbridge_sync::{ErpEnvelope, PageRequest, SyncResult};

use super::{print_json, AppContext};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FeedName {
    Products,
    Stock,
}

#[derive(Debug, Subcommand)]
pub enum SyncCommand {
    /// Pull the ERP product catalog
    Products,

    /// Pull ERP stock levels (products should be synced first)
    Stock,

    /// Full sync: products, then stock
    Full,

    /// Sync counters for products and inventory
    Status,

    /// Log in to the ERP with the configured credentials
    TestConnection,

    /// Fetch a single ERP page and print it untouched
    Peek {
        #[arg(value_enum)]
        feed: FeedName,

        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Page size (defaults to the configured page size)
        #[arg(long)]
        limit: Option<u32>,

        /// Extra query filters, KEY=VALUE
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },

    /// POST a JSON payload to an ERP endpoint
    Push {
        /// Endpoint path, e.g. /estoque/ajuste
        endpoint: String,

        /// Inline JSON payload
        #[arg(long, conflicts_with = "file")]
        payload: Option<String>,

        /// File holding the JSON payload
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

impl SyncCommand {
    pub async fn run(self, ctx: &AppContext) -> Result<()> {
        let sync = ctx.orchestrator()?;

        match self {
            SyncCommand::Products => print_json(&sync.sync_products().await?),
            SyncCommand::Stock => print_json(&sync.sync_stock().await?),
            SyncCommand::Full => print_json(&sync.sync_full().await?),
            SyncCommand::Status => print_json(&sync.sync_status().await?),
            SyncCommand::TestConnection => {
                let outcome = sync.test_connection().await;
                let report = json!({
                    "connected": outcome.is_ok(),
                    "error": outcome.as_ref().err().map(|e| e.to_string()),
                    "session": sync.session_state().await,
                    "connection": ctx.config.connection_info(),
                });
                print_json(&report)
            }
            SyncCommand::Peek {
                feed,
                page,
                limit,
                filters,
            } => {
                let mut request =
                    PageRequest::new(page, limit.unwrap_or(ctx.config.sync.page_size));
                for (key, value) in filters {
                    request = request.filter(key, value);
                }

                let envelope = match feed {
                    FeedName::Products => sync.fetch_products_page(&request).await?,
                    FeedName::Stock => sync.fetch_stock_page(&request).await?,
                };
                print_json(&render_page(&envelope)?)
            }
            SyncCommand::Push {
                endpoint,
                payload,
                file,
            } => {
                let payload = read_payload(payload, file)?;
                print_json(&sync.push_data(&endpoint, &payload).await?)
            }
        }
    }
}

/// Records of one page plus its pagination block.
fn render_page(envelope: &ErpEnvelope) -> SyncResult<Value> {
    Ok(json!({
        "records": envelope.records()?,
        "pagination": envelope.pagination,
        "message": envelope.message,
    }))
}

fn read_payload(inline: Option<String>, file: Option<PathBuf>) -> Result<Value> {
    let text = match (inline, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => bail!("Provide the payload with --payload or --file"),
    };
    serde_json::from_str(&text).context("Payload is not valid JSON")
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}
