//! # CLI Commands
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── AppContext, JSON output
//! ├── sync.rs     ◄─── ERP pull, push, status, test connection
//! ├── item.rs     ◄─── Ledger operations on one inventory line
//! ├── product.rs  ◄─── Catalog lookup, filters, local edit, soft delete
//! ├── report.rs   ◄─── Low stock, totals, movements, catalog reports
//! └── config.rs   ◄─── Show / write stockbridge.toml
//! ```
//!
//! Every command prints a single pretty JSON document on success. Errors
//! bubble up as `anyhow::Error` and end the process with a non-zero code.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use stockbridge_core::{Actor, Product};
use stockbridge_db::{Database, DbConfig};
use stockbridge_sync::{HttpErpTransport, SyncConfig, SyncOrchestrator};
use tracing::debug;

pub mod config;
pub mod item;
pub mod product;
pub mod report;
pub mod sync;

/// Shared state for one CLI invocation.
pub struct AppContext {
    pub config: SyncConfig,
    pub db: Database,
    pub actor: Actor,
}

impl AppContext {
    /// Loads and validates the configuration, then opens the database.
    pub async fn open(config_path: Option<PathBuf>, actor: &str) -> Result<Self> {
        let config = SyncConfig::load(config_path).context("Failed to load configuration")?;

        let db_path = config.database.path.clone();
        debug!(path = %db_path.display(), "Opening database");
        let db = Database::new(DbConfig::new(db_path.clone()))
            .await
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

        Ok(AppContext {
            config,
            db,
            actor: Actor::user(actor),
        })
    }

    /// Builds an orchestrator over the HTTP transport. Fails when no ERP URL
    /// is configured.
    pub fn orchestrator(&self) -> Result<SyncOrchestrator<HttpErpTransport>> {
        let transport = HttpErpTransport::new(self.config.erp.clone())
            .context("ERP connection is not configured")?;
        Ok(SyncOrchestrator::new(
            transport,
            self.db.clone(),
            self.config.sync.clone(),
        ))
    }

    /// Resolves a product by its local code.
    pub async fn product_by_code(&self, code: &str) -> Result<Product> {
        self.db
            .products()
            .get_by_code(code)
            .await?
            .with_context(|| format!("No product with code {code}"))
    }
}

/// Prints `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{text}");
    Ok(())
}
