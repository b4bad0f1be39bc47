//! # Config Commands
//!
//! Work on `stockbridge.toml` only; the database is never opened.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde_json::json;
use stockbridge_sync::SyncConfig;

use super::print_json;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Effective configuration with credentials redacted
    Show,

    /// Print the config file location
    Path,

    /// Write the effective configuration (defaults plus env) to the file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn run(self, config_path: Option<PathBuf>) -> Result<()> {
        let path = config_path.or_else(SyncConfig::default_config_path);

        match self {
            ConfigCommand::Show => {
                let config =
                    SyncConfig::load(path.clone()).context("Failed to load configuration")?;
                print_json(&json!({
                    "file": path,
                    "erp": config.connection_info(),
                    "timeout_secs": config.erp.timeout_secs,
                    "sync": config.sync,
                    "database": config.database,
                }))
            }
            ConfigCommand::Path => print_json(&json!({ "file": path })),
            ConfigCommand::Init { force } => {
                let Some(path) = path else {
                    bail!("No config path available on this platform, pass --config");
                };
                if path.exists() && !force {
                    bail!("{} already exists, use --force to overwrite", path.display());
                }
                let config = SyncConfig::load(Some(path.clone()))
                    .context("Failed to load configuration")?;
                config.save(Some(path.clone()))?;
                print_json(&json!({ "written": path }))
            }
        }
    }
}
