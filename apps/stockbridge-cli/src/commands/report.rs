//! # Report Commands
//!
//! Read-only views over inventory lines, the movement log and the catalog.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use stockbridge_core::MovementKind;
use stockbridge_db::MovementFilter;

use super::{print_json, AppContext};

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Lines at or below their minimum, emptiest first
    LowStock {
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// Inventory-wide quantity totals
    Totals,

    /// Product counts per category, active and inactive
    Categories,

    /// Product counts per gender, active and inactive
    Genders,

    /// Average, lowest and highest cost and sale price
    Prices,

    /// Movement log across items
    Movements {
        /// Lower bound, RFC 3339 (e.g. 2025-01-01T00:00:00Z)
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Upper bound, RFC 3339
        #[arg(long)]
        to: Option<DateTime<Utc>>,

        #[arg(long)]
        kind: Option<MovementKind>,

        /// Local product code
        #[arg(long)]
        product: Option<String>,

        #[arg(long)]
        limit: Option<u32>,
    },
}

impl ReportCommand {
    pub async fn run(self, ctx: &AppContext) -> Result<()> {
        let inventory = ctx.db.inventory();

        match self {
            ReportCommand::LowStock { limit } => print_json(&inventory.low_stock(limit).await?),
            ReportCommand::Totals => print_json(&inventory.totals().await?),
            ReportCommand::Categories => print_json(&ctx.db.products().count_by_category().await?),
            ReportCommand::Genders => print_json(&ctx.db.products().count_by_gender().await?),
            ReportCommand::Prices => print_json(&ctx.db.products().price_summary().await?),
            ReportCommand::Movements {
                from,
                to,
                kind,
                product,
                limit,
            } => {
                let product_id = match product {
                    Some(code) => Some(ctx.product_by_code(&code).await?.id),
                    None => None,
                };
                let filter = MovementFilter {
                    from,
                    to,
                    kind,
                    product_id,
                    limit,
                };
                print_json(&ctx.db.movements().report(&filter).await?)
            }
        }
    }
}
