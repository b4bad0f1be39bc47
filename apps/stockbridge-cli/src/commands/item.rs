//! # Item Commands
//!
//! Ledger operations on a single inventory line, addressed by item id.
//! Every quantity change goes through [`stockbridge_db::InventoryLedger`]
//! and prints the updated line together with the movement it produced.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Subcommand;
use serde_json::{json, Value};
use stockbridge_core::{
    DocumentKind, DocumentRef, InventoryItem, InventoryStatus, ItemColor, LedgerOutcome, Location,
    MovementKind, MovementRequest, StockAlerts, StockLevel, SyncMeta, DEFAULT_MAXIMUM,
    DEFAULT_WAREHOUSE,
};
use stockbridge_db::generate_id;

use super::{print_json, AppContext};

#[derive(Debug, Subcommand)]
pub enum ItemCommand {
    /// Open a new product × color × size line
    Open {
        /// Local product code
        product: String,

        /// Color code
        #[arg(long)]
        color: String,

        /// Color name (defaults to the code)
        #[arg(long)]
        color_name: Option<String>,

        #[arg(long)]
        size: String,

        /// Units received as initial stock
        #[arg(long, default_value_t = 0)]
        initial: i64,

        #[arg(long, default_value_t = 0)]
        minimum: i64,

        #[arg(long, default_value_t = DEFAULT_MAXIMUM)]
        maximum: i64,

        #[arg(long, default_value = DEFAULT_WAREHOUSE)]
        warehouse: String,
    },

    /// Show a line and its movement log
    Show { item_id: String },

    /// Find the line for a product variant
    Find {
        product: String,
        #[arg(long)]
        color: String,
        #[arg(long)]
        size: String,
    },

    /// List every line of a product
    List { product: String },

    /// Record an entry, exit, adjustment or transfer
    Move {
        item_id: String,

        kind: MovementKind,

        /// Units moved; signed delta for adjustments
        #[arg(allow_hyphen_values = true)]
        quantity: i64,

        #[arg(long)]
        reason: String,

        #[arg(long, requires = "document_number")]
        document_kind: Option<DocumentKind>,

        #[arg(long, requires = "document_kind")]
        document_number: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Reserve available units
    Reserve {
        item_id: String,
        quantity: i64,
        #[arg(long, default_value = "reservation")]
        reason: String,
    },

    /// Release reserved units
    Release {
        item_id: String,
        quantity: i64,
        #[arg(long, default_value = "release")]
        reason: String,
    },

    /// Record a manual stock count
    Count { item_id: String, counted: i64 },

    /// Can `quantity` units be taken from the line?
    Availability { item_id: String, quantity: i64 },

    /// Change the line's physical status
    Status {
        item_id: String,
        status: InventoryStatus,
    },

    /// Change low/high stock thresholds
    Thresholds {
        item_id: String,
        #[arg(long)]
        minimum: i64,
        #[arg(long)]
        maximum: i64,
    },

    /// Move the line to another warehouse position
    Locate {
        item_id: String,
        #[arg(long)]
        warehouse: String,
        #[arg(long)]
        aisle: Option<String>,
        #[arg(long)]
        shelf: Option<String>,
        #[arg(long)]
        slot: Option<String>,
    },
}

impl ItemCommand {
    pub async fn run(self, ctx: &AppContext) -> Result<()> {
        let ledger = ctx.db.ledger();
        let inventory = ctx.db.inventory();

        match self {
            ItemCommand::Open {
                product,
                color,
                color_name,
                size,
                initial,
                minimum,
                maximum,
                warehouse,
            } => {
                let product = ctx.product_by_code(&product).await?;
                let item = new_line(
                    &product.id,
                    ItemColor {
                        name: color_name.unwrap_or_else(|| color.clone()),
                        code: color,
                    },
                    size,
                    minimum,
                    maximum,
                    warehouse,
                );
                let opened = ledger.open_item(item, initial, &ctx.actor).await?;
                print_json(&json!({ "item": opened.item, "movement": opened.movement }))
            }
            ItemCommand::Show { item_id } => {
                let item = inventory
                    .get(&item_id)
                    .await?
                    .with_context(|| format!("No inventory item {item_id}"))?;
                let movements = ctx.db.movements().list_for_item(&item_id).await?;
                print_json(&json!({ "item": item, "movements": movements }))
            }
            ItemCommand::Find {
                product,
                color,
                size,
            } => {
                let product = ctx.product_by_code(&product).await?;
                let item = inventory
                    .find_by_variant(&product.id, &color, &size)
                    .await?
                    .with_context(|| {
                        format!("No line for {} / {color} / {size}", product.code)
                    })?;
                print_json(&item)
            }
            ItemCommand::List { product } => {
                let product = ctx.product_by_code(&product).await?;
                print_json(&inventory.list_by_product(&product.id).await?)
            }
            ItemCommand::Move {
                item_id,
                kind,
                quantity,
                reason,
                document_kind,
                document_number,
                notes,
            } => {
                if !kind.affects_physical() {
                    bail!("{kind} movements are recorded with `item reserve` and `item release`");
                }
                let mut request = MovementRequest::new(kind, quantity, reason);
                if let (Some(kind), Some(number)) = (document_kind, document_number) {
                    request = request.with_document(DocumentRef { kind, number });
                }
                if let Some(notes) = notes {
                    request = request.with_notes(notes);
                }
                let outcome = ledger.record_movement(&item_id, &request, &ctx.actor).await?;
                print_json(&outcome_json(outcome))
            }
            ItemCommand::Reserve {
                item_id,
                quantity,
                reason,
            } => {
                let outcome = ledger.reserve(&item_id, quantity, &reason, &ctx.actor).await?;
                print_json(&outcome_json(outcome))
            }
            ItemCommand::Release {
                item_id,
                quantity,
                reason,
            } => {
                let outcome = ledger.release(&item_id, quantity, &reason, &ctx.actor).await?;
                print_json(&outcome_json(outcome))
            }
            ItemCommand::Count { item_id, counted } => {
                match ledger.set_physical(&item_id, counted, &ctx.actor).await? {
                    Some(outcome) => print_json(&outcome_json(outcome)),
                    None => print_json(&json!({ "unchanged": true, "physical": counted })),
                }
            }
            ItemCommand::Availability { item_id, quantity } => {
                print_json(&ledger.check_availability(&item_id, quantity).await?)
            }
            ItemCommand::Status { item_id, status } => {
                print_json(&ledger.set_status(&item_id, status, &ctx.actor).await?)
            }
            ItemCommand::Thresholds {
                item_id,
                minimum,
                maximum,
            } => print_json(
                &inventory
                    .update_thresholds(&item_id, minimum, maximum)
                    .await?,
            ),
            ItemCommand::Locate {
                item_id,
                warehouse,
                aisle,
                shelf,
                slot,
            } => {
                let location = Location {
                    warehouse,
                    aisle,
                    shelf,
                    slot,
                };
                print_json(&inventory.update_location(&item_id, location).await?)
            }
        }
    }
}

/// Blank line for `open_item`; quantities and timestamps are set there.
fn new_line(
    product_id: &str,
    color: ItemColor,
    size: String,
    minimum: i64,
    maximum: i64,
    warehouse: String,
) -> InventoryItem {
    let now = Utc::now();
    InventoryItem {
        id: generate_id(),
        product_id: product_id.to_string(),
        color,
        size,
        quantity: StockLevel {
            minimum,
            maximum,
            ..StockLevel::default()
        },
        location: Location {
            warehouse,
            ..Location::default()
        },
        status: InventoryStatus::Available,
        lot: None,
        pricing: None,
        alerts: StockAlerts::default(),
        movement_seq: 0,
        erp_code: None,
        sync: SyncMeta::default(),
        created_at: now,
        updated_at: now,
    }
}

fn outcome_json(outcome: LedgerOutcome) -> Value {
    json!({ "item": outcome.item, "movement": outcome.movement })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_line_defaults() {
        let color = ItemColor {
            name: "Azul".into(),
            code: "AZ".into(),
        };
        let item = new_line("p-1", color, "m".into(), 3, 50, "LOJA".into());
        assert_eq!(item.product_id, "p-1");
        assert_eq!(item.quantity.minimum, 3);
        assert_eq!(item.quantity.maximum, 50);
        assert_eq!(item.quantity.physical, 0);
        assert_eq!(item.location.warehouse, "LOJA");
        assert!(item.location.aisle.is_none());
        assert_eq!(item.movement_seq, 0);
    }
}
