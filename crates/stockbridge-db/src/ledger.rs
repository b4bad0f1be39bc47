//! # Inventory Ledger (persistent)
//!
//! Runs the pure transitions of `stockbridge_core::ledger` against stored
//! inventory lines. Each operation is one SQLite transaction:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    InventoryLedger::reserve(id, 3, ...)                 │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    SELECT item WHERE id = ?                 current (movement_seq = n)  │
//! │    core::ledger::reserve(&current, 3, ..)   → item', movement(n + 1)    │
//! │    UPDATE item' WHERE id = ? AND movement_seq = n                       │
//! │    INSERT movement (item_id, n + 1)                                     │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error ⇒ transaction dropped ⇒ rollback, nothing changed           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A writer that lost a race sees `DbError::Conflict` and may retry.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use stockbridge_core::ledger::{self, Availability, LedgerOutcome, MovementRequest};
use stockbridge_core::{
    Actor, CoreError, DocumentKind, DocumentRef, InventoryItem, InventoryStatus, Movement,
    MovementKind,
};

use crate::error::DbResult;
use crate::repository::inventory::{fetch_item, insert_item, prepare, update_item};
use crate::repository::movement;

/// Document number attached to the movement that opens a line with stock.
pub const INITIAL_STOCK_DOCUMENT: &str = "INICIAL";

/// A newly opened inventory line and its initial entry, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedItem {
    pub item: InventoryItem,
    pub movement: Option<Movement>,
}

/// Transactional front of the inventory ledger.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    pool: SqlitePool,
}

impl InventoryLedger {
    /// Creates a new InventoryLedger.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryLedger { pool }
    }

    /// Loads the item, applies `transition`, and stores the new item plus its
    /// movement atomically.
    async fn apply<F>(&self, item_id: &str, transition: F) -> DbResult<LedgerOutcome>
    where
        F: FnOnce(&InventoryItem, DateTime<Utc>) -> Result<LedgerOutcome, CoreError>,
    {
        let mut tx = self.pool.begin().await?;

        let current = load(&mut tx, item_id).await?;
        let outcome = transition(&current, Utc::now())?;
        store(&mut tx, current.movement_seq, &outcome).await?;

        tx.commit().await?;
        log_movement(&outcome.movement);
        Ok(outcome)
    }

    /// Records an entry, exit, adjustment or transfer.
    ///
    /// ## Errors
    /// * `CoreError::InsufficientStock` - physical stock would go negative
    /// * `CoreError::InvalidMovement` - bad quantity or a reservation kind
    /// * `CoreError::ItemNotFound`
    pub async fn record_movement(
        &self,
        item_id: &str,
        request: &MovementRequest,
        actor: &Actor,
    ) -> DbResult<LedgerOutcome> {
        self.apply(item_id, |item, now| {
            ledger::record_movement(item, request, actor, now)
        })
        .await
    }

    /// Reserves `quantity` units of available stock.
    pub async fn reserve(
        &self,
        item_id: &str,
        quantity: i64,
        reason: &str,
        actor: &Actor,
    ) -> DbResult<LedgerOutcome> {
        self.apply(item_id, |item, now| {
            ledger::reserve(item, quantity, reason, actor, now)
        })
        .await
    }

    /// Releases `quantity` reserved units.
    pub async fn release(
        &self,
        item_id: &str,
        quantity: i64,
        reason: &str,
        actor: &Actor,
    ) -> DbResult<LedgerOutcome> {
        self.apply(item_id, |item, now| {
            ledger::release(item, quantity, reason, actor, now)
        })
        .await
    }

    /// Availability of `quantity` units on the stored line. Read only.
    pub async fn check_availability(&self, item_id: &str, quantity: i64) -> DbResult<Availability> {
        let item = fetch_item(&self.pool, item_id)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))?;
        Ok(ledger::check_availability(&item, quantity))
    }

    /// Explicit status change. Quantities stay as they are and no movement
    /// is written.
    pub async fn set_status(
        &self,
        item_id: &str,
        status: InventoryStatus,
        actor: &Actor,
    ) -> DbResult<InventoryItem> {
        let mut tx = self.pool.begin().await?;

        let current = load(&mut tx, item_id).await?;
        let next = ledger::set_status(&current, status, actor, Utc::now());

        update_item(&mut *tx, &next, current.movement_seq).await?;
        tx.commit().await?;

        info!(item_id = %item_id, from = %current.status, to = %status, "Inventory status changed");
        Ok(next)
    }

    /// Manual stock count: sets physical stock to `counted`, recording an
    /// entry or exit for the difference. Returns `None` when the count
    /// already matches.
    pub async fn set_physical(
        &self,
        item_id: &str,
        counted: i64,
        actor: &Actor,
    ) -> DbResult<Option<LedgerOutcome>> {
        let mut tx = self.pool.begin().await?;
        let current = load(&mut tx, item_id).await?;

        let Some(request) = ledger::count_adjustment(&current, counted, "manual stock count")?
        else {
            debug!(item_id = %item_id, counted, "Stock count matches, nothing to record");
            return Ok(None);
        };

        let now = Utc::now();
        let direction = if request.kind == MovementKind::Entry { "raised" } else { "lowered" };
        let request = request
            .with_document(DocumentRef {
                kind: DocumentKind::InventoryAdjustment,
                number: format!("AJUSTE-{}", now.timestamp_millis()),
            })
            .with_notes(format!("quantity {direction} by manual count"));

        let outcome = ledger::record_movement(&current, &request, actor, now)?;
        store(&mut tx, current.movement_seq, &outcome).await?;

        tx.commit().await?;
        log_movement(&outcome.movement);
        Ok(Some(outcome))
    }

    /// Opens a new inventory line. When `initial_quantity` is positive the
    /// stock arrives through an `entry` movement (document `other` /
    /// `INICIAL`), in the same transaction.
    ///
    /// ## Errors
    /// * `CoreError::ProductNotFound` - unknown `product_id`
    /// * `CoreError::DuplicateVariant` - the product/color/size line exists
    pub async fn open_item(
        &self,
        item: InventoryItem,
        initial_quantity: i64,
        actor: &Actor,
    ) -> DbResult<OpenedItem> {
        let now = Utc::now();
        let mut item = item;
        item.quantity.physical = 0;
        item.quantity.reserved = 0;
        item.movement_seq = 0;
        item.created_at = now;
        item.updated_at = now;
        let mut item = prepare(item)?;
        actor.stamp(&mut item.sync, now);

        let request = (initial_quantity != 0).then(|| {
            MovementRequest::new(MovementKind::Entry, initial_quantity, "initial stock")
                .with_document(DocumentRef {
                    kind: DocumentKind::Other,
                    number: INITIAL_STOCK_DOCUMENT.to_string(),
                })
                .with_notes("item created")
        });
        let outcome = request
            .map(|req| ledger::record_movement(&item, &req, actor, now))
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let product_exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
            .bind(&item.product_id)
            .fetch_optional(&mut *tx)
            .await?;
        if product_exists.is_none() {
            return Err(CoreError::ProductNotFound(item.product_id.clone()).into());
        }

        insert_item(&mut *tx, &item).await?;

        let opened = match outcome {
            Some(outcome) => {
                store(&mut tx, item.movement_seq, &outcome).await?;
                OpenedItem {
                    item: outcome.item,
                    movement: Some(outcome.movement),
                }
            }
            None => OpenedItem { item, movement: None },
        };

        tx.commit().await?;

        if let Some(movement) = &opened.movement {
            log_movement(movement);
        }
        info!(
            item_id = %opened.item.id,
            product_id = %opened.item.product_id,
            color = %opened.item.color.code,
            size = %opened.item.size,
            physical = opened.item.quantity.physical,
            "Inventory item opened"
        );

        Ok(opened)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn load(tx: &mut Transaction<'_, Sqlite>, item_id: &str) -> DbResult<InventoryItem> {
    fetch_item(&mut **tx, item_id)
        .await?
        .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()).into())
}

/// Writes the new item state, guarded by the sequence it was read at, and
/// appends its movement.
async fn store(
    tx: &mut Transaction<'_, Sqlite>,
    expected_seq: i64,
    outcome: &LedgerOutcome,
) -> DbResult<()> {
    update_item(&mut **tx, &outcome.item, expected_seq).await?;
    movement::append(&mut **tx, &outcome.movement).await
}

fn log_movement(movement: &Movement) {
    info!(
        item_id = %movement.item_id,
        sequence = movement.sequence,
        kind = %movement.kind,
        quantity = movement.quantity,
        before = movement.quantity_before,
        after = movement.quantity_after,
        actor = %movement.actor,
        "Stock movement recorded"
    );
}

// =============================================================================
// Unit Tests
// =============================================================================
