//! # Repository Module
//!
//! Database repository implementations for StockBridge.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  CLI command / SyncOrchestrator                                        │
//! │       │                                                                 │
//! │       │  db.products().upsert_from_erp(product, now)                   │
//! │       │  db.inventory().low_stock(50)                                  │
//! │       ▼                                                                 │
//! │  ProductRepository      InventoryRepository      MovementRepository    │
//! │  ├── get_by_erp_code    ├── find_by_variant      ├── list_for_item     │
//! │  ├── upsert_from_erp    ├── upsert_from_erp      └── report            │
//! │  └── deactivate         └── totals                                     │
//! │       │                                                                 │
//! │       │  Row structs (FromRow) ──► domain types (stockbridge-core)     │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantity writes that produce a movement do not live here; they go through
//! [`crate::ledger::InventoryLedger`], which reuses the executor-generic
//! helpers of the inventory and movement modules inside one transaction.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog CRUD and ERP upsert
//! - [`InventoryRepository`](inventory::InventoryRepository) - Stock lines, reports, ERP upsert
//! - [`MovementRepository`](movement::MovementRepository) - Movement log queries

pub mod inventory;
pub mod movement;
pub mod product;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

// =============================================================================
// Shared Helpers
// =============================================================================

/// Generates a new entity ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Decodes a JSON TEXT column.
pub(crate) fn decode_json<T: DeserializeOwned>(column: &str, raw: &str) -> DbResult<T> {
    serde_json::from_str(raw).map_err(|e| DbError::corrupt(column, e))
}

/// Decodes a nullable JSON TEXT column.
pub(crate) fn decode_json_opt<T: DeserializeOwned>(
    column: &str,
    raw: Option<&str>,
) -> DbResult<Option<T>> {
    raw.map(|raw| decode_json(column, raw)).transpose()
}

/// Encodes a value for a JSON TEXT column.
pub(crate) fn encode_json<T: Serialize + ?Sized>(value: &T) -> DbResult<String> {
    serde_json::to_string(value).map_err(|e| DbError::Internal(e.to_string()))
}

// =============================================================================
// Sync Statistics
// =============================================================================

/// Reconciliation counters for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub total: i64,
    pub synced: i64,
    pub pending: i64,
    pub error: i64,
    /// Most recent successful sync of any record in the table.
    pub last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct SyncStatsRow {
    total: i64,
    synced: i64,
    pending: i64,
    error: i64,
    last_synced_at: Option<String>,
}

/// Tables that carry sync metadata columns.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SyncedTable {
    Products,
    InventoryItems,
}

impl SyncedTable {
    fn name(self) -> &'static str {
        match self {
            SyncedTable::Products => "products",
            SyncedTable::InventoryItems => "inventory_items",
        }
    }
}

pub(crate) async fn sync_stats(pool: &SqlitePool, table: SyncedTable) -> DbResult<SyncStats> {
    let sql = format!(
        r#"
        SELECT
            COUNT(*) AS total,
            COALESCE(SUM(sync_status = 'synced'), 0) AS synced,
            COALESCE(SUM(sync_status = 'pending'), 0) AS pending,
            COALESCE(SUM(sync_status = 'error'), 0) AS error,
            MAX(last_synced_at) AS last_synced_at
        FROM {}
        "#,
        table.name()
    );

    let row: SyncStatsRow = sqlx::query_as(&sql).fetch_one(pool).await?;

    // MAX() over TEXT loses the column's declared type, so parse by hand
    let last_synced_at = row
        .last_synced_at
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| DbError::corrupt("last_synced_at", e))
        })
        .transpose()?;

    Ok(SyncStats {
        total: row.total,
        synced: row.synced,
        pending: row.pending,
        error: row.error,
        last_synced_at,
    })
}

/// Flags one record as `error` with the reason. `last_synced_at` is kept.
/// Returns false when no row has that id.
pub(crate) async fn mark_sync_error(
    pool: &SqlitePool,
    table: SyncedTable,
    id: &str,
    message: &str,
) -> DbResult<bool> {
    let sql = format!(
        "UPDATE {} SET sync_status = 'error', sync_error = ?2 WHERE id = ?1",
        table.name()
    );
    let result = sqlx::query(&sql).bind(id).bind(message).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Test Fixtures
// =============================================================================
