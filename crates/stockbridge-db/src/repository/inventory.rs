//! # Inventory Repository
//!
//! Storage for inventory lines (one per product × color × size).
//!
//! ## Write Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who writes inventory_items                           │
//! │                                                                         │
//! │  InventoryLedger ──── quantity change + movement, one transaction      │
//! │       │               (insert_item / update_item on the tx)            │
//! │                                                                         │
//! │  ERP sync ─────────── upsert_from_erp, quantities written directly,    │
//! │                       no movement, sync = synced                       │
//! │                                                                         │
//! │  Local edits ──────── thresholds / location, sync = pending            │
//! │                                                                         │
//! │  Every write: validate → recompute(available, alerts) → guarded UPDATE │
//! │  UPDATE ... WHERE id = ? AND movement_seq = ?  (0 rows ⇒ Conflict)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use stockbridge_core::ledger::recompute;
use stockbridge_core::validation::validate_item;
use stockbridge_core::{
    CoreError, InventoryItem, InventoryStatus, ItemColor, ItemPricing, Location, LotInfo,
    StockAlerts, StockLevel, SyncMeta, SyncStatus,
};

use super::{
    decode_json_opt, encode_json, generate_id, mark_sync_error, sync_stats, SyncStats, SyncedTable,
};
use crate::error::{DbError, DbResult};

const ITEM_COLUMNS: &str = r#"
    id, product_id, color_name, color_code, size,
    physical, reserved, available, minimum, maximum,
    warehouse, aisle, shelf, slot, status, lot, pricing,
    low_stock, zero_stock, movement_seq, erp_code,
    sync_status, last_synced_at, sync_error,
    created_at, updated_at
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: String,
    product_id: String,
    color_name: String,
    color_code: String,
    size: String,
    physical: i64,
    reserved: i64,
    available: i64,
    minimum: i64,
    maximum: i64,
    warehouse: String,
    aisle: Option<String>,
    shelf: Option<String>,
    slot: Option<String>,
    status: InventoryStatus,
    lot: Option<String>,
    pricing: Option<String>,
    low_stock: bool,
    zero_stock: bool,
    movement_seq: i64,
    erp_code: Option<String>,
    sync_status: SyncStatus,
    last_synced_at: Option<DateTime<Utc>>,
    sync_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ItemRow {
    fn into_item(self) -> DbResult<InventoryItem> {
        Ok(InventoryItem {
            lot: decode_json_opt::<LotInfo>("lot", self.lot.as_deref())?,
            pricing: decode_json_opt::<ItemPricing>("pricing", self.pricing.as_deref())?,
            id: self.id,
            product_id: self.product_id,
            color: ItemColor {
                name: self.color_name,
                code: self.color_code,
            },
            size: self.size,
            quantity: StockLevel {
                physical: self.physical,
                reserved: self.reserved,
                available: self.available,
                minimum: self.minimum,
                maximum: self.maximum,
            },
            location: Location {
                warehouse: self.warehouse,
                aisle: self.aisle,
                shelf: self.shelf,
                slot: self.slot,
            },
            status: self.status,
            alerts: StockAlerts {
                low_stock: self.low_stock,
                zero_stock: self.zero_stock,
            },
            movement_seq: self.movement_seq,
            erp_code: self.erp_code,
            sync: SyncMeta {
                last_synced_at: self.last_synced_at,
                status: self.sync_status,
                error: self.sync_error,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// =============================================================================
// Executor-Generic Helpers (shared with InventoryLedger)
// =============================================================================

pub(crate) async fn fetch_item<'e, E>(executor: E, id: &str) -> DbResult<Option<InventoryItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ?1");
    let row: Option<ItemRow> = sqlx::query_as(&sql).bind(id).fetch_optional(executor).await?;
    row.map(ItemRow::into_item).transpose()
}

pub(crate) async fn fetch_variant<'e, E>(
    executor: E,
    product_id: &str,
    color_code: &str,
    size: &str,
) -> DbResult<Option<InventoryItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM inventory_items
         WHERE product_id = ?1 AND color_code = ?2 AND size = ?3"
    );
    let row: Option<ItemRow> = sqlx::query_as(&sql)
        .bind(product_id)
        .bind(color_code.trim().to_uppercase())
        .bind(size.trim().to_uppercase())
        .fetch_optional(executor)
        .await?;
    row.map(ItemRow::into_item).transpose()
}

/// Inserts a fully prepared (validated, recomputed) item.
pub(crate) async fn insert_item<'e, E>(executor: E, item: &InventoryItem) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO inventory_items (
            id, product_id, color_name, color_code, size,
            physical, reserved, available, minimum, maximum,
            warehouse, aisle, shelf, slot, status, lot, pricing,
            low_stock, zero_stock, movement_seq, erp_code,
            sync_status, last_synced_at, sync_error,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14, ?15, ?16, ?17,
            ?18, ?19, ?20, ?21,
            ?22, ?23, ?24,
            ?25, ?26
        )
        "#,
    )
    .bind(&item.id)
    .bind(&item.product_id)
    .bind(&item.color.name)
    .bind(&item.color.code)
    .bind(&item.size)
    .bind(item.quantity.physical)
    .bind(item.quantity.reserved)
    .bind(item.quantity.available)
    .bind(item.quantity.minimum)
    .bind(item.quantity.maximum)
    .bind(&item.location.warehouse)
    .bind(&item.location.aisle)
    .bind(&item.location.shelf)
    .bind(&item.location.slot)
    .bind(item.status)
    .bind(item.lot.as_ref().map(encode_json).transpose()?)
    .bind(item.pricing.as_ref().map(encode_json).transpose()?)
    .bind(item.alerts.low_stock)
    .bind(item.alerts.zero_stock)
    .bind(item.movement_seq)
    .bind(&item.erp_code)
    .bind(item.sync.status)
    .bind(item.sync.last_synced_at)
    .bind(&item.sync.error)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(executor)
    .await
    .map_err(|e| variant_conflict(e, item))?;

    Ok(())
}

/// Writes every mutable column of `item`, provided the stored row still has
/// `movement_seq == expected_seq`.
///
/// ## Errors
/// * `DbError::Conflict` - the row changed (or vanished) since it was read
pub(crate) async fn update_item<'e, E>(
    executor: E,
    item: &InventoryItem,
    expected_seq: i64,
) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE inventory_items SET
            color_name = ?3,
            color_code = ?4,
            size = ?5,
            physical = ?6,
            reserved = ?7,
            available = ?8,
            minimum = ?9,
            maximum = ?10,
            warehouse = ?11,
            aisle = ?12,
            shelf = ?13,
            slot = ?14,
            status = ?15,
            lot = ?16,
            pricing = ?17,
            low_stock = ?18,
            zero_stock = ?19,
            movement_seq = ?20,
            erp_code = ?21,
            sync_status = ?22,
            last_synced_at = ?23,
            sync_error = ?24,
            updated_at = ?25
        WHERE id = ?1 AND movement_seq = ?2
        "#,
    )
    .bind(&item.id)
    .bind(expected_seq)
    .bind(&item.color.name)
    .bind(&item.color.code)
    .bind(&item.size)
    .bind(item.quantity.physical)
    .bind(item.quantity.reserved)
    .bind(item.quantity.available)
    .bind(item.quantity.minimum)
    .bind(item.quantity.maximum)
    .bind(&item.location.warehouse)
    .bind(&item.location.aisle)
    .bind(&item.location.shelf)
    .bind(&item.location.slot)
    .bind(item.status)
    .bind(item.lot.as_ref().map(encode_json).transpose()?)
    .bind(item.pricing.as_ref().map(encode_json).transpose()?)
    .bind(item.alerts.low_stock)
    .bind(item.alerts.zero_stock)
    .bind(item.movement_seq)
    .bind(&item.erp_code)
    .bind(item.sync.status)
    .bind(item.sync.last_synced_at)
    .bind(&item.sync.error)
    .bind(item.updated_at)
    .execute(executor)
    .await
    .map_err(|e| variant_conflict(e, item))?;

    if result.rows_affected() == 0 {
        return Err(DbError::Conflict {
            entity: "InventoryItem".to_string(),
            id: item.id.clone(),
        });
    }

    Ok(())
}

/// Turns a UNIQUE failure on the variant index into `DuplicateVariant`.
fn variant_conflict(err: sqlx::Error, item: &InventoryItem) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, .. } if field.contains("inventory_items.product_id") => {
            CoreError::DuplicateVariant {
                product_id: item.product_id.clone(),
                color_code: item.color.code.clone(),
                size: item.size.clone(),
            }
            .into()
        }
        other => other,
    }
}

/// Validates, normalizes and recomputes an item before it is written.
pub(crate) fn prepare(mut item: InventoryItem) -> DbResult<InventoryItem> {
    validate_item(&mut item).map_err(CoreError::from)?;
    if item.id.is_empty() {
        item.id = generate_id();
    }
    Ok(recompute(item))
}

// =============================================================================
// Reports
// =============================================================================

/// Aggregate counters over every inventory line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryTotals {
    pub items: i64,
    pub physical: i64,
    pub reserved: i64,
    pub available: i64,
    pub low_stock: i64,
    pub zero_stock: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for inventory lines.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.inventory();
///
/// let line = repo.find_by_variant(&product.id, "PRT", "M").await?;
/// let low = repo.low_stock(20).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Gets an inventory line by its ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        fetch_item(&self.pool, id).await
    }

    /// Gets the line for a product/color/size triple. Color code and size
    /// are matched case-insensitively.
    pub async fn find_by_variant(
        &self,
        product_id: &str,
        color_code: &str,
        size: &str,
    ) -> DbResult<Option<InventoryItem>> {
        fetch_variant(&self.pool, product_id, color_code, size).await
    }

    /// All lines of one product, ordered by color then size.
    pub async fn list_by_product(&self, product_id: &str) -> DbResult<Vec<InventoryItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items
             WHERE product_id = ?1 ORDER BY color_code, size"
        );
        let rows: Vec<ItemRow> = sqlx::query_as(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(ItemRow::into_item).collect()
    }

    /// Inserts a line as-is, without recording a movement.
    ///
    /// Use [`crate::ledger::InventoryLedger::open_item`] when the line
    /// starts with stock.
    pub async fn insert(&self, item: InventoryItem) -> DbResult<InventoryItem> {
        let item = prepare(item)?;
        debug!(
            product_id = %item.product_id,
            color = %item.color.code,
            size = %item.size,
            "Inserting inventory item"
        );
        insert_item(&self.pool, &item).await?;
        Ok(item)
    }

    /// Changes the minimum/maximum thresholds. Alerts are recomputed and the
    /// line becomes `pending`.
    pub async fn update_thresholds(
        &self,
        id: &str,
        minimum: i64,
        maximum: i64,
    ) -> DbResult<InventoryItem> {
        let mut item = self.require(id).await?;
        let expected_seq = item.movement_seq;

        item.quantity.minimum = minimum;
        item.quantity.maximum = maximum;
        self.save_local_edit(item, expected_seq).await
    }

    /// Moves a line to another warehouse position. The line becomes
    /// `pending`.
    pub async fn update_location(&self, id: &str, location: Location) -> DbResult<InventoryItem> {
        let mut item = self.require(id).await?;
        let expected_seq = item.movement_seq;

        item.location = location;
        self.save_local_edit(item, expected_seq).await
    }

    async fn require(&self, id: &str) -> DbResult<InventoryItem> {
        self.get(id)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(id.to_string()).into())
    }

    async fn save_local_edit(&self, item: InventoryItem, expected_seq: i64) -> DbResult<InventoryItem> {
        let mut item = prepare(item)?;
        item.sync.mark_pending();
        item.updated_at = Utc::now();

        update_item(&self.pool, &item, expected_seq).await?;
        Ok(item)
    }

    /// Creates or overwrites the line for `item`'s variant on behalf of the
    /// ERP sync. Quantities are written directly and no movement is
    /// recorded. An existing line keeps its `id`, `created_at` and movement
    /// sequence. The stored line is marked `synced` at `now`.
    pub async fn upsert_from_erp(
        &self,
        item: InventoryItem,
        now: DateTime<Utc>,
    ) -> DbResult<InventoryItem> {
        let mut item = prepare(item)?;
        item.sync = SyncMeta::synced(now);
        item.updated_at = now;

        let mut tx = self.pool.begin().await?;

        let existing = fetch_variant(&mut *tx, &item.product_id, &item.color.code, &item.size).await?;

        match existing {
            Some(current) => {
                debug!(id = %current.id, "Updating inventory item from ERP");
                item.id = current.id;
                item.created_at = current.created_at;
                item.movement_seq = current.movement_seq;
                update_item(&mut *tx, &item, current.movement_seq).await?;
            }
            None => {
                debug!(
                    product_id = %item.product_id,
                    color = %item.color.code,
                    size = %item.size,
                    "Creating inventory item from ERP"
                );
                item.created_at = now;
                insert_item(&mut *tx, &item).await?;
            }
        }

        tx.commit().await?;
        Ok(item)
    }

    /// Lines whose available stock is at or below their minimum, emptiest
    /// first.
    pub async fn low_stock(&self, limit: u32) -> DbResult<Vec<InventoryItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items
             WHERE low_stock = 1
             ORDER BY available ASC, color_code, size
             LIMIT ?1"
        );
        let rows: Vec<ItemRow> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(ItemRow::into_item).collect()
    }

    /// Inventory-wide totals.
    pub async fn totals(&self) -> DbResult<InventoryTotals> {
        let totals = sqlx::query_as::<_, InventoryTotals>(
            r#"
            SELECT
                COUNT(*) AS items,
                COALESCE(SUM(physical), 0) AS physical,
                COALESCE(SUM(reserved), 0) AS reserved,
                COALESCE(SUM(available), 0) AS available,
                COALESCE(SUM(low_stock), 0) AS low_stock,
                COALESCE(SUM(zero_stock), 0) AS zero_stock
            FROM inventory_items
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    /// Sync status counters for inventory lines.
    pub async fn sync_stats(&self) -> DbResult<SyncStats> {
        sync_stats(&self.pool, SyncedTable::InventoryItems).await
    }

    /// Records a failed ERP sync against an existing line.
    pub async fn mark_sync_error(&self, id: &str, message: &str) -> DbResult<()> {
        if !mark_sync_error(&self.pool, SyncedTable::InventoryItems, id, message).await? {
            return Err(DbError::not_found("InventoryItem", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;

    async fn seeded() -> (crate::Database, String) {
        let db = fixtures::db().await;
        let product = db
            .products()
            .insert(fixtures::product("CAM-001", "T-1"))
            .await
            .unwrap();
        (db, product.id)
    }

    #[tokio::test]
    async fn test_insert_normalizes_and_recomputes() {
        let (db, product_id) = seeded().await;
        let mut item = fixtures::item(&product_id, "prt", " m ");
        item.quantity.physical = 5;
        item.quantity.reserved = 1;
        item.quantity.available = 0;

        let stored = db.inventory().insert(item).await.unwrap();
        assert_eq!(stored.color.code, "PRT");
        assert_eq!(stored.size, "M");
        assert_eq!(stored.quantity.available, 4);

        let loaded = db
            .inventory()
            .find_by_variant(&product_id, "prt", "m")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, stored);
    }

    #[tokio::test]
    async fn test_duplicate_variant_is_a_domain_error() {
        let (db, product_id) = seeded().await;
        db.inventory()
            .insert(fixtures::item(&product_id, "PRT", "M"))
            .await
            .unwrap();

        let err = db
            .inventory()
            .insert(fixtures::item(&product_id, "prt", "m"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::DuplicateVariant { .. })
        ));
    }

    #[tokio::test]
    async fn test_erp_upsert_overwrites_quantities_without_movements() {
        let (db, product_id) = seeded().await;
        let now = Utc::now();

        let mut first = fixtures::item(&product_id, "PRT", "M");
        first.quantity.physical = 10;
        let created = db.inventory().upsert_from_erp(first, now).await.unwrap();
        assert_eq!(created.sync.status, SyncStatus::Synced);

        let mut second = fixtures::item(&product_id, "PRT", "M");
        second.quantity.physical = 3;
        second.quantity.reserved = 1;
        let updated = db.inventory().upsert_from_erp(second, now).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.quantity.available, 2);
        assert_eq!(db.inventory().list_by_product(&product_id).await.unwrap().len(), 1);
        assert!(db.movements().list_for_item(&created.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_threshold_edit_recomputes_alerts_and_marks_pending() {
        let (db, product_id) = seeded().await;
        let mut item = fixtures::item(&product_id, "PRT", "M");
        item.quantity.physical = 5;
        let stored = db.inventory().upsert_from_erp(item, Utc::now()).await.unwrap();
        assert!(!stored.alerts.low_stock);

        let edited = db.inventory().update_thresholds(&stored.id, 5, 50).await.unwrap();
        assert!(edited.alerts.low_stock);
        assert_eq!(edited.sync.status, SyncStatus::Pending);
        assert_eq!(edited.sync.last_synced_at, stored.sync.last_synced_at);
    }

    #[tokio::test]
    async fn test_location_edit_uppercases() {
        let (db, product_id) = seeded().await;
        let stored = db
            .inventory()
            .insert(fixtures::item(&product_id, "PRT", "M"))
            .await
            .unwrap();

        let moved = db
            .inventory()
            .update_location(
                &stored.id,
                Location {
                    warehouse: "loja-2".into(),
                    aisle: Some("a".into()),
                    shelf: None,
                    slot: Some(" 3b ".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.location.warehouse, "LOJA-2");
        assert_eq!(moved.location.aisle.as_deref(), Some("A"));
        assert_eq!(moved.location.slot.as_deref(), Some("3B"));
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let (db, product_id) = seeded().await;
        let stored = db
            .inventory()
            .insert(fixtures::item(&product_id, "PRT", "M"))
            .await
            .unwrap();

        let err = update_item(db.pool(), &stored, stored.movement_seq + 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_low_stock_and_totals() {
        let (db, product_id) = seeded().await;
        let now = Utc::now();
        for (size, physical) in [("P", 0), ("M", 1), ("G", 30)] {
            let mut item = fixtures::item(&product_id, "PRT", size);
            item.quantity.physical = physical;
            db.inventory().upsert_from_erp(item, now).await.unwrap();
        }

        let low = db.inventory().low_stock(10).await.unwrap();
        let sizes: Vec<_> = low.iter().map(|i| i.size.as_str()).collect();
        assert_eq!(sizes, vec!["P", "M"]);

        let totals = db.inventory().totals().await.unwrap();
        assert_eq!(
            totals,
            InventoryTotals {
                items: 3,
                physical: 31,
                reserved: 0,
                available: 31,
                low_stock: 2,
                zero_stock: 1,
            }
        );
    }
}
