//! # Movement Repository
//!
//! The append-only movement log. Rows are keyed by `(item_id, sequence)`;
//! SQLite triggers reject any UPDATE or DELETE on the table.
//!
//! Appends happen only inside [`crate::ledger::InventoryLedger`]
//! transactions, through [`append`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};

use stockbridge_core::{DocumentKind, DocumentRef, Movement, MovementKind};

use crate::error::DbResult;

const MOVEMENT_COLUMNS: &str = r#"
    m.item_id, m.sequence, m.kind, m.quantity, m.quantity_before, m.quantity_after,
    m.reason, m.document_kind, m.document_number, m.actor, m.occurred_at, m.notes
"#;

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    item_id: String,
    sequence: i64,
    kind: MovementKind,
    quantity: i64,
    quantity_before: i64,
    quantity_after: i64,
    reason: String,
    document_kind: Option<DocumentKind>,
    document_number: Option<String>,
    actor: String,
    occurred_at: DateTime<Utc>,
    notes: Option<String>,
}

impl From<MovementRow> for Movement {
    fn from(row: MovementRow) -> Self {
        let document = match (row.document_kind, row.document_number) {
            (Some(kind), Some(number)) => Some(DocumentRef { kind, number }),
            _ => None,
        };
        Movement {
            item_id: row.item_id,
            sequence: row.sequence,
            kind: row.kind,
            quantity: row.quantity,
            quantity_before: row.quantity_before,
            quantity_after: row.quantity_after,
            reason: row.reason,
            document,
            actor: row.actor,
            occurred_at: row.occurred_at,
            notes: row.notes,
        }
    }
}

/// Appends one movement. A repeated `(item_id, sequence)` fails with
/// `UniqueViolation`.
pub(crate) async fn append<'e, E>(executor: E, movement: &Movement) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            item_id, sequence, kind, quantity, quantity_before, quantity_after,
            reason, document_kind, document_number, actor, occurred_at, notes
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&movement.item_id)
    .bind(movement.sequence)
    .bind(movement.kind)
    .bind(movement.quantity)
    .bind(movement.quantity_before)
    .bind(movement.quantity_after)
    .bind(&movement.reason)
    .bind(movement.document.as_ref().map(|d| d.kind))
    .bind(movement.document.as_ref().map(|d| d.number.clone()))
    .bind(&movement.actor)
    .bind(movement.occurred_at)
    .bind(&movement.notes)
    .execute(executor)
    .await?;

    Ok(())
}

// =============================================================================
// Report Filter
// =============================================================================

/// Filter for [`MovementRepository::report`]. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    /// Inclusive lower bound on `occurred_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `occurred_at`.
    pub to: Option<DateTime<Utc>>,
    pub kind: Option<MovementKind>,
    pub product_id: Option<String>,
    pub limit: Option<u32>,
}

/// Default row cap for reports.
pub const DEFAULT_REPORT_LIMIT: u32 = 500;

// =============================================================================
// Repository
// =============================================================================

/// Read side of the movement log.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Full history of one item, oldest first.
    pub async fn list_for_item(&self, item_id: &str) -> DbResult<Vec<Movement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements m
             WHERE m.item_id = ?1 ORDER BY m.sequence"
        );
        let rows: Vec<MovementRow> = sqlx::query_as(&sql)
            .bind(item_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Movement::from).collect())
    }

    /// Movements across items matching `filter`, newest first.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let exits = db.movements().report(&MovementFilter {
    ///     kind: Some(MovementKind::Exit),
    ///     from: Some(start_of_month),
    ///     ..Default::default()
    /// }).await?;
    /// ```
    pub async fn report(&self, filter: &MovementFilter) -> DbResult<Vec<Movement>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements m
             JOIN inventory_items i ON i.id = m.item_id
             WHERE 1 = 1"
        ));

        if let Some(from) = filter.from {
            query.push(" AND m.occurred_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND m.occurred_at <= ").push_bind(to);
        }
        if let Some(kind) = filter.kind {
            query.push(" AND m.kind = ").push_bind(kind);
        }
        if let Some(product_id) = &filter.product_id {
            query.push(" AND i.product_id = ").push_bind(product_id.clone());
        }

        query
            .push(" ORDER BY m.occurred_at DESC, m.sequence DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(DEFAULT_REPORT_LIMIT));

        let rows: Vec<MovementRow> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Movement::from).collect())
    }
}
