//! # Inventory Ledger
//!
//! Pure state transitions for inventory lines. Every function here takes the
//! current item by reference and returns the next state; nothing is mutated
//! in place and nothing touches storage. `stockbridge-db` persists the
//! returned item and movement together.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Ledger Operation (any kind)                          │
//! │                                                                         │
//! │  item ──► recompute(item)          fresh available + alerts            │
//! │              │                                                          │
//! │              ▼                                                          │
//! │          check preconditions  ──── fail ──► CoreError, nothing changed │
//! │              │                                                          │
//! │              ▼                                                          │
//! │          apply delta to physical / reserved                            │
//! │              │                                                          │
//! │              ▼                                                          │
//! │          recompute + actor.stamp(sync)                                 │
//! │              │                                                          │
//! │              ▼                                                          │
//! │          LedgerOutcome { item', movement(seq = n + 1) }                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `available == max(0, physical - reserved)` on every returned item
//! - `low_stock == (available <= minimum)`, `zero_stock == (available <= 0)`
//! - `reserved <= physical` holds after every `reserve`
//! - exactly one movement per successful operation, sequence = previous + 1

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{
    Actor, DocumentRef, InventoryItem, InventoryStatus, Movement, MovementKind, StockAlerts,
};

// =============================================================================
// Requests and Results
// =============================================================================

/// Input for [`record_movement`].
///
/// `quantity` is a positive count for entry, exit and transfer. For
/// adjustment it is the signed delta applied to physical stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub kind: MovementKind,
    pub quantity: i64,
    pub reason: String,
    pub document: Option<DocumentRef>,
    pub notes: Option<String>,
}

impl MovementRequest {
    pub fn new(kind: MovementKind, quantity: i64, reason: impl Into<String>) -> Self {
        MovementRequest {
            kind,
            quantity,
            reason: reason.into(),
            document: None,
            notes: None,
        }
    }

    pub fn with_document(mut self, document: DocumentRef) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// The next item state plus the movement that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerOutcome {
    pub item: InventoryItem,
    pub movement: Movement,
}

/// Answer to "can I take `requested` units from this line?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub is_available: bool,
    pub available: i64,
    pub requested: i64,
    /// Units missing, zero when the request can be met.
    pub deficit: i64,
}

// =============================================================================
// Derived Fields
// =============================================================================

/// Recomputes `available` and the alert flags from the stored counters.
pub fn recompute(mut item: InventoryItem) -> InventoryItem {
    let q = &mut item.quantity;
    q.available = q.physical.saturating_sub(q.reserved).max(0);
    item.alerts = StockAlerts {
        low_stock: q.available <= q.minimum,
        zero_stock: q.available <= 0,
    };
    item
}

/// Pure availability query against a freshly recomputed item.
pub fn check_availability(item: &InventoryItem, quantity: i64) -> Availability {
    let available = item
        .quantity
        .physical
        .saturating_sub(item.quantity.reserved)
        .max(0);
    Availability {
        is_available: available >= quantity,
        available,
        requested: quantity,
        deficit: quantity.saturating_sub(available).max(0),
    }
}

// =============================================================================
// Mutating Operations
// =============================================================================

/// Applies an entry, exit, adjustment or transfer to physical stock.
///
/// ## Errors
/// - `InvalidMovement` for a non-positive count, a zero adjustment, or a
///   reservation/release kind
/// - `InsufficientStock` when physical stock would go negative
/// - `InvalidMovement` when the new count does not fit in an `i64`
pub fn record_movement(
    item: &InventoryItem,
    request: &MovementRequest,
    actor: &Actor,
    now: DateTime<Utc>,
) -> CoreResult<LedgerOutcome> {
    let current = recompute(item.clone());
    let kind = request.kind;

    let delta = match kind {
        MovementKind::Entry => positive(kind, request.quantity)?,
        MovementKind::Exit | MovementKind::Transfer => -positive(kind, request.quantity)?,
        MovementKind::Adjustment => {
            if request.quantity == 0 {
                return Err(invalid(kind, "delta must not be zero"));
            }
            if request.quantity.checked_abs().is_none() {
                return Err(out_of_range(kind));
            }
            request.quantity
        }
        MovementKind::Reservation | MovementKind::Release => {
            return Err(invalid(kind, "use reserve/release for reservations"));
        }
    };

    let before = current.quantity.physical;
    let after = before.checked_add(delta).ok_or_else(|| out_of_range(kind))?;
    if after < 0 {
        let requested = delta.abs();
        return Err(CoreError::InsufficientStock {
            item: current.id.clone(),
            available: before,
            requested,
            deficit: requested.saturating_sub(before),
        });
    }

    let mut next = current;
    next.quantity.physical = after;

    Ok(finish(next, actor, now, |item_id, sequence| Movement {
        item_id,
        sequence,
        kind,
        quantity: delta.abs(),
        quantity_before: before,
        quantity_after: after,
        reason: request.reason.clone(),
        document: request.document.clone(),
        actor: actor.label().to_string(),
        occurred_at: now,
        notes: request.notes.clone(),
    }))
}

/// Sets aside `quantity` units of available stock.
pub fn reserve(
    item: &InventoryItem,
    quantity: i64,
    reason: &str,
    actor: &Actor,
    now: DateTime<Utc>,
) -> CoreResult<LedgerOutcome> {
    let quantity = positive(MovementKind::Reservation, quantity)?;
    let current = recompute(item.clone());

    let availability = check_availability(&current, quantity);
    if !availability.is_available {
        return Err(CoreError::InsufficientStock {
            item: current.id.clone(),
            available: availability.available,
            requested: quantity,
            deficit: availability.deficit,
        });
    }

    let before = current.quantity.reserved;
    let mut next = current;
    next.quantity.reserved = before
        .checked_add(quantity)
        .ok_or_else(|| out_of_range(MovementKind::Reservation))?;

    Ok(reservation_outcome(next, MovementKind::Reservation, quantity, before, reason, actor, now))
}

/// Returns `quantity` reserved units to available stock.
pub fn release(
    item: &InventoryItem,
    quantity: i64,
    reason: &str,
    actor: &Actor,
    now: DateTime<Utc>,
) -> CoreResult<LedgerOutcome> {
    let quantity = positive(MovementKind::Release, quantity)?;
    let current = recompute(item.clone());

    let before = current.quantity.reserved;
    if before < quantity {
        return Err(CoreError::InsufficientReservation {
            item: current.id.clone(),
            reserved: before,
            requested: quantity,
        });
    }

    let mut next = current;
    next.quantity.reserved = before - quantity;

    Ok(reservation_outcome(next, MovementKind::Release, quantity, before, reason, actor, now))
}

/// Explicit status change. Quantities are untouched and no movement is
/// written.
pub fn set_status(
    item: &InventoryItem,
    status: InventoryStatus,
    actor: &Actor,
    now: DateTime<Utc>,
) -> InventoryItem {
    let mut next = recompute(item.clone());
    next.status = status;
    actor.stamp(&mut next.sync, now);
    next.updated_at = now;
    next
}

/// Builds the movement for a manual stock count that sets physical to
/// `counted`. Returns `Ok(None)` when the count matches.
pub fn count_adjustment(
    item: &InventoryItem,
    counted: i64,
    reason: impl Into<String>,
) -> CoreResult<Option<MovementRequest>> {
    if counted < 0 {
        return Err(crate::error::ValidationError::OutOfRange {
            field: "physical".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }
    let difference = counted
        .checked_sub(item.quantity.physical)
        .ok_or_else(|| out_of_range(MovementKind::Adjustment))?;
    Ok(match difference {
        0 => None,
        d if d > 0 => Some(MovementRequest::new(MovementKind::Entry, d, reason)),
        d => Some(MovementRequest::new(MovementKind::Exit, -d, reason)),
    })
}

// =============================================================================
// Helpers
// =============================================================================

fn positive(kind: MovementKind, quantity: i64) -> CoreResult<i64> {
    if quantity <= 0 {
        return Err(invalid(kind, "quantity must be positive"));
    }
    Ok(quantity)
}

fn invalid(kind: MovementKind, reason: &str) -> CoreError {
    CoreError::InvalidMovement {
        kind,
        reason: reason.to_string(),
    }
}

fn out_of_range(kind: MovementKind) -> CoreError {
    invalid(kind, "resulting quantity is out of range")
}

fn reservation_outcome(
    next: InventoryItem,
    kind: MovementKind,
    quantity: i64,
    before: i64,
    reason: &str,
    actor: &Actor,
    now: DateTime<Utc>,
) -> LedgerOutcome {
    let after = next.quantity.reserved;
    finish(next, actor, now, |item_id, sequence| Movement {
        item_id,
        sequence,
        kind,
        quantity,
        quantity_before: before,
        quantity_after: after,
        reason: reason.to_string(),
        document: None,
        actor: actor.label().to_string(),
        occurred_at: now,
        notes: None,
    })
}

/// Recomputes, stamps sync metadata and allocates the next movement
/// sequence.
fn finish(
    next: InventoryItem,
    actor: &Actor,
    now: DateTime<Utc>,
    movement: impl FnOnce(String, i64) -> Movement,
) -> LedgerOutcome {
    let mut next = recompute(next);
    next.movement_seq += 1;
    next.updated_at = now;
    actor.stamp(&mut next.sync, now);

    let movement = movement(next.id.clone(), next.movement_seq);
    LedgerOutcome { item: next, movement }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        DocumentKind, ItemColor, Location, StockLevel, SyncMeta, SyncStatus,
    };

    fn item(physical: i64, reserved: i64, minimum: i64) -> InventoryItem {
        let now = Utc::now();
        InventoryItem {
            id: "item-1".into(),
            product_id: "p-1".into(),
            color: ItemColor {
                name: "Preto".into(),
                code: "PRT".into(),
            },
            size: "M".into(),
            quantity: StockLevel {
                physical,
                reserved,
                // deliberately stale; every operation must recompute
                available: 999,
                minimum,
                maximum: 1000,
            },
            location: Location::default(),
            status: InventoryStatus::Available,
            lot: None,
            pricing: None,
            alerts: StockAlerts::default(),
            movement_seq: 0,
            erp_code: None,
            sync: SyncMeta::synced(now),
            created_at: now,
            updated_at: now,
        }
    }

    fn assert_derived(item: &InventoryItem) {
        let q = item.quantity;
        assert_eq!(q.available, (q.physical - q.reserved).max(0));
        assert_eq!(item.alerts.low_stock, q.available <= q.minimum);
        assert_eq!(item.alerts.zero_stock, q.available <= 0);
    }

    fn user() -> Actor {
        Actor::user("ana")
    }

    #[test]
    fn test_recompute_clamps_available_at_zero() {
        let it = recompute(item(3, 5, 0));
        assert_eq!(it.quantity.available, 0);
        assert!(it.alerts.zero_stock);
        assert!(it.alerts.low_stock);

        let it = recompute(item(10, 2, 5));
        assert_eq!(it.quantity.available, 8);
        assert!(!it.alerts.low_stock);
        assert!(!it.alerts.zero_stock);
    }

    #[test]
    fn test_entry_increases_physical_and_records_snapshots() {
        let now = Utc::now();
        let req = MovementRequest::new(MovementKind::Entry, 7, "receipt").with_document(DocumentRef {
            kind: DocumentKind::Invoice,
            number: "NF-123".into(),
        });

        let out = record_movement(&item(3, 0, 0), &req, &user(), now).unwrap();

        assert_eq!(out.item.quantity.physical, 10);
        assert_derived(&out.item);
        assert_eq!(out.movement.quantity_before, 3);
        assert_eq!(out.movement.quantity_after, 10);
        assert_eq!(out.movement.quantity, 7);
        assert_eq!(out.movement.sequence, 1);
        assert_eq!(out.movement.actor, "ana");
        assert_eq!(out.item.movement_seq, 1);
        assert_eq!(out.item.sync.status, SyncStatus::Pending);
    }

    #[test]
    fn test_exit_beyond_physical_fails_without_change() {
        let original = item(4, 0, 0);
        let snapshot = original.clone();
        let req = MovementRequest::new(MovementKind::Exit, 5, "sale");

        let err = record_movement(&original, &req, &user(), Utc::now()).unwrap_err();

        match err {
            CoreError::InsufficientStock { available, requested, deficit, .. } => {
                assert_eq!((available, requested, deficit), (4, 5, 1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(original, snapshot);
    }

    #[test]
    fn test_transfer_decreases_physical() {
        let req = MovementRequest::new(MovementKind::Transfer, 4, "to store 2");
        let out = record_movement(&item(4, 0, 1), &req, &user(), Utc::now()).unwrap();
        assert_eq!(out.item.quantity.physical, 0);
        assert!(out.item.alerts.zero_stock);
        assert_derived(&out.item);
    }

    #[test]
    fn test_adjustment_is_signed() {
        let now = Utc::now();
        let down = MovementRequest::new(MovementKind::Adjustment, -3, "count");
        let out = record_movement(&item(10, 0, 0), &down, &user(), now).unwrap();
        assert_eq!(out.item.quantity.physical, 7);
        assert_eq!(out.movement.quantity, 3);

        let zero = MovementRequest::new(MovementKind::Adjustment, 0, "noop");
        assert!(matches!(
            record_movement(&item(10, 0, 0), &zero, &user(), now),
            Err(CoreError::InvalidMovement { .. })
        ));

        let too_far = MovementRequest::new(MovementKind::Adjustment, -11, "count");
        assert!(matches!(
            record_movement(&item(10, 0, 0), &too_far, &user(), now),
            Err(CoreError::InsufficientStock { .. })
        ));
    }

    #[test]
    fn test_record_movement_rejects_bad_requests() {
        let now = Utc::now();
        for req in [
            MovementRequest::new(MovementKind::Entry, 0, "x"),
            MovementRequest::new(MovementKind::Exit, -2, "x"),
            MovementRequest::new(MovementKind::Reservation, 1, "x"),
            MovementRequest::new(MovementKind::Release, 1, "x"),
        ] {
            assert!(matches!(
                record_movement(&item(10, 0, 0), &req, &user(), now),
                Err(CoreError::InvalidMovement { .. })
            ));
        }
    }

    #[test]
    fn test_counter_overflow_is_rejected_without_change() {
        let now = Utc::now();
        let full = item(i64::MAX, 0, 0);
        let snapshot = full.clone();

        let entry = MovementRequest::new(MovementKind::Entry, 1, "x");
        assert!(matches!(
            record_movement(&full, &entry, &user(), now),
            Err(CoreError::InvalidMovement { .. })
        ));
        let bump = MovementRequest::new(MovementKind::Adjustment, i64::MAX, "x");
        assert!(matches!(
            record_movement(&full, &bump, &user(), now),
            Err(CoreError::InvalidMovement { .. })
        ));
        assert_eq!(full, snapshot);

        let floor = MovementRequest::new(MovementKind::Adjustment, i64::MIN, "x");
        assert!(matches!(
            record_movement(&item(10, 0, 0), &floor, &user(), now),
            Err(CoreError::InvalidMovement { .. })
        ));

        let odd = item(5, -1, 0);
        let reserved = item(i64::MAX, i64::MAX - 1, 0);
        assert!(reserve(&reserved, 1, "x", &user(), now).is_ok());
        assert!(reserve(&odd, 1, "x", &user(), now).is_ok());
        assert_eq!(check_availability(&item(5, 0, 0), i64::MIN).deficit, 0);
        assert_eq!(recompute(item(i64::MAX, -1, 0)).quantity.available, i64::MAX);
    }

    #[test]
    fn test_reserve_then_release_restores_counters() {
        let now = Utc::now();
        let start = recompute(item(10, 2, 0));

        let reserved = reserve(&start, 5, "order 42", &user(), now).unwrap();
        assert_eq!(reserved.item.quantity.reserved, 7);
        assert_eq!(reserved.item.quantity.available, 3);
        assert_eq!(reserved.movement.kind, MovementKind::Reservation);
        assert_eq!(reserved.movement.quantity_before, 2);
        assert_eq!(reserved.movement.quantity_after, 7);
        assert_derived(&reserved.item);

        let released = release(&reserved.item, 5, "order 42 cancelled", &user(), now).unwrap();
        assert_eq!(released.item.quantity.reserved, start.quantity.reserved);
        assert_eq!(released.item.quantity.available, start.quantity.available);
        assert_eq!(released.movement.kind, MovementKind::Release);
        assert_eq!(released.movement.sequence, 2);
        assert_eq!(released.item.quantity.physical, 10);
    }

    #[test]
    fn test_reserve_uses_fresh_available() {
        // stored available says 999, real available is 1
        let it = item(3, 2, 0);
        let err = reserve(&it, 2, "order", &user(), Utc::now()).unwrap_err();
        match err {
            CoreError::InsufficientStock { available, requested, deficit, .. } => {
                assert_eq!((available, requested, deficit), (1, 2, 1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reserve_failure_leaves_item_untouched() {
        let original = item(5, 0, 0);
        let snapshot = original.clone();
        assert!(reserve(&original, 6, "order", &user(), Utc::now()).is_err());
        assert!(reserve(&original, 0, "order", &user(), Utc::now()).is_err());
        assert_eq!(original, snapshot);
    }

    #[test]
    fn test_release_more_than_reserved_fails() {
        let err = release(&item(10, 2, 0), 3, "oops", &user(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientReservation { reserved: 2, requested: 3, .. }
        ));
    }

    #[test]
    fn test_check_availability() {
        let it = item(10, 4, 0);
        assert_eq!(
            check_availability(&it, 6),
            Availability { is_available: true, available: 6, requested: 6, deficit: 0 }
        );
        assert_eq!(
            check_availability(&it, 9),
            Availability { is_available: false, available: 6, requested: 9, deficit: 3 }
        );
    }

    #[test]
    fn test_erp_actor_marks_synced() {
        let now = Utc::now();
        let mut it = item(1, 0, 0);
        it.sync.mark_pending();
        let req = MovementRequest::new(MovementKind::Entry, 1, "erp");
        let out = record_movement(&it, &req, &Actor::ErpSync, now).unwrap();
        assert_eq!(out.item.sync.status, SyncStatus::Synced);
        assert_eq!(out.item.sync.last_synced_at, Some(now));
        assert_eq!(out.movement.actor, crate::types::ERP_SYNC_ACTOR);
    }

    #[test]
    fn test_set_status_is_orthogonal_to_quantities() {
        let it = item(10, 0, 0);
        let next = set_status(&it, InventoryStatus::Quarantine, &user(), Utc::now());
        assert_eq!(next.status, InventoryStatus::Quarantine);
        assert_eq!(next.quantity.physical, 10);
        assert_eq!(next.movement_seq, 0);
        assert_eq!(next.sync.status, SyncStatus::Pending);
    }

    #[test]
    fn test_count_adjustment() {
        let it = item(10, 0, 0);
        assert_eq!(count_adjustment(&it, 10, "count").unwrap(), None);

        let up = count_adjustment(&it, 12, "count").unwrap().unwrap();
        assert_eq!((up.kind, up.quantity), (MovementKind::Entry, 2));

        let down = count_adjustment(&it, 4, "count").unwrap().unwrap();
        assert_eq!((down.kind, down.quantity), (MovementKind::Exit, 6));

        assert!(count_adjustment(&it, -1, "count").is_err());
        assert!(count_adjustment(&item(-5, 0, 0), i64::MAX, "count").is_err());
    }
}
