//! # Error Types
//!
//! Domain-specific error types for stockbridge-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockbridge-core errors (this file)                                   │
//! │  ├── CoreError        - Ledger and catalog rule violations             │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockbridge-db errors                                                 │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  stockbridge-sync errors                                               │
//! │  └── SyncError        - ERP session/transport failures, wraps DbError  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → SyncError → CLI         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ledger errors carry the numbers the operator needs to correct the request
//! (available, requested, deficit). They are never fatal.

use thiserror::Error;

use crate::types::MovementKind;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations raised by the ledger and catalog logic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Inventory item cannot be found.
    #[error("Inventory item not found: {0}")]
    ItemNotFound(String),

    /// Not enough stock to complete an exit, transfer or reservation.
    ///
    /// ## User Workflow
    /// ```text
    /// Reserve 5 of CAM-001 / PRETO / M
    ///      │
    ///      ▼
    /// available = physical(8) - reserved(5) = 3
    ///      │
    ///      ▼
    /// InsufficientStock { available: 3, requested: 5, deficit: 2 }
    ///      │
    ///      ▼
    /// Operator sees: "only 3 available, short by 2"
    /// ```
    #[error("Insufficient stock for item {item}: available {available}, requested {requested} (short by {deficit})")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
        deficit: i64,
    },

    /// Release asked for more than is currently reserved.
    #[error("Insufficient reservation for item {item}: reserved {reserved}, requested {requested}")]
    InsufficientReservation {
        item: String,
        reserved: i64,
        requested: i64,
    },

    /// Movement request is not acceptable for its kind.
    ///
    /// ## When This Occurs
    /// - Zero or negative quantity on entry/exit/transfer
    /// - Zero delta on an adjustment
    /// - Reservation/release passed to `record_movement` instead of the
    ///   dedicated operations
    #[error("Invalid {kind} movement: {reason}")]
    InvalidMovement { kind: MovementKind, reason: String },

    /// An inventory item already exists for this product/color/size.
    #[error("Inventory item already exists for product {product_id}, color {color_code}, size {size}")]
    DuplicateVariant {
        product_id: String,
        color_code: String,
        size: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true for errors the operator can fix by changing the request.
    pub fn is_user_correctable(&self) -> bool {
        !matches!(self, CoreError::ProductNotFound(_) | CoreError::ItemNotFound(_))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            item: "item-1".to_string(),
            available: 3,
            requested: 5,
            deficit: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for item item-1: available 3, requested 5 (short by 2)"
        );
        assert!(err.is_user_correctable());
    }

    #[test]
    fn test_invalid_movement_message() {
        let err = CoreError::InvalidMovement {
            kind: MovementKind::Adjustment,
            reason: "delta must not be zero".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid adjustment movement: delta must not be zero");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert!(!CoreError::ItemNotFound("x".into()).is_user_correctable());
    }
}
