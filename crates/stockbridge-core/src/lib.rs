//! # stockbridge-core: Pure Domain Logic for StockBridge
//!
//! Catalog and stock types plus the inventory ledger, as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      StockBridge Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 stockbridge-cli (operator)                      │   │
//! │  │   sync products|stock|full, reserve, release, move, report      │   │
//! │  └───────────────┬───────────────────────────────┬─────────────────┘   │
//! │                  │                               │                      │
//! │  ┌───────────────▼──────────────┐   ┌────────────▼─────────────────┐   │
//! │  │ stockbridge-sync             │   │ stockbridge-db               │   │
//! │  │ ERP session, paging, upserts │──►│ repositories, InventoryLedger│   │
//! │  └───────────────┬──────────────┘   └────────────┬─────────────────┘   │
//! │                  │                               │                      │
//! │  ┌───────────────▼───────────────────────────────▼─────────────────┐   │
//! │  │            ★ stockbridge-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  ledger   │  │   money   │  │ validation│  │   │
//! │  │   │ Product   │  │ recompute │  │  Money    │  │  codes    │  │   │
//! │  │   │ Item      │  │ reserve   │  │  markup   │  │  ranges   │  │   │
//! │  │   │ Movement  │  │ release   │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, InventoryItem, Movement and closed vocabularies
//! - [`ledger`] - Quantity transitions (movement, reserve, release)
//! - [`money`] - Integer-cents money
//! - [`error`] - Domain error types
//! - [`validation`] - Field rules and normalization
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use stockbridge_core::ledger::check_availability;
//! # use stockbridge_core::types::*;
//! # let now = Utc::now();
//! # let item = InventoryItem {
//! #     id: "i".into(), product_id: "p".into(),
//! #     color: ItemColor { name: "Preto".into(), code: "PRT".into() },
//! #     size: "M".into(),
//! #     quantity: StockLevel { physical: 10, reserved: 4, ..StockLevel::default() },
//! #     location: Location::default(), status: InventoryStatus::Available,
//! #     lot: None, pricing: None, alerts: StockAlerts::default(), movement_seq: 0,
//! #     erp_code: None, sync: SyncMeta::default(), created_at: now, updated_at: now,
//! # };
//!
//! let answer = check_availability(&item, 8);
//! assert!(!answer.is_available);
//! assert_eq!(answer.deficit, 2);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{Availability, LedgerOutcome, MovementRequest};
pub use money::Money;
pub use types::*;
