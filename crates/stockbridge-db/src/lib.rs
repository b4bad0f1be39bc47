//! # stockbridge-db: Database Layer for StockBridge
//!
//! SQLite storage for the catalog, inventory lines and the movement log,
//! using sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        StockBridge Data Flow                            │
//! │                                                                         │
//! │  CLI command (item reserve) / SyncOrchestrator (sync stock)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  stockbridge-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  product      │    │  (embedded)  │  │   │
//! │  │   │               │    │  inventory    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  movement     │    │ 001_init.sql │  │   │
//! │  │   │               │    ├───────────────┤    │              │  │   │
//! │  │   │               │◄───│ InventoryLedger│   │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Product, inventory and movement repositories
//! - [`ledger`] - Transactional inventory ledger
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockbridge_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("stockbridge.db")).await?;
//!
//! let line = db.inventory().find_by_variant(&product_id, "PRT", "M").await?;
//! let outcome = db.ledger().reserve(&line.id, 2, "order 42", &actor).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use ledger::{InventoryLedger, OpenedItem};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::inventory::{InventoryRepository, InventoryTotals};
pub use repository::movement::{MovementFilter, MovementRepository};
pub use repository::product::{
    CategoryCount, GenderCount, PriceSummary, ProductFilter, ProductRepository,
};
pub use repository::{generate_id, SyncStats};
