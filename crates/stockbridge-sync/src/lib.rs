//! # stockbridge-sync: TOTVS MODA ERP Bridge
//!
//! Pulls the product catalog and stock levels from the ERP into the local
//! StockBridge database and pushes local payloads back.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ERP Sync Architecture                           │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  SyncOrchestrator<T: ErpTransport>               │  │
//! │  │                                                                  │  │
//! │  │  sync_products / sync_stock / sync_full / push_data / status    │  │
//! │  │  RwLock<ErpSession>: token, re-login on expiry                  │  │
//! │  └────────────┬───────────────────────┬─────────────────────┬──────┘  │
//! │               ▼                       ▼                     ▼         │
//! │  ┌────────────────────┐  ┌────────────────────┐  ┌─────────────────┐  │
//! │  │   HttpErpTransport │  │   erp + vocabulary │  │  stockbridge-db │  │
//! │  │                    │  │                    │  │                 │  │
//! │  │ reqwest, 30 s      │  │ wire records,      │  │ upsert by       │  │
//! │  │ timeout, headers   │  │ merge, ERP labels  │  │ natural key     │  │
//! │  └────────────────────┘  └────────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Sync error types
//! - [`session`] - ERP token state machine
//! - [`transport`] - `ErpTransport` trait and the reqwest implementation
//! - [`erp`] - ERP wire records and their merge into local types
//! - [`vocabulary`] - ERP label tables
//! - [`orchestrator`] - Page loops, upserts and summaries
//!
//! ## Usage
//! ```rust,ignore
//! use stockbridge_sync::{HttpErpTransport, SyncConfig, SyncOrchestrator};
//!
//! let config = SyncConfig::load(None)?;
//! let transport = HttpErpTransport::new(config.erp.clone())?;
//! let sync = SyncOrchestrator::new(transport, db, config.sync.clone());
//!
//! let summary = sync.sync_full().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod erp;
pub mod error;
pub mod orchestrator;
pub mod session;
pub mod transport;
pub mod vocabulary;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConnectionInfo, DatabaseSettings, ErpSettings, SyncConfig, SyncSettings};
pub use error::{SyncError, SyncResult};
pub use orchestrator::{
    FullSyncSummary, PageRequest, SyncOrchestrator, SyncStatusReport, SyncSummary,
};
pub use session::{ErpSession, ErpToken, SessionState};
pub use transport::{ErpEnvelope, ErpTransport, HttpErpTransport, LoginResponse, Pagination};
