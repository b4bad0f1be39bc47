//! # Sync Orchestrator
//!
//! Drives the product and stock feeds from the ERP into local storage.
//!
//! ## Page Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  page = 1                                                               │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  ensure_authenticated ──(login fails)──► Err(ExternalAuth), run ends    │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  GET /produtos?page&limit ──(bad envelope)──► Err(ExternalService)      │
//! │    │                                                                    │
//! │    ├── data empty ───────────────────────────────────────► done         │
//! │    ▼                                                                    │
//! │  for each record:                                                       │
//! │    decode ─► lookup by ERP code ─► merge ─► upsert                      │
//! │       │                                        │                        │
//! │       └──── error: log, count failed ◄─────────┘                        │
//! │    │                                                                    │
//! │    ├── last page per pagination ─────────────────────────► done         │
//! │    ├── page == max_pages ──────────► warn, truncated ────► done         │
//! │    ▼                                                                    │
//! │  page += 1                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Runs are sequential and suspend only at I/O. Two runs started at once are
//! not coordinated; both upsert by natural key, so the last write wins.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use stockbridge_core::Product;
use stockbridge_db::{Database, SyncStats};

use crate::config::SyncSettings;
use crate::erp::{decode_record, record_reference, ErpProduct, ErpStock};
use crate::error::{SyncError, SyncResult};
use crate::session::{ErpSession, ErpToken, SessionState};
use crate::transport::{ErpEnvelope, ErpTransport};

pub const PRODUCTS_ENDPOINT: &str = "/produtos";
pub const STOCK_ENDPOINT: &str = "/estoque";

// =============================================================================
// Requests & Summaries
// =============================================================================

/// Query of one list page: `page`, `limit` and free-form ERP filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    pub filters: Vec<(String, String)>,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        PageRequest {
            page,
            limit,
            filters: Vec::new(),
        }
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        query.extend(
            self.filters
                .iter()
                .filter(|(key, _)| key != "page" && key != "limit")
                .cloned(),
        );
        query
    }
}

/// Outcome of one feed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub succeeded: u64,
    pub failed: u64,
    /// Stock records whose product is not known locally.
    pub skipped: u64,
    /// Non-empty pages processed.
    pub pages: u32,
    /// The page cap stopped the run before the feed was exhausted.
    pub truncated: bool,
    pub message: String,
}

/// Outcome of [`SyncOrchestrator::sync_full`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FullSyncSummary {
    pub products: SyncSummary,
    pub stock: SyncSummary,
    pub duration_ms: u64,
}

/// Sync state of the local tables plus the ERP session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatusReport {
    pub products: SyncStats,
    pub inventory: SyncStats,
    pub session: SessionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feed {
    Products,
    Stock,
}

impl Feed {
    fn endpoint(self) -> &'static str {
        match self {
            Feed::Products => PRODUCTS_ENDPOINT,
            Feed::Stock => STOCK_ENDPOINT,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Feed::Products => "product",
            Feed::Stock => "stock",
        }
    }
}

enum RecordOutcome {
    Applied,
    Skipped,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// ERP bridge over a transport and the local database.
pub struct SyncOrchestrator<T> {
    transport: T,
    db: Database,
    settings: SyncSettings,
    session: RwLock<ErpSession>,
}

impl<T: ErpTransport> SyncOrchestrator<T> {
    pub fn new(transport: T, db: Database, settings: SyncSettings) -> Self {
        SyncOrchestrator {
            transport,
            db,
            settings,
            session: RwLock::new(ErpSession::new()),
        }
    }

    pub async fn session_state(&self) -> SessionState {
        self.session.read().await.state(Utc::now())
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Logs in and replaces the session token.
    pub async fn authenticate(&self) -> SyncResult<()> {
        let mut session = self.session.write().await;
        self.login_into(&mut session).await.map(|_| ())
    }

    async fn login_into(&self, session: &mut ErpSession) -> SyncResult<String> {
        info!("Authenticating with ERP");

        let response = self.transport.login().await.inspect_err(|e| {
            error!(error = %e, "ERP authentication failed");
        })?;

        let token = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SyncError::ExternalAuth("login response carried no token".into()))?;

        session.authenticated(ErpToken::issued(token.clone(), response.expires_in, Utc::now()));
        info!(expires_at = ?session.expires_at(), "ERP session established");
        Ok(token)
    }

    /// Returns a usable token, logging in first when the session is absent
    /// or expired.
    pub async fn ensure_authenticated(&self) -> SyncResult<String> {
        {
            let session = self.session.read().await;
            if let Some(token) = session.valid_token(Utc::now()) {
                return Ok(token.to_string());
            }
        }

        let mut session = self.session.write().await;

        // Double-check after acquiring write lock
        if let Some(token) = session.valid_token(Utc::now()) {
            return Ok(token.to_string());
        }

        self.login_into(&mut session).await
    }

    /// Forces a fresh login.
    pub async fn test_connection(&self) -> SyncResult<()> {
        let mut session = self.session.write().await;
        session.invalidate();
        self.login_into(&mut session).await?;
        info!("ERP connection test succeeded");
        Ok(())
    }

    /// An ERP 401 means the token is no longer good.
    async fn forget_token_on_auth_error(&self, err: &SyncError) {
        if err.is_auth_error() {
            warn!("ERP rejected the session token, dropping it");
            self.session.write().await.invalidate();
        }
    }

    // =========================================================================
    // Raw ERP Calls
    // =========================================================================

    async fn fetch_page(&self, endpoint: &str, request: &PageRequest) -> SyncResult<ErpEnvelope> {
        let token = self.ensure_authenticated().await?;

        debug!(endpoint, page = request.page, limit = request.limit, "Fetching ERP page");

        let body = match self.transport.get(endpoint, &request.to_query(), &token).await {
            Ok(body) => body,
            Err(e) => {
                self.forget_token_on_auth_error(&e).await;
                return Err(e);
            }
        };

        ErpEnvelope::from_body(endpoint, body)
    }

    /// One page of the ERP product catalog.
    pub async fn fetch_products_page(&self, request: &PageRequest) -> SyncResult<ErpEnvelope> {
        self.fetch_page(PRODUCTS_ENDPOINT, request).await
    }

    /// One page of the ERP stock feed.
    pub async fn fetch_stock_page(&self, request: &PageRequest) -> SyncResult<ErpEnvelope> {
        self.fetch_page(STOCK_ENDPOINT, request).await
    }

    /// POSTs `payload` to `endpoint`, returning the ERP's answer.
    pub async fn push_data(&self, endpoint: &str, payload: &Value) -> SyncResult<Value> {
        let token = self.ensure_authenticated().await?;

        info!(endpoint, "Pushing data to ERP");

        let body = match self.transport.post(endpoint, payload, &token).await {
            Ok(body) => body,
            Err(e) => {
                self.forget_token_on_auth_error(&e).await;
                return Err(e);
            }
        };

        ErpEnvelope::from_body(endpoint, body.clone())?;
        info!(endpoint, "ERP accepted pushed data");
        Ok(body)
    }

    // =========================================================================
    // Feed Runs
    // =========================================================================

    /// Pulls the whole product catalog.
    pub async fn sync_products(&self) -> SyncResult<SyncSummary> {
        self.run_feed(Feed::Products).await
    }

    /// Pulls stock levels. Run after [`Self::sync_products`] so owning
    /// products exist.
    pub async fn sync_stock(&self) -> SyncResult<SyncSummary> {
        self.run_feed(Feed::Stock).await
    }

    /// Products, settle delay, then stock.
    pub async fn sync_full(&self) -> SyncResult<FullSyncSummary> {
        let started = Instant::now();
        info!("Starting full ERP sync");

        let products = self.sync_products().await?;

        let delay = self.settings.settle_delay();
        if !delay.is_zero() {
            debug!(delay_ms = self.settings.settle_delay_ms, "Waiting before stock sync");
            tokio::time::sleep(delay).await;
        }

        let stock = self.sync_stock().await?;

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(duration_ms, "Full ERP sync finished");

        Ok(FullSyncSummary {
            products,
            stock,
            duration_ms,
        })
    }

    async fn run_feed(&self, feed: Feed) -> SyncResult<SyncSummary> {
        info!(feed = feed.label(), "Starting ERP sync");

        let mut summary = SyncSummary::default();
        let mut page: u32 = 1;

        loop {
            let request = PageRequest::new(page, self.settings.page_size);
            let envelope = self.fetch_page(feed.endpoint(), &request).await?;
            let records = envelope.records()?;

            if records.is_empty() {
                break;
            }

            for (index, raw) in records.iter().enumerate() {
                let result = match feed {
                    Feed::Products => self.apply_product(raw, page, index).await,
                    Feed::Stock => self.apply_stock(raw, page, index).await,
                };

                match result {
                    Ok(RecordOutcome::Applied) => summary.succeeded += 1,
                    Ok(RecordOutcome::Skipped) => summary.skipped += 1,
                    Err(e) => {
                        error!(
                            feed = feed.label(),
                            record = %record_reference(raw, page, index),
                            error = %e,
                            "Failed to apply ERP record"
                        );
                        summary.failed += 1;
                    }
                }
            }

            summary.pages += 1;

            let last_page = envelope
                .pagination
                .as_ref()
                .and_then(|p| p.total_pages)
                .is_some_and(|total| page >= total);
            if last_page {
                break;
            }

            if page >= self.settings.max_pages {
                warn!(
                    feed = feed.label(),
                    max_pages = self.settings.max_pages,
                    "Page limit reached, stopping sync"
                );
                summary.truncated = true;
                break;
            }

            page += 1;
        }

        summary.message = format!(
            "{} sync finished: {} records processed, {} failed",
            feed.label(),
            summary.succeeded,
            summary.failed
        );
        info!(
            feed = feed.label(),
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            pages = summary.pages,
            truncated = summary.truncated,
            "ERP sync finished"
        );

        Ok(summary)
    }

    async fn apply_product(&self, raw: &Value, page: u32, index: usize) -> SyncResult<RecordOutcome> {
        let record: ErpProduct = decode_record(raw, page, index)?;
        let products = self.db.products();
        let now = Utc::now();

        let existing = products.get_by_erp_code(&record.code).await?;
        let existing_id = existing.as_ref().map(|p| p.id.clone());
        let erp_code = record.code.clone();

        match products.upsert_from_erp(record.merge_into(existing, now), now).await {
            Ok(saved) => {
                debug!(erp_code = %erp_code, id = %saved.id, "Product synced");
                Ok(RecordOutcome::Applied)
            }
            Err(e) => {
                if let Some(id) = existing_id {
                    if let Err(mark) = products.mark_sync_error(&id, &e.to_string()).await {
                        warn!(id = %id, error = %mark, "Could not flag product sync error");
                    }
                }
                Err(e.into())
            }
        }
    }

    async fn apply_stock(&self, raw: &Value, page: u32, index: usize) -> SyncResult<RecordOutcome> {
        let record: ErpStock = decode_record(raw, page, index)?;
        let now = Utc::now();

        let product = match self.resolve_product(&record.product_code).await {
            Ok(product) => product,
            Err(SyncError::ProductNotResolved(product_code)) => {
                warn!(
                    erp_code = %record.code,
                    product_code = %product_code,
                    "No local product for stock record, skipping"
                );
                return Ok(RecordOutcome::Skipped);
            }
            Err(e) => return Err(e),
        };

        let inventory = self.db.inventory();
        let existing = inventory
            .find_by_variant(&product.id, &record.color_code, &record.size)
            .await?;
        let existing_id = existing.as_ref().map(|i| i.id.clone());
        let erp_code = record.code.clone();

        match inventory
            .upsert_from_erp(record.merge_into(&product.id, existing, now), now)
            .await
        {
            Ok(saved) => {
                debug!(erp_code = %erp_code, id = %saved.id, "Stock line synced");
                Ok(RecordOutcome::Applied)
            }
            Err(e) => {
                if let Some(id) = existing_id {
                    if let Err(mark) = inventory.mark_sync_error(&id, &e.to_string()).await {
                        warn!(id = %id, error = %mark, "Could not flag stock sync error");
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Local product owning a stock record, looked up by ERP code.
    async fn resolve_product(&self, erp_code: &str) -> SyncResult<Product> {
        self.db
            .products()
            .get_by_erp_code(erp_code)
            .await?
            .ok_or_else(|| SyncError::ProductNotResolved(erp_code.to_string()))
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Sync counters of both tables.
    pub async fn sync_status(&self) -> SyncResult<SyncStatusReport> {
        Ok(SyncStatusReport {
            products: self.db.products().sync_stats().await?,
            inventory: self.db.inventory().sync_stats().await?,
            session: self.session_state().await,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoginResponse;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use stockbridge_core::{Category, SyncStatus};
    use stockbridge_db::DbConfig;

    /// In-process ERP serving fixed record lists, paginated like the real
    /// API.
    #[derive(Default)]
    struct FakeErp {
        feeds: HashMap<&'static str, Vec<Value>>,
        /// Omit `totalPages` so only an empty page or the cap ends a run.
        hide_total_pages: bool,
        reject_login: bool,
        expires_in: Option<i64>,
        reject_token: AtomicBool,
        post_success: bool,
        logins: AtomicUsize,
        gets: AtomicUsize,
        posted: Mutex<Vec<(String, Value)>>,
    }

    impl FakeErp {
        fn with_feed(mut self, endpoint: &'static str, records: Vec<Value>) -> Self {
            self.feeds.insert(endpoint, records);
            self
        }
    }

    impl ErpTransport for FakeErp {
        async fn login(&self) -> SyncResult<LoginResponse> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            if self.reject_login {
                return Err(SyncError::ExternalAuth("ERP answered 401 Unauthorized".into()));
            }
            Ok(LoginResponse {
                token: Some(format!("token-{}", self.logins.load(Ordering::SeqCst))),
                expires_in: Some(self.expires_in.unwrap_or(3600)),
            })
        }

        async fn get(&self, path: &str, query: &[(String, String)], token: &str) -> SyncResult<Value> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            assert!(token.starts_with("token-"));
            if self.reject_token.load(Ordering::SeqCst) {
                return Err(SyncError::ExternalAuth("ERP answered 401 Unauthorized".into()));
            }

            let param = |name: &str| -> usize {
                query
                    .iter()
                    .find(|(k, _)| k == name)
                    .and_then(|(_, v)| v.parse().ok())
                    .unwrap()
            };
            let (page, limit) = (param("page"), param("limit"));
            let records = self.feeds.get(path).cloned().unwrap_or_default();
            let total_pages = records.len().div_ceil(limit);
            let data: Vec<Value> = records.into_iter().skip((page - 1) * limit).take(limit).collect();

            let mut pagination = json!({"page": page, "limit": limit});
            if !self.hide_total_pages {
                pagination["totalPages"] = json!(total_pages);
            }
            Ok(json!({"success": true, "data": data, "pagination": pagination}))
        }

        async fn post(&self, path: &str, body: &Value, _token: &str) -> SyncResult<Value> {
            self.posted.lock().unwrap().push((path.to_string(), body.clone()));
            Ok(json!({"success": self.post_success, "message": "rejected"}))
        }
    }

    fn settings(page_size: u32, max_pages: u32) -> SyncSettings {
        SyncSettings {
            page_size,
            max_pages,
            settle_delay_ms: 0,
        }
    }

    async fn orchestrator(erp: FakeErp, settings: SyncSettings) -> SyncOrchestrator<FakeErp> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        SyncOrchestrator::new(erp, db, settings)
    }

    fn product_record(code: &str) -> Value {
        json!({
            "codigo": code,
            "nome": format!("Produto {code}"),
            "categoria": "CAMISETA",
            "precoCusto": 40.0,
            "precoVenda": 89.9
        })
    }

    fn stock_record(code: &str, product_code: &str, physical: i64) -> Value {
        json!({
            "codigo": code,
            "codigoProduto": product_code,
            "cor": "prt",
            "nomeCor": "Preto",
            "tamanho": "m",
            "quantidadeFisica": physical,
            "quantidadeMinima": 2
        })
    }

    #[tokio::test]
    async fn test_malformed_record_is_counted_and_skipped() {
        let mut records: Vec<Value> = (1..=50).map(|i| product_record(&format!("T-{i}"))).collect();
        records[29] = json!({"nome": "sem codigo"});

        let sync = orchestrator(
            FakeErp::default().with_feed(PRODUCTS_ENDPOINT, records),
            settings(50, 100),
        )
        .await;

        let summary = sync.sync_products().await.unwrap();
        assert_eq!((summary.succeeded, summary.failed), (49, 1));
        assert_eq!(summary.pages, 1);
        assert!(!summary.truncated);
        assert_eq!(sync.db.products().count().await.unwrap(), 49);
    }

    #[tokio::test]
    async fn test_unknown_category_falls_back_to_tshirt() {
        let record = json!({"codigo": "T-1", "nome": "Tunica", "categoria": "TUNICA", "precoVenda": 99.0});
        let sync = orchestrator(
            FakeErp::default().with_feed(PRODUCTS_ENDPOINT, vec![record]),
            settings(50, 100),
        )
        .await;

        sync.sync_products().await.unwrap();

        let product = sync.db.products().get_by_erp_code("T-1").await.unwrap().unwrap();
        assert_eq!(product.category, Category::TShirt);
        assert_eq!(product.sync.status, SyncStatus::Synced);
        assert!(product.sync.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn test_repeated_sync_updates_in_place() {
        let sync = orchestrator(
            FakeErp::default().with_feed(PRODUCTS_ENDPOINT, vec![product_record("T-1")]),
            settings(50, 100),
        )
        .await;

        sync.sync_products().await.unwrap();
        let first = sync.db.products().get_by_erp_code("T-1").await.unwrap().unwrap();
        assert_eq!(first.name, "Produto T-1");

        let mut renamed = product_record("T-1");
        renamed["nome"] = json!("Camiseta Basica Renomeada");
        let sync = SyncOrchestrator::new(
            FakeErp::default().with_feed(PRODUCTS_ENDPOINT, vec![renamed]),
            sync.db.clone(),
            settings(50, 100),
        );

        let summary = sync.sync_products().await.unwrap();
        assert_eq!(summary.succeeded, 1);

        let second = sync.db.products().get_by_erp_code("T-1").await.unwrap().unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Camiseta Basica Renomeada");
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(sync.db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stock_without_product_is_skipped() {
        let erp = FakeErp::default()
            .with_feed(PRODUCTS_ENDPOINT, vec![product_record("T-1")])
            .with_feed(
                STOCK_ENDPOINT,
                vec![stock_record("E-1", "T-1", 12), stock_record("E-2", "T-404", 5)],
            );
        let sync = orchestrator(erp, settings(50, 100)).await;

        sync.sync_products().await.unwrap();
        let summary = sync.sync_stock().await.unwrap();
        assert_eq!((summary.succeeded, summary.failed, summary.skipped), (1, 0, 1));

        let product = sync.db.products().get_by_erp_code("T-1").await.unwrap().unwrap();
        let line = sync
            .db
            .inventory()
            .find_by_variant(&product.id, "PRT", "M")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line.quantity.physical, 12);
        assert_eq!(line.quantity.available, 12);
        assert_eq!(line.sync.status, SyncStatus::Synced);
        assert_eq!(line.movement_seq, 0);
        assert!(sync.db.movements().list_for_item(&line.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_page_cap_truncates() {
        let records: Vec<Value> = (1..=5).map(|i| product_record(&format!("T-{i}"))).collect();
        let erp = FakeErp {
            hide_total_pages: true,
            ..FakeErp::default()
        }
        .with_feed(PRODUCTS_ENDPOINT, records);
        let sync = orchestrator(erp, settings(1, 2)).await;

        let summary = sync.sync_products().await.unwrap();
        assert!(summary.truncated);
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(sync.transport.gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_page_ends_run_without_total_pages() {
        let records: Vec<Value> = (1..=3).map(|i| product_record(&format!("T-{i}"))).collect();
        let erp = FakeErp {
            hide_total_pages: true,
            ..FakeErp::default()
        }
        .with_feed(PRODUCTS_ENDPOINT, records);
        let sync = orchestrator(erp, settings(2, 100)).await;

        let summary = sync.sync_products().await.unwrap();
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.pages, 2);
        assert!(!summary.truncated);
        assert_eq!(sync.transport.gets.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_before_any_write() {
        let erp = FakeErp {
            reject_login: true,
            ..FakeErp::default()
        }
        .with_feed(PRODUCTS_ENDPOINT, vec![product_record("T-1")]);
        let sync = orchestrator(erp, settings(50, 100)).await;

        let err = sync.sync_products().await.unwrap_err();
        assert!(matches!(err, SyncError::ExternalAuth(_)));
        assert_eq!(sync.transport.gets.load(Ordering::SeqCst), 0);
        assert_eq!(sync.db.products().count().await.unwrap(), 0);
        assert_eq!(sync.session_state().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_expired_token_triggers_relogin() {
        let erp = FakeErp {
            expires_in: Some(0),
            ..FakeErp::default()
        };
        let sync = orchestrator(erp, settings(50, 100)).await;

        sync.fetch_products_page(&PageRequest::new(1, 50)).await.unwrap();
        assert_eq!(sync.session_state().await, SessionState::Expired);

        sync.fetch_stock_page(&PageRequest::new(1, 50)).await.unwrap();
        assert_eq!(sync.transport.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_valid_token_is_reused() {
        let sync = orchestrator(FakeErp::default(), settings(50, 100)).await;
        assert_eq!(sync.session_state().await, SessionState::Unauthenticated);

        sync.fetch_products_page(&PageRequest::new(1, 50)).await.unwrap();
        sync.fetch_stock_page(&PageRequest::new(1, 50).filter("deposito", "PRINCIPAL"))
            .await
            .unwrap();

        assert_eq!(sync.transport.logins.load(Ordering::SeqCst), 1);
        assert_eq!(sync.session_state().await, SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_rejected_token_drops_session() {
        let sync = orchestrator(FakeErp::default(), settings(50, 100)).await;
        sync.authenticate().await.unwrap();
        sync.transport.reject_token.store(true, Ordering::SeqCst);

        let err = sync.fetch_products_page(&PageRequest::new(1, 50)).await.unwrap_err();
        assert!(err.is_auth_error());
        assert_eq!(sync.session_state().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_test_connection_forces_login() {
        let sync = orchestrator(FakeErp::default(), settings(50, 100)).await;
        sync.authenticate().await.unwrap();
        sync.test_connection().await.unwrap();
        assert_eq!(sync.transport.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_push_data() {
        let rejecting = orchestrator(FakeErp::default(), settings(50, 100)).await;
        let err = rejecting
            .push_data("/pedidos", &json!({"numero": 42}))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ExternalService(ref m) if m.contains("rejected")));

        let accepting = orchestrator(
            FakeErp {
                post_success: true,
                ..FakeErp::default()
            },
            settings(50, 100),
        )
        .await;
        let body = accepting.push_data("/pedidos", &json!({"numero": 42})).await.unwrap();
        assert_eq!(body["success"], json!(true));

        let posted = accepting.transport.posted.lock().unwrap();
        assert_eq!(posted[0].0, "/pedidos");
        assert_eq!(posted[0].1["numero"], json!(42));
    }

    #[tokio::test]
    async fn test_full_sync_and_status() {
        let erp = FakeErp::default()
            .with_feed(PRODUCTS_ENDPOINT, vec![product_record("T-1"), product_record("T-2")])
            .with_feed(STOCK_ENDPOINT, vec![stock_record("E-1", "T-1", 3)]);
        let sync = orchestrator(erp, settings(50, 100)).await;

        let full = sync.sync_full().await.unwrap();
        assert_eq!(full.products.succeeded, 2);
        assert_eq!(full.stock.succeeded, 1);

        let status = sync.sync_status().await.unwrap();
        assert_eq!((status.products.total, status.products.synced), (2, 2));
        assert_eq!((status.inventory.total, status.inventory.synced), (1, 1));
        assert!(status.inventory.last_synced_at.is_some());
        assert_eq!(status.session, SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_full_sync_waits_before_stock() {
        let erp = FakeErp::default()
            .with_feed(PRODUCTS_ENDPOINT, vec![product_record("T-1")])
            .with_feed(STOCK_ENDPOINT, vec![stock_record("E-1", "T-1", 3)]);
        let sync = orchestrator(
            erp,
            SyncSettings {
                settle_delay_ms: 150,
                ..settings(50, 100)
            },
        )
        .await;

        let started = Instant::now();
        let full = sync.sync_full().await.unwrap();
        assert!(started.elapsed() >= std::time::Duration::from_millis(150));
        assert!(full.duration_ms >= 150);
        assert_eq!(full.stock.succeeded, 1);
    }

    #[tokio::test]
    async fn test_failed_update_flags_existing_record() {
        let sync = orchestrator(
            FakeErp::default().with_feed(PRODUCTS_ENDPOINT, vec![product_record("T-1")]),
            settings(50, 100),
        )
        .await;
        sync.sync_products().await.unwrap();

        let mut bad = product_record("T-1");
        bad["precoVenda"] = json!(-5.0);
        let sync = SyncOrchestrator::new(
            FakeErp::default().with_feed(PRODUCTS_ENDPOINT, vec![bad]),
            sync.db.clone(),
            settings(50, 100),
        );

        let summary = sync.sync_products().await.unwrap();
        assert_eq!((summary.succeeded, summary.failed), (0, 1));

        let product = sync.db.products().get_by_erp_code("T-1").await.unwrap().unwrap();
        assert_eq!(product.sync.status, SyncStatus::Error);
        assert!(product.sync.error.is_some());
        assert_eq!(product.price.sale.cents(), 8990);
    }
}
