//! # ERP Transport
//!
//! HTTP plumbing for the TOTVS MODA API, behind the [`ErpTransport`] trait so
//! the orchestrator can be driven by an in-process fake in tests.
//!
//! ## Request Shape
//! ```text
//! POST {base}/auth/login   {username, password, companyId} → {token, expiresIn}
//! GET  {base}/produtos?page=1&limit=50                      → {success, data[], pagination}
//! GET  {base}/estoque?page=1&limit=50                       → {success, data[], pagination}
//! POST {base}/{endpoint}   payload                          → {success, ...}
//!
//! Headers on every call:
//!   Authorization: Bearer <token>    (once logged in)
//!   X-API-Key, X-Company-ID
//!   Accept / Content-Type: application/json
//! ```

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ErpSettings;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Wire Envelopes
// =============================================================================

/// Body of a successful `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    /// Token lifetime in seconds.
    #[serde(default, rename = "expiresIn")]
    pub expires_in: Option<i64>,
}

/// Pagination block of a list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default, rename = "totalPages")]
    pub total_pages: Option<u32>,
}

/// `{success, data, pagination, message}` wrapper around every ERP answer.
///
/// `data` stays as raw JSON so a page can be decoded record by record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErpEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErpEnvelope {
    /// Parses a raw body, requiring `success: true`.
    pub fn from_body(context: &str, body: Value) -> SyncResult<Self> {
        let envelope: ErpEnvelope = serde_json::from_value(body).map_err(|e| {
            SyncError::ExternalService(format!("{context}: invalid response envelope: {e}"))
        })?;

        if !envelope.success {
            let reason = envelope.message.as_deref().unwrap_or("success flag not set");
            return Err(SyncError::ExternalService(format!("{context}: {reason}")));
        }

        Ok(envelope)
    }

    /// The records of a list response. A missing or null `data` is an
    /// empty page.
    pub fn records(&self) -> SyncResult<&[Value]> {
        match &self.data {
            None | Some(Value::Null) => Ok(&[]),
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(SyncError::ExternalService(
                "list response `data` is not an array".into(),
            )),
        }
    }
}

// =============================================================================
// Transport Trait
// =============================================================================

/// The three ERP calls the orchestrator makes.
///
/// Implementations map HTTP 401/403 to [`SyncError::ExternalAuth`] and every
/// other failure (connect, timeout, non-2xx, undecodable body) to
/// [`SyncError::ExternalService`]. Envelope checks are left to the caller.
#[allow(async_fn_in_trait)]
pub trait ErpTransport {
    /// Exchanges the configured credentials for a token.
    async fn login(&self) -> SyncResult<LoginResponse>;

    /// `GET {path}` with query parameters.
    async fn get(&self, path: &str, query: &[(String, String)], token: &str) -> SyncResult<Value>;

    /// `POST {path}` with a JSON body.
    async fn post(&self, path: &str, body: &Value, token: &str) -> SyncResult<Value>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpErpTransport {
    client: Client,
    settings: ErpSettings,
}

impl std::fmt::Debug for HttpErpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpErpTransport")
            .field("base_url", &self.settings.base_url)
            .field("company_id", &self.settings.company_id)
            .field("api_key", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpErpTransport {
    /// Builds a client with the configured per-request timeout.
    pub fn new(settings: ErpSettings) -> SyncResult<Self> {
        if settings.base_url.is_empty() {
            return Err(SyncError::InvalidConfig("erp.base_url is not set".into()));
        }
        Url::parse(&settings.base_url)?;

        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(HttpErpTransport { client, settings })
    }

    /// Joins `path` onto the base URL, keeping any path prefix of the base.
    fn endpoint(&self, path: &str) -> SyncResult<Url> {
        endpoint_url(&self.settings.base_url, path)
    }

    fn with_headers(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        let request = request
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("X-API-Key", &self.settings.api_key)
            .header("X-Company-ID", &self.settings.company_id);

        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> SyncResult<Value> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SyncError::ExternalAuth(format!("ERP answered {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::ExternalService(format!(
                "ERP answered {status}: {}",
                truncate(&body, 200)
            )));
        }

        Ok(response.json::<Value>().await?)
    }
}

impl ErpTransport for HttpErpTransport {
    async fn login(&self) -> SyncResult<LoginResponse> {
        let url = self.endpoint("/auth/login")?;
        let body = serde_json::json!({
            "username": self.settings.username,
            "password": self.settings.password,
            "companyId": self.settings.company_id,
        });

        debug!(%url, "ERP login");

        let request = self.with_headers(self.client.post(url), None).json(&body);
        let raw = self.send(request).await.map_err(|e| match e {
            SyncError::ExternalAuth(msg) | SyncError::ExternalService(msg) => {
                SyncError::ExternalAuth(msg)
            }
            other => other,
        })?;

        serde_json::from_value(raw)
            .map_err(|e| SyncError::ExternalAuth(format!("invalid login response: {e}")))
    }

    async fn get(&self, path: &str, query: &[(String, String)], token: &str) -> SyncResult<Value> {
        let mut url = self.endpoint(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        debug!(%url, "ERP GET");

        let request = self.with_headers(self.client.get(url), Some(token));
        self.send(request).await
    }

    async fn post(&self, path: &str, body: &Value, token: &str) -> SyncResult<Value> {
        let url = self.endpoint(path)?;

        debug!(%url, "ERP POST");

        let request = self.with_headers(self.client.post(url), Some(token)).json(body);
        self.send(request).await
    }
}

fn endpoint_url(base: &str, path: &str) -> SyncResult<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&joined)?)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
