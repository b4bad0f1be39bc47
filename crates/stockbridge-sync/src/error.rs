//! # Sync Error Types
//!
//! Error types for ERP sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │  ERP (abort)    │  │  Per record (counted)   │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  ExternalAuth   │  │  MalformedRecord        │ │
//! │  │  InvalidUrl     │  │  ExternalService│  │  ProductNotResolved     │ │
//! │  │  ConfigLoad/Save│  │                 │  │  Database               │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ERP errors end the current run. Per-record errors are logged,         │
//! │  counted in the summary, and the page loop continues.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use stockbridge_db::DbError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid ERP base URL.
    #[error("Invalid ERP URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // ERP Errors (abort the run)
    // =========================================================================
    /// Login was rejected or the ERP answered 401/403.
    #[error("ERP authentication failed: {0}")]
    ExternalAuth(String),

    /// The ERP was unreachable or answered with a bad envelope.
    #[error("ERP service error: {0}")]
    ExternalService(String),

    // =========================================================================
    // Per-Record Errors
    // =========================================================================
    /// A record in an ERP page could not be decoded or translated.
    #[error("Malformed ERP record {reference}: {reason}")]
    MalformedRecord { reference: String, reason: String },

    /// A stock record references a product that does not exist locally.
    #[error("No local product for ERP code {0}")]
    ProductNotResolved(String),

    /// Local storage rejected a write.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Failed to serialize a payload.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

/// Transport failures.
///
/// ```text
/// status 401/403        → ExternalAuth
/// timeout / connect     → ExternalService
/// undecodable body      → ExternalService
/// ```
impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => {
                SyncError::ExternalAuth(err.to_string())
            }
            _ if err.is_timeout() => SyncError::ExternalService(format!("request timed out: {err}")),
            _ => SyncError::ExternalService(err.to_string()),
        }
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if this error ends a sync run instead of being counted
    /// against a single record.
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            SyncError::ExternalAuth(_) | SyncError::ExternalService(_)
        ) || self.is_config_error()
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if the ERP rejected our credentials or token.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, SyncError::ExternalAuth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_classification() {
        assert!(SyncError::ExternalAuth("401".into()).is_abort());
        assert!(SyncError::ExternalService("502".into()).is_abort());
        assert!(SyncError::InvalidConfig("page_size".into()).is_abort());

        assert!(!SyncError::ProductNotResolved("P-1".into()).is_abort());
        assert!(!SyncError::MalformedRecord {
            reference: "#30".into(),
            reason: "missing field `codigo`".into(),
        }
        .is_abort());
        assert!(!SyncError::Database(DbError::PoolExhausted).is_abort());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::MalformedRecord {
            reference: "page 1 #30".into(),
            reason: "missing field `codigo`".into(),
        };
        assert!(err.to_string().contains("page 1 #30"));
        assert!(err.to_string().contains("codigo"));
    }
}
