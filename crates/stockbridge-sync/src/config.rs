//! # Sync Configuration
//!
//! ERP connection and sync loop settings.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TOTVS_BASE_URL=https://erp.example.com/api/v1                      │
//! │     TOTVS_API_KEY=...   STOCKBRIDGE_PAGE_SIZE=50                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockbridge/stockbridge.toml (Linux)                     │
//! │     ~/Library/Application Support/com.stockbridge.stockbridge/...      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     page_size 50, max_pages 100, settle delay 2 s, timeout 30 s        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [erp]
//! base_url = "https://erp.example.com/api/v1"
//! api_key = "..."
//! username = "integracao"
//! password = "..."
//! company_id = "001"
//! timeout_secs = 30
//!
//! [sync]
//! page_size = 50
//! max_pages = 100
//! settle_delay_ms = 2000
//!
//! [database]
//! path = "stockbridge.db"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// ERP Settings
// =============================================================================

/// Connection settings for the TOTVS MODA API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpSettings {
    /// API root, e.g. `https://erp.example.com/api/v1`.
    #[serde(default)]
    pub base_url: String,

    /// Sent as `X-API-Key` on every call.
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Sent as `X-Company-ID` and in the login body.
    #[serde(default)]
    pub company_id: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for ErpSettings {
    fn default() -> Self {
        ErpSettings {
            base_url: String::new(),
            api_key: String::new(),
            username: String::new(),
            password: String::new(),
            company_id: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ErpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Page loop behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Records requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Page cap per run. Hitting it ends the run with `truncated` set.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Pause between the product and stock phases of a full sync
    /// (milliseconds).
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
}

fn default_page_size() -> u32 {
    50
}
fn default_max_pages() -> u32 {
    100
}
fn default_settle_delay() -> u64 {
    2000
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            settle_delay_ms: default_settle_delay(),
        }
    }
}

impl SyncSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("stockbridge.db")
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete StockBridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub erp: ErpSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl SyncConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (stockbridge.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    ///
    /// Missing ERP credentials are not an error here: local ledger commands
    /// run without them, and the first ERP call fails with `ExternalAuth`.
    pub fn validate(&self) -> SyncResult<()> {
        if !self.erp.base_url.is_empty() {
            let url = url::Url::parse(&self.erp.base_url)?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(SyncError::InvalidUrl(format!(
                    "ERP URL must start with http:// or https://, got: {}",
                    self.erp.base_url
                )));
            }
        }

        if self.erp.timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.sync.page_size == 0 {
            return Err(SyncError::InvalidConfig(
                "page_size must be greater than 0".into(),
            ));
        }

        if self.sync.max_pages == 0 {
            return Err(SyncError::InvalidConfig(
                "max_pages must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("TOTVS_BASE_URL") {
            debug!(url = %url, "Overriding ERP URL from environment");
            self.erp.base_url = url;
        }
        if let Some(key) = var("TOTVS_API_KEY") {
            self.erp.api_key = key;
        }
        if let Some(username) = var("TOTVS_USERNAME") {
            self.erp.username = username;
        }
        if let Some(password) = var("TOTVS_PASSWORD") {
            self.erp.password = password;
        }
        if let Some(company) = var("TOTVS_COMPANY_ID") {
            self.erp.company_id = company;
        }

        if let Some(path) = var("STOCKBRIDGE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        parse_into(&var, "STOCKBRIDGE_PAGE_SIZE", &mut self.sync.page_size);
        parse_into(&var, "STOCKBRIDGE_MAX_PAGES", &mut self.sync.max_pages);
        parse_into(&var, "STOCKBRIDGE_SETTLE_DELAY_MS", &mut self.sync.settle_delay_ms);
        parse_into(&var, "STOCKBRIDGE_HTTP_TIMEOUT_SECS", &mut self.erp.timeout_secs);
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stockbridge", "stockbridge")
            .map(|dirs| dirs.config_dir().join("stockbridge.toml"))
    }

    /// Redacted view for display.
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            base_url: self.erp.base_url.clone(),
            company_id: self.erp.company_id.clone(),
            has_api_key: !self.erp.api_key.is_empty(),
            has_username: !self.erp.username.is_empty(),
            has_password: !self.erp.password.is_empty(),
        }
    }
}

fn parse_into<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(raw) = var(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => warn!(key, value = %raw, "Ignoring unparseable environment override"),
        }
    }
}

// =============================================================================
// Connection Info
// =============================================================================

/// ERP settings with the secrets replaced by presence flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub base_url: String,
    pub company_id: String,
    pub has_api_key: bool,
    pub has_username: bool,
    pub has_password: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.sync.page_size, 50);
        assert_eq!(config.sync.max_pages, 100);
        assert_eq!(config.sync.settle_delay(), Duration::from_secs(2));
        assert_eq!(config.erp.timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();

        config.erp.base_url = "ftp://erp.example.com".into();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.erp.base_url = "not a url".into();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.erp.base_url = "https://erp.example.com/api/v1".into();
        assert!(config.validate().is_ok());

        config.sync.page_size = 0;
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = SyncConfig::default();
        config.erp.base_url = "https://erp.example.com/api/v1".into();
        config.erp.company_id = "001".into();
        config.sync.page_size = 25;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[erp]"));
        assert!(toml_str.contains("[sync]"));
        assert!(toml_str.contains("[database]"));

        let parsed: SyncConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.erp.company_id, "001");
        assert_eq!(parsed.sync.page_size, 25);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: SyncConfig = toml::from_str("[erp]\nbase_url = \"https://x.test\"\n").unwrap();
        assert_eq!(parsed.erp.timeout_secs, 30);
        assert_eq!(parsed.sync.max_pages, 100);
        assert_eq!(parsed.database.path, PathBuf::from("stockbridge.db"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TOTVS_BASE_URL", "https://erp.test/api"),
            ("TOTVS_COMPANY_ID", "042"),
            ("STOCKBRIDGE_PAGE_SIZE", "10"),
            ("STOCKBRIDGE_MAX_PAGES", "abc"),
            ("STOCKBRIDGE_DB_PATH", "/tmp/sb.db"),
        ]
        .into_iter()
        .collect();

        let mut config = SyncConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.erp.base_url, "https://erp.test/api");
        assert_eq!(config.erp.company_id, "042");
        assert_eq!(config.sync.page_size, 10);
        assert_eq!(config.sync.max_pages, 100);
        assert_eq!(config.database.path, PathBuf::from("/tmp/sb.db"));
    }

    #[test]
    fn test_connection_info_redacts_secrets() {
        let mut config = SyncConfig::default();
        config.erp.api_key = "secret-key".into();
        config.erp.password = "hunter2".into();

        let info = config.connection_info();
        assert!(info.has_api_key);
        assert!(info.has_password);
        assert!(!info.has_username);

        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("secret-key"));
        assert!(!json.contains("hunter2"));
    }
}
