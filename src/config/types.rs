//! Configuration types.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Log Analytics table name audit records are forwarded under.
pub const DEFAULT_AUDIT_CATEGORY: &str = "PaloAltoSentinel";

/// Logical path the audit watermark is stored under.
pub const DEFAULT_STORE_KEY: &str = "paloaltocloudsentinel/paloaltocloudlastauditlog";

/// Tuning knobs loaded from the optional TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Oldest point a run will ever start from, in seconds before now.
    pub lookback_secs: i64,
    /// Distance kept from "now" so not-yet-committed records are skipped.
    pub safety_margin_secs: i64,
    /// Buffered records per category before the sink flushes on its own.
    pub queue_size: usize,
    /// Category (Log Analytics `Log-Type`) for audit records.
    pub category: String,
    /// Key of the audit watermark in the store.
    pub store_key: String,
    /// TCP connect timeout for outbound HTTP.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout for outbound HTTP.
    pub request_timeout_secs: u64,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            lookback_secs: 6 * 60 * 60,
            safety_margin_secs: 10,
            queue_size: 10_000,
            category: DEFAULT_AUDIT_CATEGORY.to_string(),
            store_key: DEFAULT_STORE_KEY.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
        }
    }
}

impl TuningConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Credentials for the source API login exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything a run needs, resolved once at startup.
#[derive(Clone)]
pub struct ConnectorConfig {
    /// Log Analytics workspace identifier.
    pub workspace_id: String,
    /// Base64 encoded workspace shared key.
    pub shared_key: String,
    /// Validated Log Analytics ingestion base URI.
    pub log_analytics_uri: Url,
    /// Audit log endpoint of the source API.
    pub api_url: Url,
    /// Login endpoint of the source API.
    pub login_url: Url,
    pub credentials: Credentials,
    /// Raw log-type selector; categories are enabled by substring match.
    pub log_types: String,
    /// `SQLite` database holding watermarks.
    pub watermark_db_path: PathBuf,
    pub tuning: TuningConfig,
}

impl ConnectorConfig {
    /// Whether audit log forwarding is selected.
    #[must_use]
    pub fn audit_enabled(&self) -> bool {
        self.log_types.to_lowercase().contains("audit")
    }
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("workspace_id", &self.workspace_id)
            .field("shared_key", &"<redacted>")
            .field("log_analytics_uri", &self.log_analytics_uri.as_str())
            .field("api_url", &self.api_url.as_str())
            .field("login_url", &self.login_url.as_str())
            .field("credentials", &self.credentials)
            .field("log_types", &self.log_types)
            .field("watermark_db_path", &self.watermark_db_path)
            .field("tuning", &self.tuning)
            .finish()
    }
}
