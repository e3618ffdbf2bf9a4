//! Configuration loading from the environment and an optional TOML file.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use super::types::{ConnectorConfig, Credentials, TuningConfig};

pub const ENV_WORKSPACE_ID: &str = "AzureSentinelWorkspaceId";
pub const ENV_SHARED_KEY: &str = "AzureSentinelSharedKey";
pub const ENV_API_URL: &str = "CortexXDRAPIUrl";
pub const ENV_ACCESS_KEY: &str = "CortexXDRAccessKeyID";
pub const ENV_SECRET_KEY: &str = "CortexXDRSecretKey";
pub const ENV_LOG_TYPE: &str = "LogType";
pub const ENV_LOG_ANALYTICS_URI: &str = "logAnalyticsUri";
pub const ENV_LOGIN_URL: &str = "PrismaLoginUrl";
pub const ENV_WATERMARK_DB: &str = "WatermarkDbPath";

const DEFAULT_LOG_TYPE: &str = "audit";

fn log_analytics_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https://([\w\-]+)\.ods\.opinsights\.azure\.([a-zA-Z\.]+)$")
            .expect("static regex is valid")
    })
}

/// Returns the default path for the watermark database.
///
/// This is `~/.local/share/prisma-audit-forwarder/state.db` on Unix systems.
#[must_use]
pub fn default_watermark_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("prisma-audit-forwarder")
        .join("state.db")
}

/// Resolve the watermark database path from `WatermarkDbPath`, falling
/// back to [`default_watermark_db_path`] when it is unset or blank.
pub fn watermark_db_path_from_lookup<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup(ENV_WATERMARK_DB)
        .filter(|v| !v.trim().is_empty())
        .map_or_else(default_watermark_db_path, PathBuf::from)
}

/// [`watermark_db_path_from_lookup`] over the process environment.
#[must_use]
pub fn watermark_db_path_from_env() -> PathBuf {
    watermark_db_path_from_lookup(|name| std::env::var(name).ok())
}

/// Resolve the ingestion URI, falling back to the public cloud endpoint of
/// the workspace when no custom URI is given.
///
/// # Errors
///
/// Returns `ConfigError::InvalidLogAnalyticsUri` if the URI does not look
/// like `https://<workspace>.ods.opinsights.azure.<tld>`.
pub fn resolve_log_analytics_uri(
    workspace_id: &str,
    custom: Option<&str>,
) -> Result<Url, ConfigError> {
    let uri = match custom.map(str::trim) {
        Some(custom) if !custom.is_empty() => custom.to_string(),
        _ => format!("https://{workspace_id}.ods.opinsights.azure.com"),
    };

    if !log_analytics_pattern().is_match(&uri) {
        return Err(ConfigError::InvalidLogAnalyticsUri(uri));
    }

    Url::parse(&uri).map_err(|source| ConfigError::InvalidUrl {
        name: ENV_LOG_ANALYTICS_URI,
        source,
    })
}

/// Login endpoint on the same origin as the audit endpoint.
///
/// # Errors
///
/// Returns `ConfigError::InvalidUrl` if the joined URL cannot be built.
pub fn default_login_url(api_url: &Url) -> Result<Url, ConfigError> {
    api_url
        .join("/login")
        .map_err(|source| ConfigError::InvalidUrl {
            name: ENV_LOGIN_URL,
            source,
        })
}

impl ConnectorConfig {
    /// Build the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// See [`ConnectorConfig::from_lookup`].
    pub fn from_env(tuning: TuningConfig) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), tuning)
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVar` when a required variable is unset,
    /// `ConfigError::InvalidUrl` when an endpoint does not parse, and
    /// `ConfigError::InvalidLogAnalyticsUri` for a bad ingestion URI.
    pub fn from_lookup<F>(lookup: F, tuning: TuningConfig) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };
        let parse_url = |name: &'static str, raw: &str| {
            Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { name, source })
        };

        let workspace_id = required(ENV_WORKSPACE_ID)?;
        let shared_key = required(ENV_SHARED_KEY)?;
        let api_url = parse_url(ENV_API_URL, &required(ENV_API_URL)?)?;
        let credentials = Credentials {
            username: required(ENV_ACCESS_KEY)?,
            password: required(ENV_SECRET_KEY)?,
        };

        let log_analytics_uri =
            resolve_log_analytics_uri(&workspace_id, lookup(ENV_LOG_ANALYTICS_URI).as_deref())?;

        let login_url = match lookup(ENV_LOGIN_URL).filter(|v| !v.trim().is_empty()) {
            Some(raw) => parse_url(ENV_LOGIN_URL, &raw)?,
            None => default_login_url(&api_url)?,
        };

        let log_types = lookup(ENV_LOG_TYPE).unwrap_or_else(|| DEFAULT_LOG_TYPE.to_string());
        let watermark_db_path = watermark_db_path_from_lookup(&lookup);

        Ok(Self {
            workspace_id,
            shared_key,
            log_analytics_uri,
            api_url,
            login_url,
            credentials,
            log_types,
            watermark_db_path,
            tuning,
        })
    }
}

/// Locates the optional tuning file.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = vec![PathBuf::from(".prisma-audit-forwarder.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("prisma-audit-forwarder").join("config.toml"));
        }

        Self { search_paths }
    }

    /// Create a config loader with a specific config file path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
        }
    }

    /// Load tuning from the first available file, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load(&self) -> Result<TuningConfig, ConfigError> {
        for path in &self.search_paths {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading config file");
                return Self::load_from_path(path);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(TuningConfig::default())
    }

    fn load_from_path(path: &Path) -> Result<TuningConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur while building the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("Invalid URL in {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        source: url::ParseError,
    },

    #[error("Invalid Log Analytics Uri: {0}")]
    InvalidLogAnalyticsUri(String),

    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}
