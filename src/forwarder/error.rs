//! Top-level run error.

use crate::config::ConfigError;
use crate::sink::SinkError;
use crate::source::FetchError;
use crate::watermark::StoreError;

/// Anything that ends a run early.
#[derive(thiserror::Error, Debug)]
pub enum ConnectorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Forwarding failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Watermark store failed: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_passes_through() {
        let err: ConnectorError = FetchError::Status { status: 500 }.into();
        assert_eq!(
            err.to_string(),
            "Error while getting audit logs. HTTP status code: 500"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err: ConnectorError = ConfigError::MissingVar("CortexXDRAPIUrl").into();
        assert!(err.to_string().contains("CortexXDRAPIUrl"));
    }
}
