//! Shared outbound HTTP client construction.

use std::time::Duration;

use reqwest::Client;

use crate::config::TuningConfig;

/// Build an HTTP client with the configured timeouts.
///
/// # Errors
///
/// Returns the underlying `reqwest` error if the TLS backend cannot be
/// initialised.
pub fn build_http_client(connect: Duration, request: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(connect)
        .timeout(request)
        .build()
}

/// Build an HTTP client from tuning settings.
///
/// # Errors
///
/// See [`build_http_client`].
pub fn client_from_tuning(tuning: &TuningConfig) -> Result<Client, reqwest::Error> {
    build_http_client(tuning.connect_timeout(), tuning.request_timeout())
}
