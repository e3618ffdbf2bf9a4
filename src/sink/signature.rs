//! Log Analytics `SharedKey` request signing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::SinkError;

type HmacSha256 = Hmac<Sha256>;

/// Resource path signed into every request.
const RESOURCE: &str = "/api/logs";

/// Format `at` as the RFC 1123 date expected in `x-ms-date`.
#[must_use]
pub fn rfc1123_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Signs Data Collector requests with the workspace shared key.
#[derive(Clone)]
pub struct SharedKeySigner {
    workspace_id: String,
    mac: HmacSha256,
}

impl std::fmt::Debug for SharedKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedKeySigner")
            .field("workspace_id", &self.workspace_id)
            .finish_non_exhaustive()
    }
}

impl SharedKeySigner {
    /// Decode the base64 workspace key.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::InvalidSharedKey` if the key is not valid base64.
    pub fn new(workspace_id: impl Into<String>, shared_key: &str) -> Result<Self, SinkError> {
        let key = STANDARD
            .decode(shared_key.trim())
            .map_err(|e| SinkError::InvalidSharedKey(e.to_string()))?;
        let mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| SinkError::InvalidSharedKey(e.to_string()))?;

        Ok(Self {
            workspace_id: workspace_id.into(),
            mac,
        })
    }

    /// Value of the `Authorization` header for a JSON body of
    /// `content_length` bytes sent with `x-ms-date: date`.
    #[must_use]
    pub fn authorization(&self, date: &str, content_length: usize) -> String {
        let string_to_sign =
            format!("POST\n{content_length}\napplication/json\nx-ms-date:{date}\n{RESOURCE}");

        let mut mac = self.mac.clone();
        mac.update(string_to_sign.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        format!("SharedKey {}:{signature}", self.workspace_id)
    }
}
