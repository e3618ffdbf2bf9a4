//! Audit record wrapper.

use serde::Serialize;
use serde_json::Value;

/// A fetched audit record, forwarded exactly as the API returned it.
///
/// The only field the connector reads is `timestamp` (epoch milliseconds),
/// which is extracted once at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AuditRecord {
    #[serde(skip)]
    timestamp: i64,
    body: Value,
}

impl AuditRecord {
    /// Wrap a raw JSON record, returning it back if it has no integer
    /// `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns the original value when `timestamp` is missing or not an
    /// integer.
    pub fn from_value(body: Value) -> Result<Self, Value> {
        match body.get("timestamp").and_then(Value::as_i64) {
            Some(timestamp) => Ok(Self { timestamp, body }),
            None => Err(body),
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }
}
