//! Sink error types.

/// Errors from forwarding records.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    /// The workspace key is not valid base64.
    #[error("Invalid workspace shared key: {0}")]
    InvalidSharedKey(String),

    /// Transport failure.
    #[error("Log ingestion request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend refused a batch.
    #[error("Log ingestion rejected batch for {category} with HTTP status {status}: {body}")]
    Rejected {
        category: String,
        status: u16,
        body: String,
    },

    /// A record could not be serialized.
    #[error("Failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}
