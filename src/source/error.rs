//! Fetch error types.

use crate::auth::AuthError;

/// Errors produced while fetching audit records.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// Token acquisition failed before the request was sent.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The API answered with something other than 200.
    #[error("Error while getting audit logs. HTTP status code: {status}")]
    Status { status: u16 },

    /// Transport failure.
    #[error("Audit log request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Body was not valid JSON.
    #[error("Failed to parse audit log response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Body was valid JSON but not an array of records.
    #[error("Audit log response is not a JSON array")]
    NotAnArray,

    /// A record lacks the integer `timestamp` field.
    #[error("Audit record at position {index} has no integer timestamp")]
    InvalidRecord { index: usize },
}

impl FetchError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } | Self::Auth(AuthError::Rejected { status }) => Some(*status),
            _ => None,
        }
    }
}
