//! Authentication error types.

/// Errors from the login exchange.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    /// The login request could not be sent or its body read.
    #[error("Login request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Login rejected with HTTP status {status}")]
    Rejected { status: u16 },

    /// The API answered 2xx without a usable token.
    #[error("Login response did not contain a token")]
    MissingToken,
}
