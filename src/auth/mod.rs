//! Source API authentication.

mod error;
mod token;

pub use error::AuthError;
pub use token::{LoginTokenProvider, StaticTokenProvider, TokenProvider};
