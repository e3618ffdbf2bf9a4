//! Bearer token acquisition and caching.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use super::AuthError;
use crate::config::Credentials;

/// Supplies the token sent in the `x-redlock-auth` header.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a valid token, logging in first if none is cached.
    async fn token(&self) -> Result<String, AuthError>;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Logs in once per instance and hands out the cached token afterwards.
///
/// The cache lock is held across the login exchange, so callers racing on
/// the first acquisition wait for a single login instead of issuing their own.
pub struct LoginTokenProvider {
    client: Client,
    login_url: Url,
    credentials: Credentials,
    token: Mutex<Option<String>>,
}

impl LoginTokenProvider {
    #[must_use]
    pub fn new(client: Client, login_url: Url, credentials: Credentials) -> Self {
        Self {
            client,
            login_url,
            credentials,
            token: Mutex::new(None),
        }
    }

    async fn login(&self) -> Result<String, AuthError> {
        tracing::debug!(url = %self.login_url, "Logging in to source API");

        let response = self
            .client
            .post(self.login_url.clone())
            .json(&LoginRequest {
                username: &self.credentials.username,
                password: &self.credentials.password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: LoginResponse = response.json().await?;
        body.token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)
    }
}

#[async_trait]
impl TokenProvider for LoginTokenProvider {
    async fn token(&self) -> Result<String, AuthError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let token = self.login().await?;
        tracing::info!("Authenticated against source API");
        *cached = Some(token.clone());
        Ok(token)
    }
}

/// Fixed token, for callers that obtained one out of band.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider(String);

impl StaticTokenProvider {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}
