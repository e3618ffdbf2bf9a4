//! Audit log fetch client.

use std::pin::Pin;
use std::sync::{Arc, Mutex};

use futures_core::Stream;
use futures_util::stream::{self, TryStreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::{AuditRecord, FetchError, TimeWindow};
use crate::auth::TokenProvider;

/// Header carrying the source API token.
pub const AUTH_HEADER: &str = "x-redlock-auth";

/// Lazy, finite, non-restartable sequence of fetched records.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<AuditRecord, FetchError>> + Send>>;

/// Produces the audit records inside a time window.
pub trait AuditLogSource: Send + Sync {
    /// Start fetching `window`. No request is made until the stream is first
    /// polled; request errors surface as the first stream item.
    fn fetch(&self, window: TimeWindow) -> RecordStream;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditQuery {
    time_type: &'static str,
    start_time: i64,
    end_time: i64,
}

fn into_record_stream(
    values: Vec<Value>,
) -> impl Stream<Item = Result<AuditRecord, FetchError>> + Send {
    stream::iter(values.into_iter().enumerate().map(|(index, value)| {
        AuditRecord::from_value(value).map_err(|_| FetchError::InvalidRecord { index })
    }))
}

/// Fetches audit logs from the Prisma Cloud audit endpoint.
#[derive(Clone)]
pub struct PrismaAuditSource {
    client: Client,
    api_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl PrismaAuditSource {
    #[must_use]
    pub fn new(client: Client, api_url: Url, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client,
            api_url,
            tokens,
        }
    }

    async fn request(self, window: TimeWindow) -> Result<Vec<Value>, FetchError> {
        let token = self.tokens.token().await?;

        tracing::debug!(
            start_ms = window.start_ms,
            end_ms = window.end_ms,
            "Requesting audit logs"
        );

        let response = self
            .client
            .get(self.api_url)
            .header(AUTH_HEADER, token)
            .header(ACCEPT, "*/*")
            .header(CONTENT_TYPE, "application/json")
            .query(&AuditQuery {
                time_type: "absolute",
                start_time: window.start_ms,
                end_time: window.end_ms,
            })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        match serde_json::from_str(&text)? {
            Value::Array(items) => Ok(items),
            _ => Err(FetchError::NotAnArray),
        }
    }
}

impl AuditLogSource for PrismaAuditSource {
    fn fetch(&self, window: TimeWindow) -> RecordStream {
        let this = self.clone();
        Box::pin(
            stream::once(this.request(window))
                .map_ok(into_record_stream)
                .try_flatten(),
        )
    }
}

/// In-memory source returning a canned response.
#[derive(Debug)]
pub struct MemorySource {
    response: Result<Vec<Value>, u16>,
    windows: Mutex<Vec<TimeWindow>>,
}

impl MemorySource {
    /// Source whose every fetch returns `records`.
    #[must_use]
    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            response: Ok(records),
            windows: Mutex::new(Vec::new()),
        }
    }

    /// Source whose every fetch fails with HTTP `status`.
    #[must_use]
    pub fn failing(status: u16) -> Self {
        Self {
            response: Err(status),
            windows: Mutex::new(Vec::new()),
        }
    }

    /// Windows requested so far, oldest first.
    #[must_use]
    pub fn windows(&self) -> Vec<TimeWindow> {
        self.windows
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }
}

impl AuditLogSource for MemorySource {
    fn fetch(&self, window: TimeWindow) -> RecordStream {
        if let Ok(mut windows) = self.windows.lock() {
            windows.push(window);
        }
        match self.response.clone() {
            Ok(values) => Box::pin(into_record_stream(values)),
            Err(status) => Box::pin(stream::once(async move {
                Err::<AuditRecord, _>(FetchError::Status { status })
            })),
        }
    }
}
