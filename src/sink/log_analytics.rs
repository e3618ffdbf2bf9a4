//! Azure Log Analytics HTTP Data Collector sink.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::{rfc1123_date, LogSink, SharedKeySigner, SinkError};
use crate::source::AuditRecord;

/// Data Collector API version.
pub const API_VERSION: &str = "2016-04-01";

/// Upper bound on one request body; the service rejects posts above 30 MB.
pub const MAX_CHUNK_BYTES: usize = 25 * 1024 * 1024;

/// Split records into JSON array bodies no larger than `max_bytes`.
///
/// A single record larger than `max_bytes` is sent alone.
fn chunk_payloads(records: &[Value], max_bytes: usize) -> Result<Vec<(Vec<u8>, usize)>, SinkError> {
    let mut chunks = Vec::new();
    let mut body = vec![b'['];
    let mut count = 0;

    for record in records {
        let encoded = serde_json::to_vec(record)?;
        // +1 for the separator or the closing bracket.
        if count > 0 && body.len() + encoded.len() + 1 > max_bytes {
            body.push(b']');
            chunks.push((std::mem::replace(&mut body, vec![b'[']), count));
            count = 0;
        }
        if count > 0 {
            body.push(b',');
        }
        body.extend_from_slice(&encoded);
        count += 1;
    }

    if count > 0 {
        body.push(b']');
        chunks.push((body, count));
    }
    Ok(chunks)
}

/// Buffers records per category and posts them to a Log Analytics workspace.
pub struct LogAnalyticsSink {
    client: Client,
    endpoint: Url,
    signer: SharedKeySigner,
    queue_size: usize,
    buffers: Mutex<HashMap<String, Vec<Value>>>,
    sent: AtomicU64,
}

impl LogAnalyticsSink {
    /// Create a sink posting to `<base_uri>/api/logs`.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::InvalidSharedKey` for a malformed key.
    pub fn new(
        client: Client,
        base_uri: &Url,
        workspace_id: &str,
        shared_key: &str,
        queue_size: usize,
    ) -> Result<Self, SinkError> {
        let mut endpoint = base_uri.clone();
        endpoint.set_path("/api/logs");
        endpoint.set_query(Some(&format!("api-version={API_VERSION}")));

        Ok(Self {
            client,
            endpoint,
            signer: SharedKeySigner::new(workspace_id, shared_key)?,
            queue_size: queue_size.max(1),
            buffers: Mutex::new(HashMap::new()),
            sent: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Number of records currently buffered for `category`.
    #[must_use]
    pub fn buffered(&self, category: &str) -> usize {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(category)
            .map_or(0, Vec::len)
    }

    fn take_buffer(&self, category: &str) -> Vec<Value> {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(category)
            .unwrap_or_default()
    }

    async fn post_records(&self, category: &str, records: Vec<Value>) -> Result<(), SinkError> {
        for (body, count) in chunk_payloads(&records, MAX_CHUNK_BYTES)? {
            self.post_chunk(category, body, count).await?;
        }
        Ok(())
    }

    async fn post_chunk(&self, category: &str, body: Vec<u8>, count: usize) -> Result<(), SinkError> {
        let date = rfc1123_date(chrono::Utc::now());
        let authorization = self.signer.authorization(&date, body.len());

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, authorization)
            .header("Log-Type", category)
            .header("x-ms-date", date)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                category: category.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        self.sent.fetch_add(count as u64, Ordering::SeqCst);
        tracing::debug!(category, records = count, "Posted batch to Log Analytics");
        Ok(())
    }
}

#[async_trait]
impl LogSink for LogAnalyticsSink {
    async fn send(&self, record: &AuditRecord, category: &str) -> Result<(), SinkError> {
        let full = {
            let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
            let buffer = buffers.entry(category.to_string()).or_default();
            buffer.push(record.body().clone());
            if buffer.len() >= self.queue_size {
                Some(std::mem::take(buffer))
            } else {
                None
            }
        };

        match full {
            Some(records) => self.post_records(category, records).await,
            None => Ok(()),
        }
    }

    async fn flush(&self, category: &str) -> Result<(), SinkError> {
        let records = self.take_buffer(category);
        if records.is_empty() {
            return Ok(());
        }
        self.post_records(category, records).await
    }

    fn successful_sent_events(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }
}
