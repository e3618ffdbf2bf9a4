//! In-memory sink.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use super::{LogSink, SinkError};
use crate::source::AuditRecord;

#[derive(Debug, Default)]
struct Inner {
    sends: Vec<(String, Value)>,
    pending: HashMap<String, Vec<Value>>,
    delivered: Vec<(String, Value)>,
    flushes: Vec<String>,
}

/// Sink that keeps everything in memory. Flushing moves a category's
/// buffered records to the delivered list.
#[derive(Debug, Default)]
pub struct MemorySink {
    inner: Mutex<Inner>,
    sent: AtomicU64,
    reject_sends: bool,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose every `send` fails.
    #[must_use]
    pub fn rejecting() -> Self {
        Self {
            reject_sends: true,
            ..Self::default()
        }
    }

    /// Every `send` call in order, with its category.
    #[must_use]
    pub fn sends(&self) -> Vec<(String, Value)> {
        self.lock().sends.clone()
    }

    /// Records moved out by `flush`, in order.
    #[must_use]
    pub fn delivered(&self) -> Vec<(String, Value)> {
        self.lock().delivered.clone()
    }

    /// Categories passed to `flush`, in call order.
    #[must_use]
    pub fn flushes(&self) -> Vec<String> {
        self.lock().flushes.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn send(&self, record: &AuditRecord, category: &str) -> Result<(), SinkError> {
        if self.reject_sends {
            return Err(SinkError::Rejected {
                category: category.to_string(),
                status: 503,
                body: "memory sink rejects sends".to_string(),
            });
        }

        let mut inner = self.lock();
        inner
            .sends
            .push((category.to_string(), record.body().clone()));
        inner
            .pending
            .entry(category.to_string())
            .or_default()
            .push(record.body().clone());
        Ok(())
    }

    async fn flush(&self, category: &str) -> Result<(), SinkError> {
        let mut inner = self.lock();
        inner.flushes.push(category.to_string());
        let pending = inner.pending.remove(category).unwrap_or_default();
        self.sent.fetch_add(pending.len() as u64, Ordering::SeqCst);
        inner
            .delivered
            .extend(pending.into_iter().map(|v| (category.to_string(), v)));
        Ok(())
    }

    fn successful_sent_events(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }
}
