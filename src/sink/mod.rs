//! Forwarding sinks for fetched records.

mod error;
mod log_analytics;
mod memory;
mod signature;

pub use error::SinkError;
pub use log_analytics::{LogAnalyticsSink, API_VERSION, MAX_CHUNK_BYTES};
pub use memory::MemorySink;
pub use signature::{rfc1123_date, SharedKeySigner};

use async_trait::async_trait;

use crate::source::AuditRecord;

/// Buffers records per category and transmits them to a logging backend.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Buffer `record` under `category`. May transmit when the buffer fills.
    async fn send(&self, record: &AuditRecord, category: &str) -> Result<(), SinkError>;

    /// Transmit everything buffered for `category`. A category with nothing
    /// buffered is a no-op.
    async fn flush(&self, category: &str) -> Result<(), SinkError>;

    /// Records accepted by the backend since the sink was created.
    fn successful_sent_events(&self) -> u64;
}
