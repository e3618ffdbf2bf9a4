//! Audit log source: records, time windows, and the fetch client.

mod client;
mod error;
mod record;
mod window;

pub use client::{AuditLogSource, MemorySource, PrismaAuditSource, RecordStream, AUTH_HEADER};
pub use error::FetchError;
pub use record::AuditRecord;
pub use window::{Clock, FixedClock, SystemClock, TimeWindow, WindowPolicy};
