//! Durable watermark persistence.

mod error;
mod memory;
mod sqlite;

pub use error::StoreError;
pub use memory::MemoryWatermarkStore;
pub use sqlite::{SqliteWatermarkStore, SCHEMA};

use async_trait::async_trait;

/// Key-value persistence for one watermark, stored as a decimal string of
/// epoch milliseconds.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Read the stored watermark, if any.
    async fn get(&self) -> Result<Option<String>, StoreError>;

    /// Replace the stored watermark.
    async fn post(&self, value: String) -> Result<(), StoreError>;
}
