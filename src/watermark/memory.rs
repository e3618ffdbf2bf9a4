//! In-memory watermark store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{StoreError, WatermarkStore};

/// Watermark held in process memory. Counts writes so callers can tell a
/// rewrite of the same value from no write at all.
#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    value: Mutex<Option<String>>,
    posts: AtomicUsize,
    reject_posts: bool,
}

impl MemoryWatermarkStore {
    #[must_use]
    pub fn new(initial: Option<&str>) -> Self {
        Self {
            value: Mutex::new(initial.map(String::from)),
            posts: AtomicUsize::new(0),
            reject_posts: false,
        }
    }

    /// Store holding `initial` whose every `post` fails.
    #[must_use]
    pub fn rejecting(initial: Option<&str>) -> Self {
        Self {
            reject_posts: true,
            ..Self::new(initial)
        }
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> Option<String> {
        self.value.lock().ok().and_then(|v| v.clone())
    }

    /// Number of `post` calls so far.
    #[must_use]
    pub fn post_count(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn get(&self) -> Result<Option<String>, StoreError> {
        Ok(self.value())
    }

    async fn post(&self, value: String) -> Result<(), StoreError> {
        if self.reject_posts {
            return Err(StoreError::ReadOnly);
        }
        if let Ok(mut slot) = self.value.lock() {
            *slot = Some(value);
        }
        self.posts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_and_post() {
        let store = MemoryWatermarkStore::new(Some("10"));
        assert_eq!(store.get().await.unwrap().as_deref(), Some("10"));

        store.post("20".to_string()).await.unwrap();
        assert_eq!(store.value().as_deref(), Some("20"));
        assert_eq!(store.post_count(), 1);
    }

    #[tokio::test]
    async fn test_rejecting_store_keeps_value() {
        let store = MemoryWatermarkStore::rejecting(Some("10"));
        let err = store.post("20".to_string()).await.unwrap_err();
        assert!(matches!(err, StoreError::ReadOnly));
        assert_eq!(store.value().as_deref(), Some("10"));
        assert_eq!(store.post_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = MemoryWatermarkStore::default();
        assert!(store.get().await.unwrap().is_none());
        assert_eq!(store.post_count(), 0);
    }
}
