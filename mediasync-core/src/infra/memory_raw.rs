use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use mediasync_model::RawMediaMetadata;
use tokio::sync::RwLock;

use crate::error::{Result, SyncError};
use crate::ports::RawCatalogRepository;

/// Raw store held in memory, keyed by `source_id`.
///
/// Keeps the size of every accepted write so callers can inspect how a run
/// batched its items.
#[derive(Debug, Default)]
pub struct InMemoryRawRepository {
    items: RwLock<HashMap<String, RawMediaMetadata>>,
    writes: RwLock<Vec<Vec<String>>>,
    fail_next: AtomicU64,
}

impl InMemoryRawRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` writes fail.
    pub fn fail_next_writes(&self, count: u64) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    pub async fn get(&self, source_id: &str) -> Option<RawMediaMetadata> {
        self.items.read().await.get(source_id).cloned()
    }

    /// Source ids of each accepted write, in write order.
    pub async fn writes(&self) -> Vec<Vec<String>> {
        self.writes.read().await.clone()
    }

    pub async fn write_sizes(&self) -> Vec<usize> {
        self.writes.read().await.iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl RawCatalogRepository for InMemoryRawRepository {
    async fn upsert_all(&self, items: &[RawMediaMetadata]) -> Result<usize> {
        let should_fail = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(SyncError::Repository("injected write failure".into()));
        }

        let mut stored = self.items.write().await;
        for item in items {
            stored.insert(item.source_id.clone(), item.clone());
        }
        self.writes
            .write()
            .await
            .push(items.iter().map(|item| item.source_id.clone()).collect());
        Ok(items.len())
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut stored = self.items.write().await;
        let deleted = stored.len() as u64;
        stored.clear();
        Ok(deleted)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.items.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use mediasync_model::{MediaType, SourceType};

    use super::*;

    fn item(id: &str) -> RawMediaMetadata {
        RawMediaMetadata::new(SourceType::Xtream, id, MediaType::Movie, id)
    }

    #[tokio::test]
    async fn upsert_replaces_by_source_id() -> Result<()> {
        let repo = InMemoryRawRepository::new();
        repo.upsert_all(&[item("a"), item("b")]).await?;
        repo.upsert_all(&[item("a")]).await?;

        assert_eq!(repo.count().await?, 2);
        assert_eq!(repo.write_sizes().await, vec![2, 1]);
        assert_eq!(repo.delete_all().await?, 2);
        assert_eq!(repo.count().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() -> Result<()> {
        let repo = InMemoryRawRepository::new();
        repo.fail_next_writes(1);
        assert!(repo.upsert_all(&[item("a")]).await.is_err());
        repo.upsert_all(&[item("a")]).await?;
        assert_eq!(repo.count().await?, 1);
        Ok(())
    }
}
