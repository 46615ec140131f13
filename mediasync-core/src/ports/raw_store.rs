use async_trait::async_trait;
use mediasync_model::RawMediaMetadata;

use crate::error::Result;

/// Phase-specific store of raw provider items, keyed by `source_id`.
#[async_trait]
pub trait RawCatalogRepository: Send + Sync {
    /// Insert or replace every item; returns how many were written.
    async fn upsert_all(&self, items: &[RawMediaMetadata]) -> Result<usize>;

    async fn delete_all(&self) -> Result<u64>;

    async fn count(&self) -> Result<u64>;
}
