use async_trait::async_trait;
use mediasync_model::{CanonicalMediaId, MediaSourceRef, NormalizedMediaMetadata};

use crate::error::Result;

/// Store of canonical works and the provider references linked to them.
#[async_trait]
pub trait CanonicalMediaRepository: Send + Sync {
    /// Create or update the canonical record for `normalized`. Calling this
    /// twice with the same input yields the same id and one record.
    async fn upsert_canonical_media(
        &self,
        normalized: &NormalizedMediaMetadata,
    ) -> Result<CanonicalMediaId>;

    /// Attach `source_ref` to `id`, replacing any ref with the same
    /// `(source_type, source_id)`.
    async fn add_or_update_source_ref(
        &self,
        id: &CanonicalMediaId,
        source_ref: MediaSourceRef,
    ) -> Result<()>;

    async fn source_refs(
        &self,
        id: &CanonicalMediaId,
    ) -> Result<Vec<MediaSourceRef>>;

    /// Preferred ref for playback: highest priority, then most recently
    /// linked.
    async fn default_source(
        &self,
        id: &CanonicalMediaId,
    ) -> Result<Option<MediaSourceRef>> {
        let refs = self.source_refs(id).await?;
        Ok(refs.into_iter().max_by(|a, b| a.preference(b)))
    }

    async fn save_resume_position(
        &self,
        id: &CanonicalMediaId,
        position_ms: u64,
    ) -> Result<()>;

    async fn resume_position(&self, id: &CanonicalMediaId) -> Result<Option<u64>>;
}
