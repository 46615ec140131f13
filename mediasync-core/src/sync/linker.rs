use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use mediasync_model::{CanonicalMediaId, MediaSourceRef, RawMediaMetadata};
use tracing::debug;

use super::hints::HintReport;
use crate::error::Result;
use crate::ports::{CanonicalMediaRepository, MediaMetadataNormalizer};

/// Outcome of linking one persisted batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub linked: u64,
    /// Items that are never linked (live channels).
    pub skipped: u64,
    pub failed: u64,
    pub hints: HintReport,
}

/// Normalizes raw items and attaches them to canonical works.
#[derive(Clone)]
pub struct CanonicalLinker {
    normalizer: Arc<dyn MediaMetadataNormalizer>,
    repository: Arc<dyn CanonicalMediaRepository>,
}

impl fmt::Debug for CanonicalLinker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanonicalLinker").finish_non_exhaustive()
    }
}

impl CanonicalLinker {
    pub fn new(
        normalizer: Arc<dyn MediaMetadataNormalizer>,
        repository: Arc<dyn CanonicalMediaRepository>,
    ) -> Self {
        Self {
            normalizer,
            repository,
        }
    }

    pub fn repository(&self) -> &Arc<dyn CanonicalMediaRepository> {
        &self.repository
    }

    /// Link a single item. `Ok(None)` for items that have no canonical
    /// identity.
    pub async fn link(
        &self,
        item: &RawMediaMetadata,
    ) -> Result<Option<CanonicalMediaId>> {
        if !item.media_type.is_linkable() {
            return Ok(None);
        }

        let normalized = self.normalizer.normalize(item);
        let id = self.repository.upsert_canonical_media(&normalized).await?;
        let source_ref = MediaSourceRef::from_raw(item, Utc::now());
        self.repository.add_or_update_source_ref(&id, source_ref).await?;
        Ok(Some(id))
    }

    /// Validate hints for every item, then link the batch. Individual
    /// failures are counted, never propagated.
    pub async fn link_batch(&self, items: &[RawMediaMetadata]) -> LinkReport {
        let mut report = LinkReport::default();
        for item in items {
            report.hints.check(item);
            match self.link(item).await {
                Ok(Some(_)) => report.linked += 1,
                Ok(None) => report.skipped += 1,
                Err(err) => {
                    report.failed += 1;
                    debug!(
                        target: "sync::link",
                        source_id = %item.source_id,
                        title = %item.title,
                        error = %err,
                        "canonical link failed"
                    );
                }
            }
        }
        report
    }
}
