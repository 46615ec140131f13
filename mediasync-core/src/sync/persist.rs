use std::fmt;
use std::sync::Arc;

use mediasync_model::RawMediaMetadata;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::batch::PhaseBatch;
use super::linker::CanonicalLinker;
use super::state::RunRecorder;
use crate::error::{Result, SyncError};
use crate::infra::RawStoreRegistry;

/// Writes flushed batches for one run, then links them.
///
/// A failed write is retried once; if the retry fails too the batch is
/// dropped and counted as lost. Nothing here fails the run.
pub(crate) struct BatchPersister {
    source: String,
    stores: Arc<RawStoreRegistry>,
    linker: Option<CanonicalLinker>,
    recorder: Arc<RunRecorder>,
}

impl fmt::Debug for BatchPersister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchPersister")
            .field("source", &self.source)
            .field("linking", &self.linker.is_some())
            .finish()
    }
}

impl BatchPersister {
    pub(crate) fn new(
        source: &str,
        stores: Arc<RawStoreRegistry>,
        linker: Option<CanonicalLinker>,
        recorder: Arc<RunRecorder>,
    ) -> Self {
        Self {
            source: source.to_string(),
            stores,
            linker,
            recorder,
        }
    }

    pub(crate) async fn persist(&self, batch: PhaseBatch<RawMediaMetadata>) {
        if batch.is_empty() {
            return;
        }

        let count = batch.len() as u64;
        let started = Instant::now();
        let written = self.write_with_retry(&batch).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if let Err(err) = written {
            warn!(
                target: "sync::persist",
                source = %self.source,
                phase = %batch.phase,
                items = count,
                error = %err,
                "dropping batch after failed retry"
            );
            self.recorder
                .record_batch(batch.phase, batch.trigger, 0, count, elapsed_ms);
            return;
        }

        self.recorder
            .record_batch(batch.phase, batch.trigger, count, 0, elapsed_ms);
        debug!(
            target: "sync::persist",
            source = %self.source,
            phase = %batch.phase,
            trigger = ?batch.trigger,
            items = count,
            elapsed_ms,
            "batch persisted"
        );

        if let Some(linker) = &self.linker {
            self.link(linker, &batch).await;
        }
    }

    async fn write_with_retry(
        &self,
        batch: &PhaseBatch<RawMediaMetadata>,
    ) -> Result<usize> {
        let store = self.stores.get(&self.source, batch.phase).ok_or_else(|| {
            SyncError::MissingStore {
                source_name: self.source.clone(),
                phase: batch.phase.to_string(),
            }
        })?;

        match store.upsert_all(&batch.items).await {
            Ok(written) => Ok(written),
            Err(err) => {
                warn!(
                    target: "sync::persist",
                    source = %self.source,
                    phase = %batch.phase,
                    error = %err,
                    "batch write failed; retrying once"
                );
                store.upsert_all(&batch.items).await
            }
        }
    }

    async fn link(&self, linker: &CanonicalLinker, batch: &PhaseBatch<RawMediaMetadata>) {
        let report = linker.link_batch(&batch.items).await;

        if !report.hints.is_clean() {
            warn!(
                target: "sync::hints",
                source = %self.source,
                phase = %batch.phase,
                invalid = report.hints.invalid,
                checked = report.hints.checked,
                issues = ?report.hints.issues,
                samples = ?report.hints.samples,
                "items with incomplete playback hints"
            );
        }
        if report.failed > 0 {
            warn!(
                target: "sync::link",
                source = %self.source,
                phase = %batch.phase,
                failed = report.failed,
                linked = report.linked,
                "canonical linking failed for part of a batch"
            );
        }

        self.recorder.record_link(&report);
    }
}
