//! Entry point for catalog syncs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use mediasync_model::{SyncActiveState, SyncErrorReason, SyncPhase, SyncRunMetrics, SyncStatus};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::config::SyncConfig;
use super::handle::SyncRunHandle;
use super::linker::CanonicalLinker;
use super::memory::{MemoryPressureMonitor, MemoryThresholds};
use super::persist::BatchPersister;
use super::run::{self, RunContext, StatusEmitter};
use super::state::{RunRecorder, SyncStateHub};
use crate::error::{Result, SyncError};
use crate::infra::{BasicMetadataNormalizer, RawStoreRegistry};
use crate::ports::{
    BatchSizePolicy, CanonicalMediaRepository, CatalogPipeline, MediaMetadataNormalizer,
    ScanRequest, StandardBatchPolicy,
};

/// Source name the Telegram pipeline registers under.
pub const TELEGRAM_SOURCE: &str = "telegram";
/// Source name the Xtream pipeline registers under.
pub const XTREAM_SOURCE: &str = "xtream";

struct OrchestratorInner {
    pipelines: HashMap<String, Arc<dyn CatalogPipeline>>,
    stores: Arc<RawStoreRegistry>,
    linker: Option<CanonicalLinker>,
    policy: Arc<dyn BatchSizePolicy>,
    memory: Arc<MemoryPressureMonitor>,
    hub: Arc<SyncStateHub>,
}

/// Drives sync runs for the registered pipelines.
///
/// Cheap to clone; clones share pipelines, stores and observables. Every
/// run gets its own batch manager, buffer and counters, so a failing
/// source cannot disturb another source's run.
#[derive(Clone)]
pub struct CatalogSyncOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl fmt::Debug for CatalogSyncOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sources: Vec<_> = self.inner.pipelines.keys().collect();
        sources.sort();
        f.debug_struct("CatalogSyncOrchestrator")
            .field("sources", &sources)
            .field("linking", &self.inner.linker.is_some())
            .field("policy", &self.inner.policy)
            .field("active", &*self.inner.hub.subscribe_active().borrow())
            .finish()
    }
}

impl CatalogSyncOrchestrator {
    pub fn builder() -> CatalogSyncOrchestratorBuilder {
        CatalogSyncOrchestratorBuilder::default()
    }

    pub fn sources(&self) -> Vec<String> {
        let mut sources: Vec<_> = self.inner.pipelines.keys().cloned().collect();
        sources.sort();
        sources
    }

    pub fn canonical_repository(&self) -> Option<&Arc<dyn CanonicalMediaRepository>> {
        self.inner.linker.as_ref().map(CanonicalLinker::repository)
    }

    /// Start a sync of `source`. Must be called within a Tokio runtime.
    pub fn sync(&self, source: &str, request: ScanRequest, config: SyncConfig) -> SyncRunHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let status = StatusEmitter::new(tx);
        let cancel = CancellationToken::new();
        let run_id = Uuid::now_v7();

        status.emit(SyncStatus::Started {
            source: source.to_string(),
        });

        let Some(pipeline) = self.inner.pipelines.get(source).cloned() else {
            warn!(target: "sync::run", source, "no pipeline registered for source");
            status.emit(SyncStatus::error(
                SyncErrorReason::UnknownSource,
                format!("no pipeline registered for source '{source}'"),
            ));
            return SyncRunHandle::new(run_id, source, rx, cancel, None);
        };

        let linker = if config.enable_canonical_linking {
            if self.inner.linker.is_none() {
                warn!(
                    target: "sync::run",
                    source,
                    "canonical linking requested but no canonical repository is configured"
                );
            }
            self.inner.linker.clone()
        } else {
            None
        };

        for phase in request.effective_phases() {
            if self.inner.stores.get(source, phase).is_none() {
                warn!(
                    target: "sync::run",
                    source,
                    phase = %phase,
                    "no raw store registered; items for this phase will be counted as lost"
                );
            }
        }

        let recorder = Arc::new(RunRecorder::new(source));
        let ctx = Arc::new(RunContext {
            run_id,
            source: source.to_string(),
            request,
            persister: BatchPersister::new(
                source,
                Arc::clone(&self.inner.stores),
                linker,
                Arc::clone(&recorder),
            ),
            config,
            pipeline,
            recorder,
            memory: Arc::clone(&self.inner.memory),
            policy: Arc::clone(&self.inner.policy),
            hub: Arc::clone(&self.inner.hub),
            status,
            cancel: cancel.clone(),
            started: Instant::now(),
        });

        self.inner.hub.begin(run_id, source);
        let task = tokio::spawn(run::execute(ctx));
        SyncRunHandle::new(run_id, source, rx, cancel, Some(task))
    }

    /// Sync Telegram chats; `None` scans every chat the pipeline knows.
    pub fn sync_telegram(&self, chat_ids: Option<Vec<i64>>, config: SyncConfig) -> SyncRunHandle {
        let mut request = ScanRequest::all();
        request.chat_ids = chat_ids;
        self.sync(TELEGRAM_SOURCE, request, config)
    }

    /// Sync an Xtream catalog. Requesting episodes also routes them to
    /// their own phase.
    pub fn sync_xtream(
        &self,
        include_vod: bool,
        include_series: bool,
        include_episodes: bool,
        include_live: bool,
        mut config: SyncConfig,
    ) -> SyncRunHandle {
        let phases = [
            (include_live, SyncPhase::Live),
            (include_vod, SyncPhase::Movies),
            (include_series, SyncPhase::Series),
            (include_episodes, SyncPhase::Episodes),
        ];
        let selected: Vec<_> = phases
            .into_iter()
            .filter_map(|(include, phase)| include.then_some(phase))
            .collect();

        if selected.is_empty() {
            let (tx, rx) = mpsc::unbounded_channel();
            let status = StatusEmitter::new(tx);
            status.emit(SyncStatus::Started {
                source: XTREAM_SOURCE.to_string(),
            });
            status.emit(SyncStatus::Completed {
                total: 0,
                duration_ms: 0,
            });
            return SyncRunHandle::new(
                Uuid::now_v7(),
                XTREAM_SOURCE,
                rx,
                CancellationToken::new(),
                None,
            );
        }

        config.separate_episode_phase |= include_episodes;
        self.sync(XTREAM_SOURCE, ScanRequest::for_phases(selected), config)
    }

    /// Delete every raw item stored for `source`. Canonical records and
    /// their refs are kept.
    pub async fn clear_source(&self, source: &str) -> Result<u64> {
        let stores = self.inner.stores.for_source(source);
        if stores.is_empty() && !self.inner.pipelines.contains_key(source) {
            return Err(SyncError::UnknownSource(source.to_string()));
        }
        if self.inner.hub.is_running(source) {
            warn!(target: "sync::run", source, "clearing a source while it is syncing");
        }

        let mut deleted = 0;
        for store in stores {
            deleted += store.delete_all().await?;
        }
        info!(target: "sync::summary", source, deleted, "source cleared");
        Ok(deleted)
    }

    pub fn active_state(&self) -> watch::Receiver<SyncActiveState> {
        self.inner.hub.subscribe_active()
    }

    pub fn last_run_metrics(&self) -> watch::Receiver<Option<SyncRunMetrics>> {
        self.inner.hub.subscribe_last_run()
    }
}

/// Wiring for [`CatalogSyncOrchestrator`].
#[derive(Default)]
pub struct CatalogSyncOrchestratorBuilder {
    pipelines: Vec<Arc<dyn CatalogPipeline>>,
    stores: Option<RawStoreRegistry>,
    normalizer: Option<Arc<dyn MediaMetadataNormalizer>>,
    canonical: Option<Arc<dyn CanonicalMediaRepository>>,
    policy: Option<Arc<dyn BatchSizePolicy>>,
    memory: Option<Arc<MemoryPressureMonitor>>,
}

impl fmt::Debug for CatalogSyncOrchestratorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogSyncOrchestratorBuilder")
            .field("pipelines", &self.pipelines)
            .field("stores", &self.stores)
            .field("canonical", &self.canonical.is_some())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl CatalogSyncOrchestratorBuilder {
    pub fn pipeline(mut self, pipeline: Arc<dyn CatalogPipeline>) -> Self {
        self.pipelines.push(pipeline);
        self
    }

    pub fn raw_stores(mut self, stores: RawStoreRegistry) -> Self {
        self.stores = Some(stores);
        self
    }

    pub fn normalizer(mut self, normalizer: Arc<dyn MediaMetadataNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn canonical_repository(mut self, repository: Arc<dyn CanonicalMediaRepository>) -> Self {
        self.canonical = Some(repository);
        self
    }

    pub fn batch_policy(mut self, policy: Arc<dyn BatchSizePolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn memory_monitor(mut self, monitor: Arc<MemoryPressureMonitor>) -> Self {
        self.memory = Some(monitor);
        self
    }

    pub fn build(self) -> Result<CatalogSyncOrchestrator> {
        let mut pipelines = HashMap::new();
        for pipeline in self.pipelines {
            let source = pipeline.source().to_string();
            if pipelines.insert(source.clone(), pipeline).is_some() {
                return Err(SyncError::InvalidConfig(format!(
                    "pipeline '{source}' registered twice"
                )));
            }
        }

        let linker = self.canonical.map(|repository| {
            let normalizer = self
                .normalizer
                .unwrap_or_else(|| Arc::new(BasicMetadataNormalizer::new()));
            CanonicalLinker::new(normalizer, repository)
        });

        let memory = self.memory.unwrap_or_else(|| {
            Arc::new(MemoryPressureMonitor::for_process(MemoryThresholds::default()))
        });

        Ok(CatalogSyncOrchestrator {
            inner: Arc::new(OrchestratorInner {
                pipelines,
                stores: Arc::new(self.stores.unwrap_or_default()),
                linker,
                policy: self.policy.unwrap_or_else(|| Arc::new(StandardBatchPolicy)),
                memory,
                hub: Arc::new(SyncStateHub::default()),
            }),
        })
    }
}
