//! Shared fakes for mediasync-core integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{StreamExt, future, stream};
use mediasync_core::infra::{
    InMemoryCanonicalRepository, InMemoryRawRepository, RawStoreRegistry,
};
use mediasync_core::model::hints::{telegram, xtream};
use mediasync_core::model::{
    MediaType, RawMediaMetadata, SourceType, SyncPhase, SyncStatus,
};
use mediasync_core::sync::{
    MemoryPressureMonitor, MemorySample, MemorySampler, MemoryThresholds,
};
use mediasync_core::{
    CatalogEvent, CatalogEventStream, CatalogPipeline, CatalogSyncOrchestrator,
    ScanRequest,
};

/// One step of a scripted scan.
#[derive(Debug, Clone)]
pub enum Step {
    Event(CatalogEvent),
    Sleep(Duration),
    /// Never completes; the scan hangs here until cancelled.
    Hang,
    /// The pipeline panics mid-scan.
    Panic(&'static str),
}

/// Pipeline that replays a fixed script and records every request.
pub struct ScriptedPipeline {
    source: String,
    steps: Vec<Step>,
    split: bool,
    requests: Mutex<Vec<ScanRequest>>,
}

impl fmt::Debug for ScriptedPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedPipeline")
            .field("source", &self.source)
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl ScriptedPipeline {
    pub fn new(source: &str, steps: Vec<Step>) -> Self {
        Self {
            source: source.to_string(),
            steps,
            split: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Started, every item, Completed.
    pub fn completing(source: &str, items: Vec<RawMediaMetadata>) -> Self {
        let mut steps = vec![Step::Event(CatalogEvent::ScanStarted)];
        steps.extend(items.into_iter().map(|item| Step::Event(CatalogEvent::ItemDiscovered(item))));
        steps.push(Step::Event(CatalogEvent::ScanCompleted));
        Self::new(source, steps)
    }

    pub fn with_phase_split(mut self) -> Self {
        self.split = true;
        self
    }

    pub fn requests(&self) -> Vec<ScanRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl CatalogPipeline for ScriptedPipeline {
    fn source(&self) -> &str {
        &self.source
    }

    fn supports_phase_split(&self) -> bool {
        self.split
    }

    fn scan_catalog(&self, request: ScanRequest) -> CatalogEventStream {
        self.requests.lock().unwrap().push(request.clone());
        let steps = self.steps.clone();
        let events = stream::iter(steps)
            .then(move |step| {
                let request = request.clone();
                async move {
                    match step {
                        Step::Event(CatalogEvent::ItemDiscovered(item))
                            if !request.includes_media_type(item.media_type) =>
                        {
                            None
                        }
                        Step::Event(event) => Some(event),
                        Step::Sleep(duration) => {
                            tokio::time::sleep(duration).await;
                            None
                        }
                        Step::Hang => {
                            future::pending::<()>().await;
                            None
                        }
                        Step::Panic(message) => panic!("{message}"),
                    }
                }
            })
            .filter_map(future::ready);
        Box::pin(events)
    }
}

/// Memory sampler pinned to a usage fraction.
#[derive(Debug)]
pub struct FixedMemory(pub f64);

impl MemorySampler for FixedMemory {
    fn sample(&self) -> Option<MemorySample> {
        Some(MemorySample {
            used_bytes: (self.0 * 1_000_000.0) as u64,
            budget_bytes: 1_000_000,
        })
    }
}

pub fn calm_memory() -> Arc<MemoryPressureMonitor> {
    memory_at(0.1)
}

pub fn memory_at(fraction: f64) -> Arc<MemoryPressureMonitor> {
    Arc::new(MemoryPressureMonitor::new(
        MemoryThresholds::default(),
        Arc::new(FixedMemory(fraction)),
    ))
}

/// Per-phase raw stores for one source.
#[derive(Debug, Clone)]
pub struct SourceStores {
    pub phases: BTreeMap<SyncPhase, Arc<InMemoryRawRepository>>,
}

impl SourceStores {
    pub fn new() -> Self {
        let phases = SyncPhase::ALL
            .iter()
            .map(|phase| (*phase, Arc::new(InMemoryRawRepository::new())))
            .collect();
        Self { phases }
    }

    pub fn phase(&self, phase: SyncPhase) -> &Arc<InMemoryRawRepository> {
        &self.phases[&phase]
    }

    pub fn register(&self, source: &str, registry: &mut RawStoreRegistry) {
        for (phase, repo) in &self.phases {
            registry.register(source, *phase, repo.clone());
        }
    }

    pub async fn total(&self) -> u64 {
        use mediasync_core::RawCatalogRepository;
        let mut total = 0;
        for repo in self.phases.values() {
            total += repo.count().await.unwrap();
        }
        total
    }
}

/// Orchestrator wired to in-memory stores for a set of pipelines.
pub struct Harness {
    pub orchestrator: CatalogSyncOrchestrator,
    pub stores: BTreeMap<String, SourceStores>,
    pub canonical: Arc<InMemoryCanonicalRepository>,
}

impl Harness {
    pub fn new(pipelines: Vec<Arc<dyn CatalogPipeline>>) -> Self {
        Self::with_memory(pipelines, calm_memory())
    }

    pub fn with_memory(
        pipelines: Vec<Arc<dyn CatalogPipeline>>,
        memory: Arc<MemoryPressureMonitor>,
    ) -> Self {
        let canonical = Arc::new(InMemoryCanonicalRepository::new());
        let mut registry = RawStoreRegistry::new();
        let mut stores = BTreeMap::new();
        let mut builder = CatalogSyncOrchestrator::builder();

        for pipeline in pipelines {
            let source = pipeline.source().to_string();
            let source_stores = SourceStores::new();
            source_stores.register(&source, &mut registry);
            stores.insert(source, source_stores);
            builder = builder.pipeline(pipeline);
        }

        let orchestrator = builder
            .raw_stores(registry)
            .canonical_repository(canonical.clone())
            .memory_monitor(memory)
            .build()
            .expect("orchestrator wiring");

        Self {
            orchestrator,
            stores,
            canonical,
        }
    }

    pub fn stores(&self, source: &str) -> &SourceStores {
        &self.stores[source]
    }
}

pub fn movie(source_type: SourceType, id: &str, title: &str, year: u16) -> RawMediaMetadata {
    RawMediaMetadata::new(source_type, id, MediaType::Movie, title).with_year(year)
}

/// Xtream VOD item with complete playback hints.
pub fn xtream_vod(id: &str, title: &str, year: u16) -> RawMediaMetadata {
    movie(SourceType::Xtream, id, title, year)
        .with_hint(xtream::CONTENT_TYPE, xtream::CONTENT_VOD)
        .with_hint(xtream::VOD_ID, id)
        .with_hint(xtream::CONTAINER_EXTENSION, "mkv")
}

/// Telegram movie with complete playback hints.
pub fn telegram_movie(id: &str, title: &str, year: u16) -> RawMediaMetadata {
    movie(SourceType::Telegram, id, title, year)
        .with_hint(telegram::CHAT_ID, "-1001")
        .with_hint(telegram::MESSAGE_ID, id)
        .with_hint(telegram::FILE_ID, format!("file-{id}"))
}

pub fn numbered_movies(count: usize) -> Vec<RawMediaMetadata> {
    (0..count)
        .map(|i| xtream_vod(&format!("vod-{i}"), &format!("Movie {i}"), 2000))
        .collect()
}

pub fn items(events: Vec<RawMediaMetadata>) -> Vec<Step> {
    events
        .into_iter()
        .map(|item| Step::Event(CatalogEvent::ItemDiscovered(item)))
        .collect()
}

pub fn terminal(statuses: &[SyncStatus]) -> Option<&SyncStatus> {
    statuses.iter().rev().find(|status| status.is_terminal())
}

/// Clone a concrete pipeline as a trait object for [`Harness`].
pub fn shared(pipeline: &Arc<ScriptedPipeline>) -> Arc<dyn CatalogPipeline> {
    pipeline.clone()
}
