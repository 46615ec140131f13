//! Run bookkeeping: per-run metrics and the orchestrator-wide observables.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use mediasync_model::{
    ChannelSyncMetrics, FlushTrigger, SyncActiveState, SyncPhase, SyncRunMetrics,
};
use tokio::sync::watch;
use uuid::Uuid;

use super::linker::LinkReport;

/// Counters for one run. Shared by every task the run spawns.
#[derive(Debug)]
pub(crate) struct RunRecorder {
    discovered: AtomicU64,
    persisted: AtomicU64,
    metrics: Mutex<SyncRunMetrics>,
}

impl RunRecorder {
    pub(crate) fn new(source: &str) -> Self {
        Self {
            discovered: AtomicU64::new(0),
            persisted: AtomicU64::new(0),
            metrics: Mutex::new(SyncRunMetrics::new(source, Utc::now())),
        }
    }

    fn metrics(&self) -> MutexGuard<'_, SyncRunMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one discovered item; returns the new total.
    pub(crate) fn record_discovered(&self) -> u64 {
        self.discovered.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn discovered(&self) -> u64 {
        self.discovered.load(Ordering::Relaxed)
    }

    pub(crate) fn persisted(&self) -> u64 {
        self.persisted.load(Ordering::Relaxed)
    }

    pub(crate) fn lost(&self) -> u64 {
        self.metrics().items_lost
    }

    pub(crate) fn record_batch(
        &self,
        phase: SyncPhase,
        trigger: FlushTrigger,
        persisted: u64,
        lost: u64,
        elapsed_ms: u64,
    ) {
        self.persisted.fetch_add(persisted, Ordering::Relaxed);
        let mut metrics = self.metrics();
        metrics.items_lost += lost;
        let phase = metrics.phase_mut(phase);
        phase.record_flush(trigger);
        phase.record_persist(persisted, lost, elapsed_ms);
    }

    /// Items that never reached a batch.
    pub(crate) fn record_lost(&self, phase: SyncPhase, lost: u64) {
        let mut metrics = self.metrics();
        metrics.items_lost += lost;
        metrics.phase_mut(phase).items_lost += lost;
    }

    pub(crate) fn record_link(&self, report: &LinkReport) {
        let mut metrics = self.metrics();
        metrics.items_linked += report.linked;
        metrics.link_failures += report.failed;
        metrics.hint_warnings += report.hints.invalid;
    }

    pub(crate) fn record_throttle(&self) {
        self.metrics().throttle_events += 1;
    }

    pub(crate) fn record_channel(&self, channel: ChannelSyncMetrics) {
        self.metrics().channel = Some(channel);
    }

    /// Final snapshot with totals filled in.
    pub(crate) fn finish(&self) -> SyncRunMetrics {
        let mut metrics = self.metrics().clone();
        metrics.items_discovered = self.discovered();
        metrics.items_persisted = self.persisted();
        metrics.finished_at = Some(Utc::now());
        metrics
    }
}

#[derive(Debug, Clone)]
struct ActiveRun {
    id: Uuid,
    source: String,
    phase: Option<SyncPhase>,
}

/// Owner of the `watch` channels an orchestrator publishes.
///
/// Several runs may be active at once; the published state follows the
/// most recently started one.
#[derive(Debug)]
pub(crate) struct SyncStateHub {
    active: watch::Sender<SyncActiveState>,
    last_run: watch::Sender<Option<SyncRunMetrics>>,
    runs: Mutex<Vec<ActiveRun>>,
}

impl Default for SyncStateHub {
    fn default() -> Self {
        Self {
            active: watch::Sender::new(SyncActiveState::idle()),
            last_run: watch::Sender::new(None),
            runs: Mutex::new(Vec::new()),
        }
    }
}

impl SyncStateHub {
    pub(crate) fn subscribe_active(&self) -> watch::Receiver<SyncActiveState> {
        self.active.subscribe()
    }

    pub(crate) fn subscribe_last_run(
        &self,
    ) -> watch::Receiver<Option<SyncRunMetrics>> {
        self.last_run.subscribe()
    }

    fn runs(&self) -> MutexGuard<'_, Vec<ActiveRun>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_running(&self, source: &str) -> bool {
        self.runs().iter().any(|run| run.source == source)
    }

    pub(crate) fn begin(&self, id: Uuid, source: &str) {
        let mut runs = self.runs();
        runs.push(ActiveRun {
            id,
            source: source.to_string(),
            phase: None,
        });
        self.publish(&runs);
    }

    pub(crate) fn set_phase(&self, id: Uuid, phase: SyncPhase) {
        let mut runs = self.runs();
        if let Some(run) = runs.iter_mut().find(|run| run.id == id) {
            run.phase = Some(phase);
        }
        self.publish(&runs);
    }

    pub(crate) fn end(&self, id: Uuid, metrics: SyncRunMetrics) {
        let mut runs = self.runs();
        runs.retain(|run| run.id != id);
        self.publish(&runs);
        drop(runs);
        self.last_run.send_replace(Some(metrics));
    }

    fn publish(&self, runs: &[ActiveRun]) {
        let next = runs.last().map_or_else(SyncActiveState::idle, |run| {
            SyncActiveState::active(run.source.clone(), run.phase)
        });
        self.active.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
    }
}
