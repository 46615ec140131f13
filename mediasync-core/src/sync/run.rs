//! One sync run: shared context, the batched producer loop, and the
//! terminal bookkeeping both modes go through.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use mediasync_model::{RawMediaMetadata, SyncErrorReason, SyncPhase, SyncStatus};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::batch::PhaseBatchManager;
use super::config::{SyncConfig, SyncMode};
use super::memory::MemoryPressureMonitor;
use super::persist::BatchPersister;
use super::channel;
use super::state::{RunRecorder, SyncStateHub};
use crate::ports::{BatchSizePolicy, CatalogEvent, CatalogPipeline, ScanRequest};

/// How a run (or one of its producers) ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RunEnd {
    Completed,
    Cancelled,
    Failed { reason: String, message: String },
}

impl RunEnd {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        RunEnd::Failed {
            reason: SyncErrorReason::Internal.as_code().to_string(),
            message: message.into(),
        }
    }
}

/// Sending half of a run's status stream. Sends after the caller dropped
/// the handle are ignored.
#[derive(Debug, Clone)]
pub(crate) struct StatusEmitter {
    tx: mpsc::UnboundedSender<SyncStatus>,
}

impl StatusEmitter {
    pub(crate) fn new(tx: mpsc::UnboundedSender<SyncStatus>) -> Self {
        Self { tx }
    }

    pub(crate) fn emit(&self, status: SyncStatus) {
        let _ = self.tx.send(status);
    }
}

/// Everything a run needs, built fresh per run.
pub(crate) struct RunContext {
    pub(crate) run_id: Uuid,
    pub(crate) source: String,
    pub(crate) request: ScanRequest,
    pub(crate) config: SyncConfig,
    pub(crate) pipeline: Arc<dyn CatalogPipeline>,
    pub(crate) persister: BatchPersister,
    pub(crate) recorder: Arc<RunRecorder>,
    pub(crate) memory: Arc<MemoryPressureMonitor>,
    pub(crate) policy: Arc<dyn BatchSizePolicy>,
    pub(crate) hub: Arc<SyncStateHub>,
    pub(crate) status: StatusEmitter,
    pub(crate) cancel: CancellationToken,
    pub(crate) started: Instant,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("source", &self.source)
            .field("mode", &self.config.mode)
            .field("discovered", &self.recorder.discovered())
            .field("persisted", &self.recorder.persisted())
            .field("lost", &self.recorder.lost())
            .finish()
    }
}

impl RunContext {
    pub(crate) fn new_batch_manager<T>(&self) -> PhaseBatchManager<T> {
        PhaseBatchManager::new(&self.config.effective_batches(), self.policy.as_ref())
    }

    pub(crate) fn route(&self, item: &RawMediaMetadata) -> SyncPhase {
        item.media_type.sync_phase(self.config.separate_episode_phase)
    }

    /// Publish `phase` as the run's current phase when it changes.
    pub(crate) fn enter_phase(&self, current: &mut Option<SyncPhase>, phase: SyncPhase) {
        if *current != Some(phase) {
            *current = Some(phase);
            self.hub.set_phase(self.run_id, phase);
        }
    }

    pub(crate) fn progress(&self, phase: Option<String>) {
        self.status.emit(SyncStatus::InProgress {
            discovered: self.recorder.discovered(),
            persisted: self.recorder.persisted(),
            phase,
            scan_discovered: None,
            scan_total: None,
        });
    }

    /// Forward the pipeline's own counts (chats scanned, categories walked)
    /// alongside the run's item counters.
    fn scan_progress(&self, phase: String, discovered: u64, total: Option<u64>) {
        self.status.emit(SyncStatus::InProgress {
            discovered: self.recorder.discovered(),
            persisted: self.recorder.persisted(),
            phase: Some(phase),
            scan_discovered: Some(discovered),
            scan_total: total,
        });
    }

    /// Cadence work after each discovered item: progress events and memory
    /// throttling.
    pub(crate) async fn after_discovery(&self, discovered: u64, phase: SyncPhase) {
        let every = self.config.progress_every;
        if every > 0 && discovered % every == 0 {
            self.progress(Some(phase.as_str().to_string()));
        }

        let every = self.config.throttle_every;
        if every > 0 && discovered % every == 0 {
            self.throttle().await;
        }
    }

    async fn throttle(&self) {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            outcome = self.memory.check_and_throttle() => {
                if outcome.throttled() {
                    self.recorder.record_throttle();
                }
            }
        }
    }

    /// Handle a non-item event. Returns the end state for terminal events.
    pub(crate) fn on_control_event(&self, event: CatalogEvent) -> Option<RunEnd> {
        match event {
            CatalogEvent::ScanStarted => {
                debug!(target: "sync::run", source = %self.source, "pipeline scan started");
                None
            }
            CatalogEvent::ScanProgress {
                discovered,
                total,
                phase,
            } => {
                debug!(
                    target: "sync::run",
                    source = %self.source,
                    phase = %phase,
                    discovered,
                    total = ?total,
                    "pipeline progress"
                );
                self.scan_progress(phase, discovered, total);
                None
            }
            CatalogEvent::ScanCompleted => Some(RunEnd::Completed),
            CatalogEvent::ScanCancelled => Some(RunEnd::Cancelled),
            CatalogEvent::ScanError {
                reason,
                message,
                cause,
            } => {
                warn!(
                    target: "sync::run",
                    source = %self.source,
                    reason = %reason,
                    message = %message,
                    cause = cause.as_deref().unwrap_or("-"),
                    "pipeline reported an error"
                );
                Some(RunEnd::Failed { reason, message })
            }
            CatalogEvent::ItemDiscovered(_) => None,
        }
    }
}

/// Drive a run to its terminal status.
pub(crate) async fn execute(ctx: Arc<RunContext>) {
    info!(
        target: "sync::run",
        run_id = %ctx.run_id,
        source = %ctx.source,
        mode = ?ctx.config.mode,
        phases = ?ctx.request.effective_phases(),
        "sync run started"
    );

    let run = async {
        match ctx.config.mode {
            SyncMode::Batched => run_batched(&ctx).await,
            SyncMode::Channel => channel::run_channel(Arc::clone(&ctx)).await,
        }
    };

    // A panicking pipeline must still release the active state and emit a
    // terminal status.
    let end = match AssertUnwindSafe(run).catch_unwind().await {
        Ok(end) => end,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(
                target: "sync::run",
                run_id = %ctx.run_id,
                source = %ctx.source,
                panic = %message,
                "sync run panicked"
            );
            RunEnd::internal(format!("sync run panicked: {message}"))
        }
    };

    finish(&ctx, end);
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic".to_string()
    }
}

/// Batched mode: one loop owns the batch manager and persists inline.
///
/// The final flush runs after the select loop, so cancellation can never
/// interrupt it.
pub(crate) async fn run_batched(ctx: &RunContext) -> RunEnd {
    let mut events = ctx.pipeline.scan_catalog(ctx.request.clone());
    let mut batches = ctx.new_batch_manager();
    let mut ticker = interval(ctx.config.effective_batches().time_flush_check());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut current_phase = None;

    let end = loop {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break RunEnd::Cancelled,
            _ = ticker.tick() => {
                for batch in batches.check_all_time_based() {
                    ctx.persister.persist(batch).await;
                }
            }
            event = events.next() => {
                let Some(event) = event else {
                    debug!(target: "sync::run", source = %ctx.source, "event stream ended without a terminal event");
                    break RunEnd::Completed;
                };
                match event {
                    CatalogEvent::ItemDiscovered(item) => {
                        let phase = ctx.route(&item);
                        ctx.enter_phase(&mut current_phase, phase);
                        let discovered = ctx.recorder.record_discovered();
                        if let Some(batch) = batches.add(phase, item) {
                            ctx.persister.persist(batch).await;
                        }
                        ctx.after_discovery(discovered, phase).await;
                    }
                    other => {
                        if let Some(end) = ctx.on_control_event(other) {
                            break end;
                        }
                    }
                }
            }
        }
    };

    drop(events);
    for batch in batches.drain_final() {
        ctx.persister.persist(batch).await;
    }
    end
}

fn finish(ctx: &RunContext, end: RunEnd) {
    let metrics = ctx.recorder.finish();
    let duration_ms = ctx.started.elapsed().as_millis() as u64;

    let status = match end {
        RunEnd::Completed
            if metrics.items_persisted == 0 && metrics.items_lost > 0 =>
        {
            SyncStatus::error(
                SyncErrorReason::PersistenceFailed,
                format!("all {} discovered items failed to persist", metrics.items_lost),
            )
        }
        RunEnd::Completed => SyncStatus::Completed {
            total: metrics.items_persisted,
            duration_ms,
        },
        RunEnd::Cancelled => SyncStatus::Cancelled {
            persisted: metrics.items_persisted,
        },
        RunEnd::Failed { reason, message } => SyncStatus::Error { reason, message },
    };

    let summary = format!("{status:?}");
    if matches!(status, SyncStatus::Error { .. }) {
        error!(
            target: "sync::summary",
            run_id = %ctx.run_id,
            source = %ctx.source,
            discovered = metrics.items_discovered,
            persisted = metrics.items_persisted,
            lost = metrics.items_lost,
            status = %summary,
            "sync run failed"
        );
    } else {
        info!(
            target: "sync::summary",
            run_id = %ctx.run_id,
            source = %ctx.source,
            discovered = metrics.items_discovered,
            persisted = metrics.items_persisted,
            lost = metrics.items_lost,
            linked = metrics.items_linked,
            hint_warnings = metrics.hint_warnings,
            size_flushes = metrics.size_flushes(),
            time_flushes = metrics.time_flushes(),
            throttle_events = metrics.throttle_events,
            duration_ms,
            status = %summary,
            "sync run finished"
        );
    }

    ctx.hub.end(ctx.run_id, metrics);
    ctx.status.emit(status);
}
