//! Channel mode: producer tasks feed a bounded buffer drained by N
//! persistence consumers.

use std::sync::Arc;

use futures::StreamExt;
use mediasync_model::{RawMediaMetadata, SyncPhase};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::buffer::{BufferClosed, ChannelSyncBuffer};
use super::run::{RunContext, RunEnd};
use crate::ports::{CatalogEvent, ScanRequest};

type Routed = (SyncPhase, RawMediaMetadata);

pub(crate) async fn run_channel(ctx: Arc<RunContext>) -> RunEnd {
    let settings = &ctx.config.channel;
    let buffer: Arc<ChannelSyncBuffer<Routed>> =
        Arc::new(ChannelSyncBuffer::new(&settings.buffer));

    let mut consumers = JoinSet::new();
    for worker in 0..settings.consumers.max(1) {
        consumers.spawn(consume(Arc::clone(&ctx), Arc::clone(&buffer), worker));
    }

    let scans = split_scans(&ctx);
    debug!(
        target: "sync::channel",
        source = %ctx.source,
        producers = scans.len(),
        consumers = settings.consumers.max(1),
        capacity = buffer.capacity(),
        "channel sync starting"
    );

    let permits = Arc::new(Semaphore::new(settings.max_concurrent_producers.max(1)));
    let producer_cancel = ctx.cancel.child_token();
    let mut producers = JoinSet::new();
    for request in scans {
        producers.spawn(produce(
            Arc::clone(&ctx),
            Arc::clone(&buffer),
            Arc::clone(&permits),
            request,
            producer_cancel.clone(),
        ));
    }

    let mut ends = Vec::new();
    while let Some(joined) = producers.join_next().await {
        let end = joined.unwrap_or_else(|err| {
            error!(target: "sync::channel", source = %ctx.source, error = %err, "producer task failed");
            RunEnd::internal(format!("producer task failed: {err}"))
        });
        if matches!(end, RunEnd::Failed { .. }) {
            producer_cancel.cancel();
        }
        ends.push(end);
    }

    buffer.close();
    while let Some(joined) = consumers.join_next().await {
        if let Err(err) = joined {
            error!(target: "sync::channel", source = %ctx.source, error = %err, "consumer task failed");
        }
    }

    let metrics = buffer.metrics();
    debug!(
        target: "sync::channel",
        source = %ctx.source,
        sent = metrics.items_sent,
        received = metrics.items_received,
        backpressure = metrics.backpressure_events,
        throughput = metrics.throughput_per_sec,
        "channel sync drained"
    );
    ctx.recorder.record_channel(metrics);

    combine(ends, ctx.cancel.is_cancelled())
}

/// One scan per requested phase when the pipeline can split, else one
/// scan for the whole request.
fn split_scans(ctx: &RunContext) -> Vec<ScanRequest> {
    let phases = ctx.request.effective_phases();
    if ctx.pipeline.supports_phase_split() && phases.len() > 1 {
        phases
            .into_iter()
            .map(|phase| ctx.request.restricted_to(phase))
            .collect()
    } else {
        vec![ctx.request.clone()]
    }
}

fn combine(ends: Vec<RunEnd>, cancelled: bool) -> RunEnd {
    if let Some(failed) = ends
        .iter()
        .find(|end| matches!(end, RunEnd::Failed { .. }))
    {
        return failed.clone();
    }
    if cancelled || ends.contains(&RunEnd::Cancelled) {
        return RunEnd::Cancelled;
    }
    RunEnd::Completed
}

async fn produce(
    ctx: Arc<RunContext>,
    buffer: Arc<ChannelSyncBuffer<Routed>>,
    permits: Arc<Semaphore>,
    request: ScanRequest,
    cancel: CancellationToken,
) -> RunEnd {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return RunEnd::Cancelled,
        permit = permits.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return RunEnd::internal("producer semaphore closed"),
        },
    };

    let mut events = ctx.pipeline.scan_catalog(request);
    let mut current_phase = None;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return RunEnd::Cancelled,
            event = events.next() => {
                let Some(event) = event else {
                    return RunEnd::Completed;
                };
                match event {
                    CatalogEvent::ItemDiscovered(item) => {
                        let phase = ctx.route(&item);
                        ctx.enter_phase(&mut current_phase, phase);
                        let discovered = ctx.recorder.record_discovered();
                        // Not raced against cancellation: the item is
                        // already counted and must reach a consumer.
                        if let Err(BufferClosed((phase, item))) =
                            buffer.send((phase, item)).await
                        {
                            warn!(
                                target: "sync::channel",
                                source = %ctx.source,
                                source_id = %item.source_id,
                                "buffer closed before item was queued"
                            );
                            ctx.recorder.record_lost(phase, 1);
                        }
                        ctx.after_discovery(discovered, phase).await;
                    }
                    other => {
                        if let Some(end) = ctx.on_control_event(other) {
                            return end;
                        }
                    }
                }
            }
        }
    }
}

/// Drain the buffer into a private batch manager until the buffer closes,
/// then flush whatever is left.
async fn consume(
    ctx: Arc<RunContext>,
    buffer: Arc<ChannelSyncBuffer<Routed>>,
    worker: usize,
) {
    let mut batches = ctx.new_batch_manager();
    let mut ticker = interval(ctx.config.effective_batches().time_flush_check());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for batch in batches.check_all_time_based() {
                    ctx.persister.persist(batch).await;
                }
            }
            received = buffer.receive() => {
                let Some((phase, item)) = received else {
                    break;
                };
                if let Some(batch) = batches.add(phase, item) {
                    ctx.persister.persist(batch).await;
                }
            }
        }
    }

    let pending = batches.total_pending();
    for batch in batches.drain_final() {
        ctx.persister.persist(batch).await;
    }
    debug!(
        target: "sync::channel",
        source = %ctx.source,
        worker,
        flushed = pending,
        "consumer drained"
    );
}
