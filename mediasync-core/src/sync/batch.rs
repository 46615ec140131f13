//! Per-phase accumulation of discovered items.
//!
//! The manager is owned by a single producer loop, so it takes `&mut self`
//! and holds no locks. Flushed batches are handed back to the caller, which
//! decides how to persist them.

use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::time::Duration;

use mediasync_model::{FlushTrigger, SyncPhase};
use tokio::time::Instant;

use super::config::BatchSettings;
use crate::ports::BatchSizePolicy;

/// Items detached from the manager in one flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseBatch<T> {
    pub phase: SyncPhase,
    pub items: Vec<T>,
    pub trigger: FlushTrigger,
}

impl<T> PhaseBatch<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

struct PhaseBuffer<T> {
    items: Vec<T>,
    batch_size: usize,
    last_flush: Instant,
}

impl<T> PhaseBuffer<T> {
    fn take(&mut self, now: Instant) -> Vec<T> {
        self.last_flush = now;
        mem::replace(&mut self.items, Vec::with_capacity(self.batch_size))
    }
}

pub struct PhaseBatchManager<T> {
    phases: BTreeMap<SyncPhase, PhaseBuffer<T>>,
    flush_interval: Duration,
}

impl<T> fmt::Debug for PhaseBatchManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending: BTreeMap<_, _> = self
            .phases
            .iter()
            .map(|(phase, buffer)| (*phase, buffer.items.len()))
            .collect();
        f.debug_struct("PhaseBatchManager")
            .field("flush_interval", &self.flush_interval)
            .field("pending", &pending)
            .finish()
    }
}

impl<T> PhaseBatchManager<T> {
    pub fn new(settings: &BatchSettings, policy: &dyn BatchSizePolicy) -> Self {
        let now = Instant::now();
        let phases = SyncPhase::ALL
            .iter()
            .map(|phase| {
                let batch_size = policy
                    .effective_batch_size(*phase, settings.size_for(*phase))
                    .max(1);
                let buffer = PhaseBuffer {
                    items: Vec::with_capacity(batch_size),
                    batch_size,
                    last_flush: now,
                };
                (*phase, buffer)
            })
            .collect();

        Self {
            phases,
            flush_interval: settings.time_flush_interval(),
        }
    }

    pub fn batch_size(&self, phase: SyncPhase) -> usize {
        self.phases.get(&phase).map_or(0, |buffer| buffer.batch_size)
    }

    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    pub fn pending(&self, phase: SyncPhase) -> usize {
        self.phases.get(&phase).map_or(0, |buffer| buffer.items.len())
    }

    pub fn total_pending(&self) -> usize {
        self.phases.values().map(|buffer| buffer.items.len()).sum()
    }

    /// Append `item`; returns the full batch once the phase reaches its
    /// threshold.
    pub fn add(&mut self, phase: SyncPhase, item: T) -> Option<PhaseBatch<T>> {
        let buffer = self.phases.get_mut(&phase)?;
        buffer.items.push(item);
        if buffer.items.len() < buffer.batch_size {
            return None;
        }

        Some(PhaseBatch {
            phase,
            items: buffer.take(Instant::now()),
            trigger: FlushTrigger::Size,
        })
    }

    /// Flush a partial batch whose phase has not flushed within the
    /// interval.
    pub fn check_time_based_flush(
        &mut self,
        phase: SyncPhase,
    ) -> Option<PhaseBatch<T>> {
        let interval = self.flush_interval;
        let buffer = self.phases.get_mut(&phase)?;
        if buffer.items.is_empty() {
            return None;
        }

        let now = Instant::now();
        if now.duration_since(buffer.last_flush) < interval {
            return None;
        }

        Some(PhaseBatch {
            phase,
            items: buffer.take(now),
            trigger: FlushTrigger::Time,
        })
    }

    /// Time-based check across every phase, in declared phase order.
    pub fn check_all_time_based(&mut self) -> Vec<PhaseBatch<T>> {
        SyncPhase::ALL
            .iter()
            .filter_map(|phase| self.check_time_based_flush(*phase))
            .collect()
    }

    /// Drain every phase. Only non-empty phases appear in the result.
    pub fn flush_all_phases(&mut self) -> BTreeMap<SyncPhase, Vec<T>> {
        let now = Instant::now();
        self.phases
            .iter_mut()
            .filter(|(_, buffer)| !buffer.items.is_empty())
            .map(|(phase, buffer)| (*phase, buffer.take(now)))
            .collect()
    }

    /// [`flush_all_phases`](Self::flush_all_phases) as final batches.
    pub fn drain_final(&mut self) -> Vec<PhaseBatch<T>> {
        self.flush_all_phases()
            .into_iter()
            .map(|(phase, items)| PhaseBatch {
                phase,
                items,
                trigger: FlushTrigger::Final,
            })
            .collect()
    }
}
