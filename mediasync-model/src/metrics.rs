use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::phase::SyncPhase;

/// Snapshot of a channel sync buffer. Recomputed on every read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelSyncMetrics {
    pub items_sent: u64,
    pub items_received: u64,
    pub items_in_buffer: u64,
    pub backpressure_events: u64,
    pub throughput_per_sec: f64,
}

/// Why a batch left the batch manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FlushTrigger {
    /// The phase reached its batch size.
    Size,
    /// The flush interval elapsed with a partial batch pending.
    Time,
    /// End-of-run drain.
    Final,
}

/// Per-phase counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseRunMetrics {
    pub items_persisted: u64,
    pub items_lost: u64,
    pub batches: u64,
    pub size_flushes: u64,
    pub time_flushes: u64,
    pub final_flushes: u64,
    pub persist_time_ms: u64,
    pub max_persist_ms: u64,
}

impl PhaseRunMetrics {
    pub fn record_flush(&mut self, trigger: FlushTrigger) {
        self.batches += 1;
        match trigger {
            FlushTrigger::Size => self.size_flushes += 1,
            FlushTrigger::Time => self.time_flushes += 1,
            FlushTrigger::Final => self.final_flushes += 1,
        }
    }

    pub fn record_persist(&mut self, persisted: u64, lost: u64, elapsed_ms: u64) {
        self.items_persisted += persisted;
        self.items_lost += lost;
        self.persist_time_ms += elapsed_ms;
        self.max_persist_ms = self.max_persist_ms.max(elapsed_ms);
    }
}

/// Diagnostics for the most recent run of a source.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncRunMetrics {
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub items_discovered: u64,
    pub items_persisted: u64,
    pub items_lost: u64,
    pub items_linked: u64,
    pub link_failures: u64,
    pub hint_warnings: u64,
    pub throttle_events: u64,
    pub phases: BTreeMap<SyncPhase, PhaseRunMetrics>,
    pub channel: Option<ChannelSyncMetrics>,
}

impl SyncRunMetrics {
    pub fn new(source: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            source: source.into(),
            started_at,
            finished_at: None,
            items_discovered: 0,
            items_persisted: 0,
            items_lost: 0,
            items_linked: 0,
            link_failures: 0,
            hint_warnings: 0,
            throttle_events: 0,
            phases: BTreeMap::new(),
            channel: None,
        }
    }

    pub fn phase_mut(&mut self, phase: SyncPhase) -> &mut PhaseRunMetrics {
        self.phases.entry(phase).or_default()
    }

    pub fn size_flushes(&self) -> u64 {
        self.phases.values().map(|p| p.size_flushes).sum()
    }

    pub fn time_flushes(&self) -> u64 {
        self.phases.values().map(|p| p.time_flushes).sum()
    }

    pub fn final_flushes(&self) -> u64 {
        self.phases.values().map(|p| p.final_flushes).sum()
    }
}
