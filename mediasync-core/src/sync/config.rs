use std::time::Duration;

use mediasync_model::SyncPhase;
use serde::{Deserialize, Serialize};

use super::buffer::BufferConfig;

/// Per-phase batch thresholds and the shared time-flush cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub live: usize,
    pub movies: usize,
    pub series: usize,
    pub episodes: usize,
    /// A partial batch older than this is flushed on the next check.
    pub time_flush_interval_ms: u64,
    /// How often pending phases are checked for a time-based flush.
    pub time_flush_check_ms: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            live: 400,
            movies: 250,
            series: 150,
            episodes: 200,
            time_flush_interval_ms: 1_200,
            time_flush_check_ms: 200,
        }
    }
}

impl BatchSettings {
    pub fn size_for(&self, phase: SyncPhase) -> usize {
        match phase {
            SyncPhase::Live => self.live,
            SyncPhase::Movies => self.movies,
            SyncPhase::Series => self.series,
            SyncPhase::Episodes => self.episodes,
        }
    }

    /// Same thresholds for every phase.
    pub fn uniform(mut self, size: usize) -> Self {
        self.live = size;
        self.movies = size;
        self.series = size;
        self.episodes = size;
        self
    }

    pub fn time_flush_interval(&self) -> Duration {
        Duration::from_millis(self.time_flush_interval_ms.max(1))
    }

    pub fn time_flush_check(&self) -> Duration {
        Duration::from_millis(self.time_flush_check_ms.max(1))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// One producer loop owns the batch manager and persists inline.
    #[default]
    Batched,
    /// Producers hand items to consumer tasks through a bounded buffer.
    Channel,
}

/// Knobs for [`SyncMode::Channel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelModeSettings {
    pub consumers: usize,
    pub max_concurrent_producers: usize,
    pub buffer: BufferConfig,
}

impl Default for ChannelModeSettings {
    fn default() -> Self {
        Self {
            consumers: 2,
            max_concurrent_producers: 3,
            buffer: BufferConfig::default(),
        }
    }
}

/// Options for a single sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Overrides every phase threshold in `batches` when set.
    pub batch_size: Option<usize>,
    /// Emit `InProgress` every this many discovered items.
    pub progress_every: u64,
    pub enable_canonical_linking: bool,
    /// Consult the memory monitor every this many discovered items.
    pub throttle_every: u64,
    /// Route episodes to their own phase instead of the series phase.
    pub separate_episode_phase: bool,
    pub mode: SyncMode,
    pub batches: BatchSettings,
    pub channel: ChannelModeSettings,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: None,
            progress_every: 250,
            enable_canonical_linking: true,
            throttle_every: 100,
            separate_episode_phase: false,
            mode: SyncMode::Batched,
            batches: BatchSettings::default(),
            channel: ChannelModeSettings::default(),
        }
    }
}

impl SyncConfig {
    pub fn channel_mode() -> Self {
        Self {
            mode: SyncMode::Channel,
            ..Self::default()
        }
    }

    /// Batch thresholds after applying `batch_size`.
    pub fn effective_batches(&self) -> BatchSettings {
        match self.batch_size {
            Some(size) => self.batches.clone().uniform(size),
            None => self.batches.clone(),
        }
    }
}
