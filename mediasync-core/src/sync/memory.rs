//! Memory pressure monitoring for sync producers.
//!
//! Producers call [`MemoryPressureMonitor::check_and_throttle`] every few
//! items. The monitor samples process memory against a budget and sleeps
//! for a delay that grows with the usage fraction. It never drops items.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::{debug, warn};

/// Usage-fraction tiers and the delay applied in each.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryThresholds {
    /// Below this fraction producers run unthrottled.
    pub normal: f64,
    pub warning: f64,
    pub critical: f64,
    pub elevated_delay_ms: u64,
    pub warning_delay_ms: u64,
    pub critical_delay_ms: u64,
    /// Memory the process may use before counting as fully loaded.
    /// Defaults to total system memory.
    pub budget_bytes: Option<u64>,
}

impl Default for MemoryThresholds {
    fn default() -> Self {
        Self {
            normal: 0.60,
            warning: 0.75,
            critical: 0.85,
            elevated_delay_ms: 10,
            warning_delay_ms: 50,
            critical_delay_ms: 300,
            budget_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PressureLevel {
    Normal,
    Elevated,
    Warning,
    Critical,
}

impl MemoryThresholds {
    pub fn level_for(&self, fraction: f64) -> PressureLevel {
        match fraction {
            f if f >= self.critical => PressureLevel::Critical,
            f if f >= self.warning => PressureLevel::Warning,
            f if f >= self.normal => PressureLevel::Elevated,
            _ => PressureLevel::Normal,
        }
    }

    pub fn delay_for(&self, fraction: f64) -> Duration {
        let ms = match self.level_for(fraction) {
            PressureLevel::Normal => 0,
            PressureLevel::Elevated => self.elevated_delay_ms,
            PressureLevel::Warning => self.warning_delay_ms,
            PressureLevel::Critical => self.critical_delay_ms,
        };
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySample {
    pub used_bytes: u64,
    pub budget_bytes: u64,
}

impl MemorySample {
    pub fn fraction(&self) -> f64 {
        if self.budget_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.budget_bytes as f64
    }
}

/// Read-only source of memory samples.
pub trait MemorySampler: Send + Sync {
    /// `None` when the platform cannot report usage; treated as no pressure.
    fn sample(&self) -> Option<MemorySample>;
}

/// Resident memory of this process against a fixed budget.
#[derive(Debug, Clone, Copy)]
pub struct ProcessMemorySampler {
    budget_bytes: u64,
}

impl ProcessMemorySampler {
    pub fn new(budget_bytes: Option<u64>) -> Self {
        let budget_bytes = budget_bytes.unwrap_or_else(|| {
            let mut system = System::new();
            system.refresh_memory();
            system.total_memory()
        });
        Self { budget_bytes }
    }

    pub fn budget_bytes(&self) -> u64 {
        self.budget_bytes
    }
}

impl MemorySampler for ProcessMemorySampler {
    fn sample(&self) -> Option<MemorySample> {
        let stats = memory_stats::memory_stats()?;
        Some(MemorySample {
            used_bytes: stats.physical_mem as u64,
            budget_bytes: self.budget_bytes,
        })
    }
}

/// Called on critical pressure so the host can drop caches.
pub trait ReclaimHook: Send + Sync {
    fn reclaim(&self, sample: &MemorySample);
}

#[derive(Default)]
pub struct NoopReclaimHook;

impl ReclaimHook for NoopReclaimHook {
    fn reclaim(&self, _sample: &MemorySample) {}
}

impl fmt::Debug for NoopReclaimHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NoopReclaimHook")
    }
}

/// Result of one throttle check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleOutcome {
    pub level: PressureLevel,
    pub fraction: f64,
    pub delay: Duration,
}

impl ThrottleOutcome {
    pub fn throttled(&self) -> bool {
        !self.delay.is_zero()
    }
}

pub struct MemoryPressureMonitor {
    thresholds: MemoryThresholds,
    sampler: Arc<dyn MemorySampler>,
    reclaim: Arc<dyn ReclaimHook>,
    throttle_events: AtomicU64,
    critical_events: AtomicU64,
}

impl fmt::Debug for MemoryPressureMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPressureMonitor")
            .field("thresholds", &self.thresholds)
            .field("throttle_events", &self.throttle_events())
            .field("critical_events", &self.critical_events())
            .finish()
    }
}

impl MemoryPressureMonitor {
    pub fn new(
        thresholds: MemoryThresholds,
        sampler: Arc<dyn MemorySampler>,
    ) -> Self {
        Self {
            thresholds,
            sampler,
            reclaim: Arc::new(NoopReclaimHook),
            throttle_events: AtomicU64::new(0),
            critical_events: AtomicU64::new(0),
        }
    }

    /// Monitor backed by [`ProcessMemorySampler`].
    pub fn for_process(thresholds: MemoryThresholds) -> Self {
        let sampler = ProcessMemorySampler::new(thresholds.budget_bytes);
        Self::new(thresholds, Arc::new(sampler))
    }

    pub fn with_reclaim_hook(mut self, hook: Arc<dyn ReclaimHook>) -> Self {
        self.reclaim = hook;
        self
    }

    pub fn thresholds(&self) -> &MemoryThresholds {
        &self.thresholds
    }

    pub fn delay_for(&self, fraction: f64) -> Duration {
        self.thresholds.delay_for(fraction)
    }

    pub fn current_fraction(&self) -> f64 {
        self.sampler
            .sample()
            .map_or(0.0, |sample| sample.fraction())
    }

    pub fn current_level(&self) -> PressureLevel {
        self.thresholds.level_for(self.current_fraction())
    }

    pub fn throttle_events(&self) -> u64 {
        self.throttle_events.load(Ordering::Relaxed)
    }

    pub fn critical_events(&self) -> u64 {
        self.critical_events.load(Ordering::Relaxed)
    }

    /// Sample memory and sleep for the tier's delay.
    pub async fn check_and_throttle(&self) -> ThrottleOutcome {
        let Some(sample) = self.sampler.sample() else {
            return ThrottleOutcome {
                level: PressureLevel::Normal,
                fraction: 0.0,
                delay: Duration::ZERO,
            };
        };

        let fraction = sample.fraction();
        let level = self.thresholds.level_for(fraction);
        let delay = self.thresholds.delay_for(fraction);

        match level {
            PressureLevel::Normal => {}
            PressureLevel::Elevated | PressureLevel::Warning => {
                self.throttle_events.fetch_add(1, Ordering::Relaxed);
                debug!(
                    target: "sync::memory",
                    fraction,
                    delay_ms = delay.as_millis() as u64,
                    "memory pressure; throttling producer"
                );
            }
            PressureLevel::Critical => {
                self.throttle_events.fetch_add(1, Ordering::Relaxed);
                self.critical_events.fetch_add(1, Ordering::Relaxed);
                warn!(
                    target: "sync::memory",
                    fraction,
                    used_bytes = sample.used_bytes,
                    budget_bytes = sample.budget_bytes,
                    "critical memory pressure; requesting reclaim"
                );
                self.reclaim.reclaim(&sample);
            }
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        ThrottleOutcome {
            level,
            fraction,
            delay,
        }
    }
}
