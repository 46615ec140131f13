//! Guard rails for [`SyncSettings`].
//!
//! Values that would stall or break a run are errors. Values that only look
//! suspicious become [`ConfigWarning`]s the caller logs.

use std::fmt;

use mediasync_core::model::SyncPhase;
use mediasync_core::sync::ChannelModeSettings;
use mediasync_core::{DeviceClass, SyncMode};
use thiserror::Error;
use tracing::warn;

use crate::settings::SyncSettings;

const LARGE_BATCH: usize = 5_000;
const LARGE_BUFFER: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigGuardRailError {
    #[error("batch size for the {phase} phase must be at least 1")]
    ZeroBatchSize { phase: SyncPhase },

    #[error("sync.batch_size override must be at least 1")]
    ZeroBatchOverride,

    #[error("sync.batches.time_flush_interval_ms must be greater than zero")]
    ZeroFlushInterval,

    #[error("sync.batches.time_flush_check_ms must be greater than zero")]
    ZeroFlushCheck,

    #[error("sync.channel.buffer.capacity must be at least 1")]
    ZeroBufferCapacity,

    #[error("sync.channel.{field} must be at least 1")]
    ZeroWorkers { field: &'static str },

    #[error("memory.{field} must be within 0.0..=1.0 (got {value})")]
    ThresholdOutOfRange { field: &'static str, value: f64 },

    #[error(
        "memory thresholds must be ordered normal < warning < critical (got {normal}, {warning}, {critical})"
    )]
    UnorderedThresholds {
        normal: f64,
        warning: f64,
        critical: f64,
    },

    #[error("memory.budget_bytes must be greater than zero when set")]
    ZeroMemoryBudget,
}

/// A setting that is accepted but probably not intended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigWarnings(Vec<ConfigWarning>);

impl ConfigWarnings {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.0.iter()
    }

    pub fn touches(&self, field: &str) -> bool {
        self.0.iter().any(|warning| warning.field == field)
    }

    pub fn log(&self) {
        for warning in &self.0 {
            warn!(target: "config", field = warning.field, "{}", warning.message);
        }
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(ConfigWarning {
            field,
            message: message.into(),
        });
    }
}

impl SyncSettings {
    /// Reject settings that cannot drive a run and collect warnings for the
    /// merely odd ones.
    pub fn validate(&self) -> Result<ConfigWarnings, ConfigGuardRailError> {
        let mut warnings = ConfigWarnings::default();
        self.check_batches(&mut warnings)?;
        self.check_channel(&mut warnings)?;
        self.check_memory(&mut warnings)?;

        if self.sync.progress_every == 0 {
            warnings.push(
                "sync.progress_every",
                "0 disables periodic InProgress statuses",
            );
        }
        if self.sync.throttle_every == 0 {
            warnings.push(
                "sync.throttle_every",
                "0 disables memory pressure throttling",
            );
        }

        Ok(warnings)
    }

    fn check_batches(
        &self,
        warnings: &mut ConfigWarnings,
    ) -> Result<(), ConfigGuardRailError> {
        let batches = &self.sync.batches;
        for phase in SyncPhase::ALL {
            let size = batches.size_for(phase);
            if size == 0 {
                return Err(ConfigGuardRailError::ZeroBatchSize { phase });
            }
            if size > LARGE_BATCH {
                warnings.push(
                    "sync.batches",
                    format!(
                        "{phase} batches of {size} items keep a lot of metadata in memory"
                    ),
                );
            }
        }

        match self.sync.batch_size {
            Some(0) => return Err(ConfigGuardRailError::ZeroBatchOverride),
            Some(size) if self.device_class == DeviceClass::Constrained => {
                let effective = self
                    .batch_policy()
                    .effective_batch_size(SyncPhase::Movies, size);
                if effective < size {
                    warnings.push(
                        "sync.batch_size",
                        format!(
                            "constrained devices cap batches at {effective}; {size} is ignored"
                        ),
                    );
                }
            }
            _ => {}
        }

        if batches.time_flush_interval_ms == 0 {
            return Err(ConfigGuardRailError::ZeroFlushInterval);
        }
        if batches.time_flush_check_ms == 0 {
            return Err(ConfigGuardRailError::ZeroFlushCheck);
        }
        if batches.time_flush_check_ms > batches.time_flush_interval_ms {
            warnings.push(
                "sync.batches.time_flush_check_ms",
                format!(
                    "checking every {}ms delays time flushes past the {}ms interval",
                    batches.time_flush_check_ms, batches.time_flush_interval_ms
                ),
            );
        }
        Ok(())
    }

    fn check_channel(
        &self,
        warnings: &mut ConfigWarnings,
    ) -> Result<(), ConfigGuardRailError> {
        let channel = &self.sync.channel;
        if channel.buffer.capacity == 0 {
            return Err(ConfigGuardRailError::ZeroBufferCapacity);
        }
        if channel.consumers == 0 {
            return Err(ConfigGuardRailError::ZeroWorkers { field: "consumers" });
        }
        if channel.max_concurrent_producers == 0 {
            return Err(ConfigGuardRailError::ZeroWorkers {
                field: "max_concurrent_producers",
            });
        }

        if channel.buffer.capacity > LARGE_BUFFER {
            warnings.push(
                "sync.channel.buffer.capacity",
                format!(
                    "a buffer of {} items weakens backpressure",
                    channel.buffer.capacity
                ),
            );
        }
        if self.sync.mode == SyncMode::Batched
            && self.sync.channel != ChannelModeSettings::default()
        {
            warnings.push(
                "sync.channel",
                "channel settings only apply when sync.mode = \"channel\"",
            );
        }
        Ok(())
    }

    fn check_memory(
        &self,
        warnings: &mut ConfigWarnings,
    ) -> Result<(), ConfigGuardRailError> {
        let memory = &self.memory;
        for (field, value) in [
            ("normal", memory.normal),
            ("warning", memory.warning),
            ("critical", memory.critical),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigGuardRailError::ThresholdOutOfRange {
                    field,
                    value,
                });
            }
        }
        if !(memory.normal < memory.warning && memory.warning < memory.critical) {
            return Err(ConfigGuardRailError::UnorderedThresholds {
                normal: memory.normal,
                warning: memory.warning,
                critical: memory.critical,
            });
        }
        if memory.budget_bytes == Some(0) {
            return Err(ConfigGuardRailError::ZeroMemoryBudget);
        }

        if memory.elevated_delay_ms > memory.warning_delay_ms
            || memory.warning_delay_ms > memory.critical_delay_ms
        {
            warnings.push(
                "memory",
                "throttle delays shrink as pressure rises",
            );
        }
        Ok(())
    }
}
