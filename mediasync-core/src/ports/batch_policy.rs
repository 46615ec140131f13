use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use mediasync_model::SyncPhase;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Maps a configured per-phase batch size to the size actually used on the
/// running device.
pub trait BatchSizePolicy: Send + Sync + fmt::Debug {
    fn effective_batch_size(&self, phase: SyncPhase, configured: usize) -> usize;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardBatchPolicy;

impl BatchSizePolicy for StandardBatchPolicy {
    fn effective_batch_size(&self, _phase: SyncPhase, configured: usize) -> usize {
        configured.max(1)
    }
}

/// Caps every phase on low-memory hardware.
#[derive(Debug, Clone, Copy)]
pub struct ConstrainedDeviceBatchPolicy {
    pub cap: usize,
}

impl ConstrainedDeviceBatchPolicy {
    pub const DEFAULT_CAP: usize = 35;
}

impl Default for ConstrainedDeviceBatchPolicy {
    fn default() -> Self {
        Self {
            cap: Self::DEFAULT_CAP,
        }
    }
}

impl BatchSizePolicy for ConstrainedDeviceBatchPolicy {
    fn effective_batch_size(&self, _phase: SyncPhase, configured: usize) -> usize {
        configured.min(self.cap).max(1)
    }
}

/// Hardware class the process runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeviceClass {
    #[default]
    Standard,
    Constrained,
}

impl DeviceClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            DeviceClass::Standard => "standard",
            DeviceClass::Constrained => "constrained",
        }
    }

    pub fn batch_policy(self) -> Arc<dyn BatchSizePolicy> {
        match self {
            DeviceClass::Standard => Arc::new(StandardBatchPolicy),
            DeviceClass::Constrained => {
                Arc::new(ConstrainedDeviceBatchPolicy::default())
            }
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceClass {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(DeviceClass::Standard),
            "constrained" => Ok(DeviceClass::Constrained),
            other => Err(SyncError::InvalidConfig(format!(
                "unknown device class '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for DeviceClass {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceClass> for String {
    fn from(value: DeviceClass) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constrained_policy_caps_every_phase() {
        let policy = ConstrainedDeviceBatchPolicy::default();
        for phase in SyncPhase::ALL {
            assert_eq!(policy.effective_batch_size(phase, 400), 35);
        }
        assert_eq!(policy.effective_batch_size(SyncPhase::Movies, 20), 20);
    }

    #[test]
    fn standard_policy_keeps_configured_size() {
        assert_eq!(
            StandardBatchPolicy.effective_batch_size(SyncPhase::Series, 150),
            150
        );
    }

    #[test]
    fn device_class_parses_case_insensitively() {
        assert_eq!(
            "Constrained".parse::<DeviceClass>().unwrap(),
            DeviceClass::Constrained
        );
        assert!("tablet".parse::<DeviceClass>().is_err());
    }
}
