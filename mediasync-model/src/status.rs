use std::fmt;

use crate::phase::SyncPhase;

/// Outward-facing progress of one sync run.
///
/// A run emits `Started`, any number of `InProgress`, then exactly one of
/// the terminal variants.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum SyncStatus {
    Started {
        source: String,
    },
    InProgress {
        /// Items the run has seen so far.
        discovered: u64,
        persisted: u64,
        phase: Option<String>,
        /// Pipeline-reported progress units (chats, categories) scanned so
        /// far. Set only on statuses forwarded from the pipeline.
        #[cfg_attr(
            feature = "serde",
            serde(default, skip_serializing_if = "Option::is_none")
        )]
        scan_discovered: Option<u64>,
        /// Pipeline-reported total, when it knows one.
        #[cfg_attr(
            feature = "serde",
            serde(default, skip_serializing_if = "Option::is_none")
        )]
        scan_total: Option<u64>,
    },
    Completed {
        total: u64,
        duration_ms: u64,
    },
    Cancelled {
        persisted: u64,
    },
    Error {
        /// Stable machine-readable code.
        reason: String,
        /// Human-readable description; never a backtrace.
        message: String,
    },
}

impl SyncStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncStatus::Completed { .. }
                | SyncStatus::Cancelled { .. }
                | SyncStatus::Error { .. }
        )
    }

    pub fn error(reason: SyncErrorReason, message: impl Into<String>) -> Self {
        SyncStatus::Error {
            reason: reason.as_code().to_string(),
            message: message.into(),
        }
    }
}

/// Reason codes for failures raised by the engine itself. Pipeline errors
/// carry the pipeline's own code instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncErrorReason {
    PipelineError,
    UnknownSource,
    PersistenceFailed,
    Internal,
}

impl SyncErrorReason {
    pub const fn as_code(self) -> &'static str {
        match self {
            SyncErrorReason::PipelineError => "pipeline_error",
            SyncErrorReason::UnknownSource => "unknown_source",
            SyncErrorReason::PersistenceFailed => "persistence_failed",
            SyncErrorReason::Internal => "internal",
        }
    }
}

impl fmt::Display for SyncErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Whether a sync is running, for UI-side throttling of unrelated work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncActiveState {
    pub is_active: bool,
    pub source: Option<String>,
    pub current_phase: Option<SyncPhase>,
}

impl SyncActiveState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn active(source: impl Into<String>, phase: Option<SyncPhase>) -> Self {
        Self {
            is_active: true,
            source: Some(source.into()),
            current_phase: phase,
        }
    }
}
