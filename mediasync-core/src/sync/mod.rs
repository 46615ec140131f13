//! Catalog sync engine: batching, buffering, memory throttling, hint
//! validation, canonical linking, and the orchestrator that drives them.

pub mod batch;
pub mod buffer;
mod channel;
pub mod config;
pub mod handle;
pub mod hints;
pub mod linker;
pub mod memory;
pub mod orchestrator;
mod persist;
mod run;
mod state;

pub use batch::{PhaseBatch, PhaseBatchManager};
pub use buffer::{BufferClosed, BufferConfig, ChannelSyncBuffer, TrySendError};
pub use config::{BatchSettings, ChannelModeSettings, SyncConfig, SyncMode};
pub use handle::SyncRunHandle;
pub use hints::{HintIssue, HintReport, validate_playback_hints};
pub use linker::{CanonicalLinker, LinkReport};
pub use memory::{
    MemoryPressureMonitor, MemorySample, MemorySampler, MemoryThresholds,
    NoopReclaimHook, PressureLevel, ProcessMemorySampler, ReclaimHook,
    ThrottleOutcome,
};
pub use orchestrator::{
    CatalogSyncOrchestrator, CatalogSyncOrchestratorBuilder, TELEGRAM_SOURCE,
    XTREAM_SOURCE,
};
