//! Data model shared by the MediaSync crates: provider items, canonical
//! identities, source references, and the status/metrics values a sync run
//! publishes.
#![allow(missing_docs)]

pub mod canonical;
pub mod error;
pub mod hints;
pub mod media_type;
pub mod metrics;
pub mod normalized;
pub mod phase;
pub mod prelude;
pub mod raw;
pub mod source_ref;
pub mod source_type;
pub mod status;

pub use canonical::{CanonicalKind, CanonicalMediaId, slugify};
pub use error::{ModelError, Result as ModelResult};
pub use media_type::MediaType;
pub use metrics::{
    ChannelSyncMetrics, FlushTrigger, PhaseRunMetrics, SyncRunMetrics,
};
pub use normalized::NormalizedMediaMetadata;
pub use phase::SyncPhase;
pub use raw::RawMediaMetadata;
pub use source_ref::{MediaSourceRef, SourceRefKey};
pub use source_type::SourceType;
pub use status::{SyncActiveState, SyncErrorReason, SyncStatus};
