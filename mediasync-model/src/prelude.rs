pub use crate::{
    CanonicalKind, CanonicalMediaId, ChannelSyncMetrics, FlushTrigger,
    MediaSourceRef, MediaType, ModelError, NormalizedMediaMetadata,
    RawMediaMetadata, SourceType, SyncActiveState, SyncErrorReason,
    SyncPhase, SyncRunMetrics, SyncStatus, hints,
};
