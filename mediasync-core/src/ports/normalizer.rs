use mediasync_model::{NormalizedMediaMetadata, RawMediaMetadata};

/// Turns provider metadata into the cleaned form canonical identities are
/// derived from. Implementations must be deterministic and must not touch
/// the network.
pub trait MediaMetadataNormalizer: Send + Sync {
    fn normalize(&self, raw: &RawMediaMetadata) -> NormalizedMediaMetadata;
}
