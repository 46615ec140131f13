use crate::canonical::CanonicalMediaId;
use crate::error::Result;
use crate::media_type::MediaType;

/// Deterministic, cleaned view of a [`RawMediaMetadata`](crate::RawMediaMetadata).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalizedMediaMetadata {
    pub canonical_title: String,
    pub media_type: MediaType,
    pub year: Option<u16>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub tmdb_id: Option<u64>,
    pub duration_ms: Option<u64>,
}

impl NormalizedMediaMetadata {
    /// Identity this metadata resolves to. See [`CanonicalMediaId::derive`].
    pub fn canonical_id(&self) -> Result<CanonicalMediaId> {
        CanonicalMediaId::derive(self)
    }
}
