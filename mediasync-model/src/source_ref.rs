use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::raw::RawMediaMetadata;
use crate::source_type::SourceType;

/// Uniqueness key of a source reference under one canonical identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceRefKey {
    pub source_type: SourceType,
    pub source_id: String,
}

/// Link between a canonical identity and one place the work can be played
/// from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaSourceRef {
    pub source_type: SourceType,
    pub source_id: String,
    pub source_label: String,
    pub priority: u8,
    /// Copied verbatim from the raw item; needed to build playback URLs.
    pub playback_hints: BTreeMap<String, String>,
    pub duration_ms: Option<u64>,
    pub linked_at: DateTime<Utc>,
}

impl MediaSourceRef {
    pub fn from_raw(raw: &RawMediaMetadata, linked_at: DateTime<Utc>) -> Self {
        Self {
            source_type: raw.source_type,
            source_id: raw.source_id.clone(),
            source_label: raw.source_label.clone(),
            priority: raw.source_type.priority(),
            playback_hints: raw.playback_hints.clone(),
            duration_ms: raw.duration_ms,
            linked_at,
        }
    }

    pub fn key(&self) -> SourceRefKey {
        SourceRefKey {
            source_type: self.source_type,
            source_id: self.source_id.clone(),
        }
    }

    /// Ordering used for default-source selection: higher priority first,
    /// then the most recently linked ref, then the source id so the result
    /// never depends on storage order.
    pub fn preference(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.linked_at.cmp(&other.linked_at))
            .then_with(|| other.source_id.cmp(&self.source_id))
    }
}
