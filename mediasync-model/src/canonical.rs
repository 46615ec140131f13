use std::fmt::{self, Display, Formatter};

use crate::error::{ModelError, Result};
use crate::media_type::MediaType;
use crate::normalized::NormalizedMediaMetadata;

/// What kind of work a canonical identity names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CanonicalKind {
    Movie,
    Series,
    Episode,
}

impl CanonicalKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            CanonicalKind::Movie => "movie",
            CanonicalKind::Series => "series",
            CanonicalKind::Episode => "episode",
        }
    }

    /// Live channels have no canonical kind.
    pub const fn for_media_type(media_type: MediaType) -> Option<Self> {
        match media_type {
            MediaType::Live => None,
            MediaType::Series => Some(CanonicalKind::Series),
            MediaType::Episode => Some(CanonicalKind::Episode),
            MediaType::Movie | MediaType::Audiobook | MediaType::Unknown => {
                Some(CanonicalKind::Movie)
            }
        }
    }
}

/// Source-independent identity of a single work.
///
/// Keys are TMDB based when an id is known (`tmdb:603`), otherwise a slug of
/// the cleaned title plus the year (`the-matrix:1999`, `heat:unknown`).
/// Episode keys append their coordinates (`tmdb:1396:s01e02`). The kind is
/// part of the identity, so a movie and a series with the same title never
/// share an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanonicalMediaId {
    pub kind: CanonicalKind,
    pub key: String,
}

impl CanonicalMediaId {
    pub fn new(kind: CanonicalKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }

    /// Resolve the identity for normalized metadata.
    ///
    /// Fails instead of guessing when the metadata cannot identify a work:
    /// live channels, titles with no letters or digits, and episodes without
    /// season/episode numbers.
    pub fn derive(meta: &NormalizedMediaMetadata) -> Result<Self> {
        Self::build(meta, meta.tmdb_id)
    }

    /// The slug-and-year identity, even when a TMDB id is known.
    ///
    /// Providers disagree on whether they resolve TMDB ids, so repositories
    /// keep this key as an alias of the record it first resolved to.
    pub fn derive_from_title(meta: &NormalizedMediaMetadata) -> Result<Self> {
        Self::build(meta, None)
    }

    fn build(meta: &NormalizedMediaMetadata, tmdb_id: Option<u64>) -> Result<Self> {
        let kind = CanonicalKind::for_media_type(meta.media_type)
            .ok_or_else(|| {
                ModelError::InvalidMedia(format!(
                    "{} items have no canonical identity",
                    meta.media_type
                ))
            })?;

        let base = match tmdb_id {
            Some(tmdb_id) => format!("tmdb:{tmdb_id}"),
            None => {
                let slug = slugify(&meta.canonical_title);
                if slug.is_empty() {
                    return Err(ModelError::InvalidMedia(format!(
                        "title '{}' has no identifying characters",
                        meta.canonical_title
                    )));
                }
                match meta.year {
                    Some(year) => format!("{slug}:{year}"),
                    None => format!("{slug}:unknown"),
                }
            }
        };

        let key = match kind {
            CanonicalKind::Episode => {
                let (Some(season), Some(episode)) = (meta.season, meta.episode)
                else {
                    return Err(ModelError::InvalidMedia(format!(
                        "episode '{}' is missing season/episode numbers",
                        meta.canonical_title
                    )));
                };
                format!("{base}:s{season:02}e{episode:02}")
            }
            CanonicalKind::Movie | CanonicalKind::Series => base,
        };

        Ok(Self { kind, key })
    }
}

impl Display for CanonicalMediaId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.key)
    }
}

/// Lowercase ASCII-ish slug: alphanumeric runs joined by single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
