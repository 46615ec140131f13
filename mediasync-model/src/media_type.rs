use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::ModelError;
use crate::phase::SyncPhase;

/// Content kind tag carried by every discovered item.
///
/// The orchestrator routes on this tag alone; it never inspects which
/// provider produced the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Movie,
    Series,
    Episode,
    Live,
    Audiobook,
    Unknown,
}

impl MediaType {
    pub const ALL: [MediaType; 6] = [
        MediaType::Movie,
        MediaType::Series,
        MediaType::Episode,
        MediaType::Live,
        MediaType::Audiobook,
        MediaType::Unknown,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
            MediaType::Episode => "episode",
            MediaType::Live => "live",
            MediaType::Audiobook => "audiobook",
            MediaType::Unknown => "unknown",
        }
    }

    /// Live channels are ephemeral streams, not addressable works.
    pub const fn is_linkable(self) -> bool {
        !matches!(self, MediaType::Live)
    }

    /// Batch phase an item of this kind lands in.
    ///
    /// Episodes share the series phase unless the caller opted into a
    /// dedicated episode phase.
    pub const fn sync_phase(self, separate_episode_phase: bool) -> SyncPhase {
        match self {
            MediaType::Live => SyncPhase::Live,
            MediaType::Series => SyncPhase::Series,
            MediaType::Episode if separate_episode_phase => SyncPhase::Episodes,
            MediaType::Episode => SyncPhase::Series,
            MediaType::Movie | MediaType::Audiobook | MediaType::Unknown => {
                SyncPhase::Movies
            }
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        // Provider catalogs say "vod" for movies.
        if normalized == "vod" {
            return Ok(MediaType::Movie);
        }
        MediaType::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownMediaType(raw.to_string()))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for MediaType {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for MediaType {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_content_kinds_to_phases() {
        assert_eq!(MediaType::Movie.sync_phase(false), SyncPhase::Movies);
        assert_eq!(MediaType::Live.sync_phase(false), SyncPhase::Live);
        assert_eq!(MediaType::Series.sync_phase(false), SyncPhase::Series);
        assert_eq!(MediaType::Episode.sync_phase(false), SyncPhase::Series);
        assert_eq!(MediaType::Episode.sync_phase(true), SyncPhase::Episodes);
    }

    #[test]
    fn vod_alias_and_case() {
        assert_eq!("VOD".parse::<MediaType>(), Ok(MediaType::Movie));
        assert_eq!("Episode".parse::<MediaType>(), Ok(MediaType::Episode));
        assert!("radio".parse::<MediaType>().is_err());
    }
}
