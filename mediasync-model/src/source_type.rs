use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::ModelError;

/// Content provider family an item was discovered from.
///
/// Parsing is case-insensitive and strict: `"xtream"`, `"XTREAM"` and
/// `"Xtream"` all resolve to [`SourceType::Xtream`], while anything that is
/// not a known name is rejected with [`ModelError::UnknownSourceType`].
/// `"unknown"` itself is accepted so persisted sentinel rows still round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceType {
    Xtream,
    Telegram,
    Io,
    Audiobook,
    Unknown,
}

impl SourceType {
    pub const ALL: [SourceType; 5] = [
        SourceType::Xtream,
        SourceType::Telegram,
        SourceType::Io,
        SourceType::Audiobook,
        SourceType::Unknown,
    ];

    /// Lowercase identifier used at every serialization boundary.
    pub const fn as_str(self) -> &'static str {
        match self {
            SourceType::Xtream => "xtream",
            SourceType::Telegram => "telegram",
            SourceType::Io => "io",
            SourceType::Audiobook => "audiobook",
            SourceType::Unknown => "unknown",
        }
    }

    /// Ranking used when picking a default playback source. Higher wins.
    ///
    /// This is a preference signal only; it says nothing about whether a
    /// source's metadata is more correct than another's.
    pub const fn priority(self) -> u8 {
        match self {
            SourceType::Xtream => 100,
            SourceType::Io => 75,
            SourceType::Telegram => 50,
            SourceType::Audiobook => 25,
            SourceType::Unknown => 0,
        }
    }

    /// Namespace prefix for playback hint keys (`xtream.vodId`).
    pub const fn hint_namespace(self) -> &'static str {
        self.as_str()
    }
}

impl Display for SourceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        SourceType::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownSourceType(raw.to_string()))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SourceType {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SourceType {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
