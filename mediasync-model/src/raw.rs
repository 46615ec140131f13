use std::collections::BTreeMap;

use crate::media_type::MediaType;
use crate::source_type::SourceType;

/// Provider-native item exactly as a pipeline discovered it.
///
/// Owned by the pipeline until it is handed to the orchestrator inside an
/// `ItemDiscovered` event; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawMediaMetadata {
    pub source_type: SourceType,
    /// Opaque identity of the item inside its source.
    pub source_id: String,
    /// Human label for the source instance ("My IPTV", "Movies chat").
    #[cfg_attr(feature = "serde", serde(default))]
    pub source_label: String,
    pub media_type: MediaType,
    pub title: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub year: Option<u16>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub season: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub episode: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub duration_ms: Option<u64>,
    /// TMDB id when the provider exposes one. For episodes this is the
    /// series id.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tmdb_id: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub playback_hints: BTreeMap<String, String>,
}

impl RawMediaMetadata {
    pub fn new(
        source_type: SourceType,
        source_id: impl Into<String>,
        media_type: MediaType,
        title: impl Into<String>,
    ) -> Self {
        Self {
            source_type,
            source_id: source_id.into(),
            source_label: String::new(),
            media_type,
            title: title.into(),
            year: None,
            season: None,
            episode: None,
            duration_ms: None,
            tmdb_id: None,
            playback_hints: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = label.into();
        self
    }

    pub fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_episode(mut self, season: u32, episode: u32) -> Self {
        self.season = Some(season);
        self.episode = Some(episode);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_tmdb_id(mut self, tmdb_id: u64) -> Self {
        self.tmdb_id = Some(tmdb_id);
        self
    }

    pub fn with_hint(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.playback_hints.insert(key.into(), value.into());
        self
    }

    pub fn hint(&self, key: &str) -> Option<&str> {
        self.playback_hints
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn has_hint(&self, key: &str) -> bool {
        self.hint(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hints::telegram;

    #[test]
    fn blank_hints_count_as_missing() {
        let item = RawMediaMetadata::new(
            SourceType::Telegram,
            "42:7",
            MediaType::Movie,
            "Heat",
        )
        .with_hint(telegram::CHAT_ID, "42")
        .with_hint(telegram::MESSAGE_ID, "  ");

        assert!(item.has_hint(telegram::CHAT_ID));
        assert!(!item.has_hint(telegram::MESSAGE_ID));
        assert!(!item.has_hint(telegram::FILE_ID));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_minimal_catalog_row() {
        let json = r#"{
            "source_type": "XTREAM",
            "source_id": "vod:603",
            "media_type": "vod",
            "title": "The Matrix",
            "year": 1999
        }"#;
        let item: RawMediaMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(item.source_type, SourceType::Xtream);
        assert_eq!(item.media_type, MediaType::Movie);
        assert_eq!(item.year, Some(1999));
        assert!(item.playback_hints.is_empty());
    }
}
