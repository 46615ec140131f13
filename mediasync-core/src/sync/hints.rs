//! Playback hint validation.
//!
//! Missing hints make an item unplayable later, but they never stop a
//! sync: problems are collected into a [`HintReport`] and logged once per
//! batch.

use std::collections::BTreeMap;

use mediasync_model::hints::{telegram, xtream};
use mediasync_model::{RawMediaMetadata, SourceType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintIssue {
    Missing(&'static str),
    /// None of the listed alternatives is present.
    MissingOneOf(&'static [&'static str]),
    UnknownContentType(String),
}

impl HintIssue {
    /// Key used to aggregate issues in reports.
    pub fn label(&self) -> String {
        match self {
            HintIssue::Missing(key) => (*key).to_string(),
            HintIssue::MissingOneOf(keys) => keys.join("|"),
            HintIssue::UnknownContentType(value) => {
                format!("{}={value}", xtream::CONTENT_TYPE)
            }
        }
    }
}

const TELEGRAM_FILE_KEYS: &[&str] = &[telegram::REMOTE_ID, telegram::FILE_ID];

const XTREAM_VOD_KEYS: &[&str] = &[xtream::VOD_ID, xtream::CONTAINER_EXTENSION];

const XTREAM_EPISODE_KEYS: &[&str] = &[
    xtream::SERIES_ID,
    xtream::SEASON,
    xtream::EPISODE,
    xtream::EPISODE_ID,
    xtream::CONTAINER_EXTENSION,
];

const XTREAM_LIVE_KEYS: &[&str] = &[xtream::STREAM_ID];

/// Check the hints `item`'s source needs for playback. Sources without
/// hint requirements always pass.
pub fn validate_playback_hints(item: &RawMediaMetadata) -> Vec<HintIssue> {
    let mut issues = Vec::new();
    match item.source_type {
        SourceType::Telegram => {
            require(item, &[telegram::CHAT_ID, telegram::MESSAGE_ID], &mut issues);
            if !TELEGRAM_FILE_KEYS.iter().any(|key| item.has_hint(key)) {
                issues.push(HintIssue::MissingOneOf(TELEGRAM_FILE_KEYS));
            }
        }
        SourceType::Xtream => match item.hint(xtream::CONTENT_TYPE) {
            None => issues.push(HintIssue::Missing(xtream::CONTENT_TYPE)),
            Some(content) => match content.to_ascii_lowercase().as_str() {
                xtream::CONTENT_VOD => require(item, XTREAM_VOD_KEYS, &mut issues),
                xtream::CONTENT_SERIES | xtream::CONTENT_EPISODE => {
                    require(item, XTREAM_EPISODE_KEYS, &mut issues)
                }
                xtream::CONTENT_LIVE => {
                    require(item, XTREAM_LIVE_KEYS, &mut issues)
                }
                other => {
                    issues.push(HintIssue::UnknownContentType(other.to_string()))
                }
            },
        },
        SourceType::Io | SourceType::Audiobook | SourceType::Unknown => {}
    }
    issues
}

fn require(
    item: &RawMediaMetadata,
    keys: &[&'static str],
    issues: &mut Vec<HintIssue>,
) {
    issues.extend(
        keys.iter()
            .copied()
            .filter(|key| !item.has_hint(key))
            .map(HintIssue::Missing),
    );
}

/// Aggregated validation results for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintReport {
    pub checked: u64,
    pub invalid: u64,
    pub issues: BTreeMap<String, u64>,
    /// A few offending source ids for the log line.
    pub samples: Vec<String>,
}

impl HintReport {
    const MAX_SAMPLES: usize = 5;

    /// Validate `item` and fold the result in. Returns whether it passed.
    pub fn check(&mut self, item: &RawMediaMetadata) -> bool {
        self.checked += 1;
        let issues = validate_playback_hints(item);
        if issues.is_empty() {
            return true;
        }

        self.invalid += 1;
        for issue in &issues {
            *self.issues.entry(issue.label()).or_default() += 1;
        }
        if self.samples.len() < Self::MAX_SAMPLES {
            self.samples.push(item.source_id.clone());
        }
        false
    }

    pub fn is_clean(&self) -> bool {
        self.invalid == 0
    }
}

#[cfg(test)]
mod tests {
    use mediasync_model::MediaType;

    use super::*;

    fn telegram_item() -> RawMediaMetadata {
        RawMediaMetadata::new(SourceType::Telegram, "tg-1", MediaType::Movie, "Heat")
            .with_hint(telegram::CHAT_ID, "-100")
            .with_hint(telegram::MESSAGE_ID, "42")
    }

    fn xtream_vod() -> RawMediaMetadata {
        RawMediaMetadata::new(SourceType::Xtream, "x-1", MediaType::Movie, "Heat")
            .with_hint(xtream::CONTENT_TYPE, "vod")
            .with_hint(xtream::VOD_ID, "991")
    }

    #[test]
    fn telegram_needs_one_file_reference() {
        let missing = validate_playback_hints(&telegram_item());
        assert_eq!(missing, vec![HintIssue::MissingOneOf(TELEGRAM_FILE_KEYS)]);

        let ok = telegram_item().with_hint(telegram::FILE_ID, "AgAD");
        assert!(validate_playback_hints(&ok).is_empty());
    }

    #[test]
    fn xtream_vod_requires_container_extension() {
        assert_eq!(
            validate_playback_hints(&xtream_vod()),
            vec![HintIssue::Missing(xtream::CONTAINER_EXTENSION)]
        );
        let ok = xtream_vod().with_hint(xtream::CONTAINER_EXTENSION, "mkv");
        assert!(validate_playback_hints(&ok).is_empty());
    }

    #[test]
    fn xtream_episode_checks_every_coordinate() {
        let item = RawMediaMetadata::new(
            SourceType::Xtream,
            "x-ep",
            MediaType::Episode,
            "Pilot",
        )
        .with_hint(xtream::CONTENT_TYPE, "episode")
        .with_hint(xtream::SERIES_ID, "7");

        let issues = validate_playback_hints(&item);
        assert_eq!(issues.len(), 4);
        assert!(issues.contains(&HintIssue::Missing(xtream::EPISODE_ID)));
    }

    #[test]
    fn xtream_without_content_type_is_flagged() {
        let item =
            RawMediaMetadata::new(SourceType::Xtream, "x", MediaType::Live, "News");
        assert_eq!(
            validate_playback_hints(&item),
            vec![HintIssue::Missing(xtream::CONTENT_TYPE)]
        );
    }

    #[test]
    fn blank_hint_counts_as_missing() {
        let item = xtream_vod().with_hint(xtream::CONTAINER_EXTENSION, "  ");
        assert!(!validate_playback_hints(&item).is_empty());
    }

    #[test]
    fn io_sources_have_no_requirements() {
        let item = RawMediaMetadata::new(SourceType::Io, "f", MediaType::Movie, "Heat");
        assert!(validate_playback_hints(&item).is_empty());
    }

    #[test]
    fn report_aggregates_by_key() {
        let mut report = HintReport::default();
        assert!(!report.check(&xtream_vod()));
        assert!(!report.check(&xtream_vod()));
        assert!(report.check(&telegram_item().with_hint(telegram::REMOTE_ID, "r")));

        assert_eq!(report.checked, 3);
        assert_eq!(report.invalid, 2);
        assert_eq!(report.issues[xtream::CONTAINER_EXTENSION], 2);
        assert_eq!(report.samples, vec!["x-1", "x-1"]);
    }
}
