use mediasync_model::{MediaType, NormalizedMediaMetadata, RawMediaMetadata};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ports::MediaMetadataNormalizer;

static YEAR_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\(\[]((?:19|20)\d{2})[\)\]]").expect("valid year regex")
});

static BARE_TRAILING_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s((?:19|20)\d{2})$").expect("valid year regex")
});

static BRACKET_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]|\{[^}]*\}").expect("valid tag regex"));

static EPISODE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bS(\d{1,2})\s*E(\d{1,3})\b").expect("valid episode regex")
});

static QUALITY_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:2160p|1080p|720p|480p|4k|uhd|hdr|x264|x265|h264|h265|hevc|web-?dl|webrip|bluray|brrip)\b",
    )
    .expect("valid quality regex")
});

static COUNTRY_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,3}\s*\|\s*").expect("valid prefix regex"));

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Lightweight title cleanup for provider catalogs.
///
/// Handles the common provider decorations: `EN| ` prefixes, bracketed
/// release tags, quality tokens, dotted scene names, and a trailing
/// `(YYYY)`. Raw fields always win over values parsed from the title.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicMetadataNormalizer;

impl BasicMetadataNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Cleaned title plus any year / episode coordinates found in it.
    pub fn clean_title(&self, title: &str) -> CleanedTitle {
        let mut text = COUNTRY_PREFIX.replace(title.trim(), "").into_owned();

        let scene_style = !text.contains(' ') && text.matches('.').count() >= 2;
        if scene_style {
            text = text.replace(['.', '_'], " ");
        }

        let mut year = capture_year(&YEAR_TAG, &text);
        if year.is_some() {
            text = YEAR_TAG.replace(&text, " ").into_owned();
        }

        let episode = EPISODE_MARKER.captures(&text).and_then(|caps| {
            let season = caps.get(1)?.as_str().parse().ok()?;
            let episode = caps.get(2)?.as_str().parse().ok()?;
            Some((season, episode))
        });
        if episode.is_some() {
            text = EPISODE_MARKER.replace(&text, " ").into_owned();
        }

        text = BRACKET_TAG.replace_all(&text, " ").into_owned();
        text = QUALITY_TOKEN.replace_all(&text, " ").into_owned();
        text = WHITESPACE.replace_all(text.trim(), " ").into_owned();

        // Scene names carry the release year as a bare trailing token.
        if year.is_none() && scene_style && text.contains(' ') {
            year = capture_year(&BARE_TRAILING_YEAR, &text);
            if year.is_some() {
                text = BARE_TRAILING_YEAR.replace(&text, "").into_owned();
            }
        }

        let title = text
            .trim_matches(|c: char| {
                c.is_whitespace() || matches!(c, '-' | ':' | '|' | '.')
            })
            .to_string();

        CleanedTitle {
            title,
            year,
            episode,
        }
    }
}

fn capture_year(pattern: &Regex, text: &str) -> Option<u16> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedTitle {
    pub title: String,
    pub year: Option<u16>,
    pub episode: Option<(u32, u32)>,
}

impl MediaMetadataNormalizer for BasicMetadataNormalizer {
    fn normalize(&self, raw: &RawMediaMetadata) -> NormalizedMediaMetadata {
        let cleaned = self.clean_title(&raw.title);
        let canonical_title = if cleaned.title.is_empty() {
            raw.title.trim().to_string()
        } else {
            cleaned.title
        };

        let (season, episode) = match (raw.season, raw.episode) {
            (Some(season), Some(episode)) => (Some(season), Some(episode)),
            _ if raw.media_type == MediaType::Episode => match cleaned.episode {
                Some((season, episode)) => (Some(season), Some(episode)),
                None => (raw.season, raw.episode),
            },
            _ => (raw.season, raw.episode),
        };

        NormalizedMediaMetadata {
            canonical_title,
            media_type: raw.media_type,
            year: raw.year.or(cleaned.year),
            season,
            episode,
            tmdb_id: raw.tmdb_id,
            duration_ms: raw.duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use mediasync_model::{CanonicalMediaId, SourceType};

    use super::*;

    fn raw(title: &str, media_type: MediaType) -> RawMediaMetadata {
        RawMediaMetadata::new(SourceType::Xtream, "1", media_type, title)
    }

    #[test]
    fn strips_tags_and_extracts_year() {
        let normalized = BasicMetadataNormalizer
            .normalize(&raw("EN| The Matrix [1080p] [MULTI] (1999)", MediaType::Movie));
        assert_eq!(normalized.canonical_title, "The Matrix");
        assert_eq!(normalized.year, Some(1999));
    }

    #[test]
    fn raw_year_wins_over_title_year() {
        let item = raw("Dune (1984)", MediaType::Movie).with_year(2021);
        assert_eq!(BasicMetadataNormalizer.normalize(&item).year, Some(2021));
    }

    #[test]
    fn scene_names_become_words() {
        let cleaned = BasicMetadataNormalizer.clean_title("Blade.Runner.2049.2017.2160p.x265");
        assert_eq!(cleaned.title, "Blade Runner 2049");
        assert_eq!(cleaned.year, Some(2017));
    }

    #[test]
    fn episode_coordinates_come_from_title_when_missing() {
        let normalized = BasicMetadataNormalizer
            .normalize(&raw("Breaking Bad S01E02", MediaType::Episode));
        assert_eq!(normalized.canonical_title, "Breaking Bad");
        assert_eq!((normalized.season, normalized.episode), (Some(1), Some(2)));
    }

    #[test]
    fn same_work_from_two_providers_shares_an_id() {
        let telegram = RawMediaMetadata::new(
            SourceType::Telegram,
            "tg",
            MediaType::Movie,
            "Heat.1995.1080p.BluRay",
        )
        .with_year(1995);
        let xtream = raw("EN| Heat (1995)", MediaType::Movie);

        let a = CanonicalMediaId::derive(&BasicMetadataNormalizer.normalize(&telegram));
        let b = CanonicalMediaId::derive(&BasicMetadataNormalizer.normalize(&xtream));
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[test]
    fn collapses_whitespace() {
        let cleaned = BasicMetadataNormalizer.clean_title("  Alien   {Director's Cut}  ");
        assert_eq!(cleaned.title, "Alien");
    }
}
