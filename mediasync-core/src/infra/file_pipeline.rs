use std::fmt;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use futures::stream;
use mediasync_model::hints::telegram;
use mediasync_model::{RawMediaMetadata, SourceType};
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::ports::{CatalogEvent, CatalogEventStream, CatalogPipeline, ScanRequest};

/// Catalog read from a local dump of [`RawMediaMetadata`], either one JSON
/// array or newline-delimited JSON.
///
/// The whole file is read on each scan; items outside the request's
/// phases or chats are skipped.
#[derive(Clone)]
pub struct CatalogFilePipeline {
    source: String,
    path: PathBuf,
    progress_every: u64,
}

impl fmt::Debug for CatalogFilePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogFilePipeline")
            .field("source", &self.source)
            .field("path", &self.path)
            .finish()
    }
}

impl CatalogFilePipeline {
    pub fn new(source: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
            progress_every: 500,
        }
    }

    pub fn with_progress_every(mut self, every: u64) -> Self {
        self.progress_every = every;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogPipeline for CatalogFilePipeline {
    fn source(&self) -> &str {
        &self.source
    }

    fn supports_phase_split(&self) -> bool {
        true
    }

    fn scan_catalog(&self, request: ScanRequest) -> CatalogEventStream {
        let pipeline = self.clone();
        let events = stream::once(async move { pipeline.scan(request).await })
            .flat_map(stream::iter);
        Box::pin(events)
    }
}

impl CatalogFilePipeline {
    async fn scan(self, request: ScanRequest) -> Vec<CatalogEvent> {
        let path = self.path.clone();
        let loaded = tokio::task::spawn_blocking(move || load_catalog(&path))
            .await
            .map_err(|err| SyncError::Internal(format!("catalog reader failed: {err}")))
            .and_then(|result| result);

        let items = match loaded {
            Ok(items) => items,
            Err(err) => {
                warn!(
                    target: "sync::pipeline",
                    source = %self.source,
                    path = %self.path.display(),
                    error = %err,
                    "failed to read catalog file"
                );
                let reason = match err {
                    SyncError::Serialization(_) => "catalog_malformed",
                    _ => "catalog_unreadable",
                };
                return vec![
                    CatalogEvent::ScanStarted,
                    CatalogEvent::ScanError {
                        reason: reason.to_string(),
                        message: format!("cannot load {}", self.path.display()),
                        cause: Some(err.to_string()),
                    },
                ];
            }
        };

        let selected: Vec<_> = items
            .into_iter()
            .filter(|item| in_scope(&request, item))
            .collect();
        let total = selected.len() as u64;
        let phase_label = describe_phases(&request);
        debug!(
            target: "sync::pipeline",
            source = %self.source,
            items = total,
            phases = %phase_label,
            "catalog file loaded"
        );

        let mut events = Vec::with_capacity(selected.len() + 2);
        events.push(CatalogEvent::ScanStarted);
        for (index, item) in selected.into_iter().enumerate() {
            events.push(CatalogEvent::ItemDiscovered(item));
            let discovered = index as u64 + 1;
            if self.progress_every > 0 && discovered % self.progress_every == 0 {
                events.push(CatalogEvent::ScanProgress {
                    discovered,
                    total: Some(total),
                    phase: phase_label.clone(),
                });
            }
        }
        events.push(CatalogEvent::ScanCompleted);
        events
    }
}

fn in_scope(request: &ScanRequest, item: &RawMediaMetadata) -> bool {
    if !request.includes_media_type(item.media_type) {
        return false;
    }
    match (&request.chat_ids, item.source_type) {
        (Some(chats), SourceType::Telegram) => item
            .hint(telegram::CHAT_ID)
            .and_then(|chat| chat.trim().parse::<i64>().ok())
            .is_some_and(|chat| chats.contains(&chat)),
        _ => true,
    }
}

fn describe_phases(request: &ScanRequest) -> String {
    request
        .effective_phases()
        .iter()
        .map(|phase| phase.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a catalog dump. A leading `[` selects JSON-array mode; anything
/// else is read as one item per non-blank line.
pub fn load_catalog(path: &Path) -> Result<Vec<RawMediaMetadata>> {
    let contents = std::fs::read_to_string(path)?;
    parse_catalog(&contents)
}

pub fn parse_catalog(contents: &str) -> Result<Vec<RawMediaMetadata>> {
    if contents.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(contents)?);
    }

    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(SyncError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use mediasync_model::{MediaType, SyncPhase};

    use super::*;

    const NDJSON: &str = r#"
{"source_type":"telegram","source_id":"tg-1","media_type":"movie","title":"Heat","playback_hints":{"telegram.chatId":"7"}}
{"source_type":"telegram","source_id":"tg-2","media_type":"episode","title":"Lost","season":1,"episode":1,"playback_hints":{"telegram.chatId":"8"}}

{"source_type":"TELEGRAM","source_id":"tg-3","media_type":"live","title":"News"}
"#;

    fn write_catalog(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    async fn discovered(pipeline: &CatalogFilePipeline, request: ScanRequest) -> Vec<String> {
        pipeline
            .scan_catalog(request)
            .filter_map(|event| async move {
                match event {
                    CatalogEvent::ItemDiscovered(item) => Some(item.source_id),
                    _ => None,
                }
            })
            .collect()
            .await
    }

    #[test]
    fn parses_ndjson_and_arrays() {
        assert_eq!(parse_catalog(NDJSON).unwrap().len(), 3);
        let array = r#"[{"source_type":"xtream","source_id":"1","media_type":"vod","title":"Heat"}]"#;
        let items = parse_catalog(array).unwrap();
        assert_eq!(items[0].media_type, MediaType::Movie);
    }

    #[test]
    fn unknown_source_type_is_rejected() {
        let line = r#"{"source_type":"plex","source_id":"1","media_type":"movie","title":"x"}"#;
        assert!(parse_catalog(line).is_err());
    }

    #[tokio::test]
    async fn scan_honours_phase_and_chat_filters() {
        let file = write_catalog(NDJSON);
        let pipeline = CatalogFilePipeline::new("telegram", file.path());

        assert_eq!(discovered(&pipeline, ScanRequest::all()).await.len(), 3);
        assert_eq!(
            discovered(&pipeline, ScanRequest::for_phases([SyncPhase::Movies])).await,
            vec!["tg-1"]
        );
        assert_eq!(
            discovered(&pipeline, ScanRequest::all().with_chat_ids(vec![8])).await,
            vec!["tg-2"]
        );
    }

    #[tokio::test]
    async fn emits_progress_and_completion() {
        let file = write_catalog(NDJSON);
        let pipeline = CatalogFilePipeline::new("telegram", file.path()).with_progress_every(2);
        let events: Vec<_> = pipeline.scan_catalog(ScanRequest::all()).collect().await;

        assert_eq!(events.first(), Some(&CatalogEvent::ScanStarted));
        assert_eq!(events.last(), Some(&CatalogEvent::ScanCompleted));
        assert!(events.iter().any(|event| matches!(
            event,
            CatalogEvent::ScanProgress { discovered: 2, total: Some(3), .. }
        )));
    }

    #[tokio::test]
    async fn malformed_file_reports_scan_error() {
        let file = write_catalog("{not json");
        let pipeline = CatalogFilePipeline::new("io", file.path());
        let events: Vec<_> = pipeline.scan_catalog(ScanRequest::all()).collect().await;

        assert!(matches!(
            events.last(),
            Some(CatalogEvent::ScanError { reason, .. }) if reason == "catalog_malformed"
        ));
    }

    #[tokio::test]
    async fn missing_file_reports_scan_error() {
        let pipeline = CatalogFilePipeline::new("io", "/nonexistent/catalog.json");
        let events: Vec<_> = pipeline.scan_catalog(ScanRequest::all()).collect().await;
        assert!(matches!(
            events.last(),
            Some(CatalogEvent::ScanError { reason, .. }) if reason == "catalog_unreadable"
        ));
    }
}
