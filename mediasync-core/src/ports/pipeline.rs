use std::collections::BTreeSet;
use std::fmt;
use std::pin::Pin;

use futures::Stream;
use mediasync_model::{MediaType, RawMediaMetadata, SyncPhase};

/// Events produced by a source pipeline while it walks a provider catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    ScanStarted,
    ItemDiscovered(RawMediaMetadata),
    ScanProgress {
        discovered: u64,
        total: Option<u64>,
        phase: String,
    },
    ScanCompleted,
    ScanCancelled,
    ScanError {
        reason: String,
        message: String,
        cause: Option<String>,
    },
}

impl CatalogEvent {
    pub fn error(reason: impl Into<String>, message: impl Into<String>) -> Self {
        CatalogEvent::ScanError {
            reason: reason.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CatalogEvent::ScanCompleted
                | CatalogEvent::ScanCancelled
                | CatalogEvent::ScanError { .. }
        )
    }
}

pub type CatalogEventStream =
    Pin<Box<dyn Stream<Item = CatalogEvent> + Send + 'static>>;

/// Scope of one scan.
///
/// An empty phase set means every phase the source knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRequest {
    pub phases: BTreeSet<SyncPhase>,
    /// Restricts chat-based sources to these chats. Ignored elsewhere.
    pub chat_ids: Option<Vec<i64>>,
}

impl ScanRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_phases(phases: impl IntoIterator<Item = SyncPhase>) -> Self {
        Self {
            phases: phases.into_iter().collect(),
            chat_ids: None,
        }
    }

    pub fn with_chat_ids(mut self, chat_ids: Vec<i64>) -> Self {
        self.chat_ids = Some(chat_ids);
        self
    }

    pub fn includes(&self, phase: SyncPhase) -> bool {
        self.phases.is_empty() || self.phases.contains(&phase)
    }

    /// Whether items of `media_type` are in scope. Episodes are only in
    /// scope when the episode phase is requested explicitly, so a
    /// series-only scan returns series containers without their episodes.
    pub fn includes_media_type(&self, media_type: MediaType) -> bool {
        if self.phases.is_empty() {
            return true;
        }
        match media_type {
            MediaType::Live => self.includes(SyncPhase::Live),
            MediaType::Series => self.includes(SyncPhase::Series),
            MediaType::Episode => self.includes(SyncPhase::Episodes),
            MediaType::Movie | MediaType::Audiobook | MediaType::Unknown => {
                self.includes(SyncPhase::Movies)
            }
        }
    }

    /// Phases this request resolves to, in declared order.
    pub fn effective_phases(&self) -> Vec<SyncPhase> {
        SyncPhase::ALL
            .iter()
            .copied()
            .filter(|phase| self.includes(*phase))
            .collect()
    }

    /// Same request narrowed to a single phase.
    pub fn restricted_to(&self, phase: SyncPhase) -> Self {
        Self {
            phases: BTreeSet::from([phase]),
            chat_ids: self.chat_ids.clone(),
        }
    }
}

/// A provider catalog. Each call to [`scan_catalog`](Self::scan_catalog)
/// starts a fresh, cold scan; dropping the stream abandons it.
pub trait CatalogPipeline: Send + Sync + fmt::Debug {
    /// Name under which the orchestrator registers this pipeline.
    fn source(&self) -> &str;

    /// Whether the pipeline can run one independent scan per phase.
    fn supports_phase_split(&self) -> bool {
        false
    }

    fn scan_catalog(&self, request: ScanRequest) -> CatalogEventStream;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_covers_everything() {
        let request = ScanRequest::all();
        assert!(request.includes(SyncPhase::Episodes));
        assert!(request.includes_media_type(MediaType::Episode));
        assert_eq!(request.effective_phases(), SyncPhase::ALL.to_vec());
    }

    #[test]
    fn series_scope_excludes_episodes() {
        let request = ScanRequest::for_phases([SyncPhase::Series]);
        assert!(request.includes_media_type(MediaType::Series));
        assert!(!request.includes_media_type(MediaType::Episode));
        assert!(!request.includes_media_type(MediaType::Movie));
    }

    #[test]
    fn restriction_keeps_chat_filter() {
        let request = ScanRequest::all().with_chat_ids(vec![7, 9]);
        let narrowed = request.restricted_to(SyncPhase::Movies);
        assert_eq!(narrowed.effective_phases(), vec![SyncPhase::Movies]);
        assert_eq!(narrowed.chat_ids, Some(vec![7, 9]));
    }
}
