use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use mediasync_model::{
    CanonicalMediaId, MediaSourceRef, NormalizedMediaMetadata, SourceRefKey,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::ports::CanonicalMediaRepository;

/// One canonical work with its linked provider refs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    pub id: CanonicalMediaId,
    pub metadata: NormalizedMediaMetadata,
    pub refs: BTreeMap<SourceRefKey, MediaSourceRef>,
    pub resume_position_ms: Option<u64>,
}

#[derive(Debug, Default)]
struct CanonicalState {
    records: HashMap<CanonicalMediaId, CanonicalRecord>,
    /// Which canonical id owns each provider ref.
    owners: HashMap<SourceRefKey, CanonicalMediaId>,
    /// Alternate keys (title and TMDB) of records stored under another id.
    aliases: HashMap<CanonicalMediaId, CanonicalMediaId>,
}

impl CanonicalState {
    /// Record id for `id`, following aliases.
    fn resolve(&self, id: &CanonicalMediaId) -> Option<CanonicalMediaId> {
        if self.records.contains_key(id) {
            Some(id.clone())
        } else {
            self.aliases.get(id).cloned()
        }
    }

    /// Record matched by title key, unless it already names another TMDB
    /// work (remakes share title and year).
    fn resolve_title(
        &self,
        title: &CanonicalMediaId,
        tmdb_id: Option<u64>,
    ) -> Option<CanonicalMediaId> {
        let owner = self.resolve(title)?;
        let known = self.records.get(&owner)?.metadata.tmdb_id;
        match (known, tmdb_id) {
            (Some(known), Some(incoming)) if known != incoming => None,
            _ => Some(owner),
        }
    }

    fn unknown(id: &CanonicalMediaId) -> SyncError {
        SyncError::Repository(format!("unknown canonical id {id}"))
    }
}

/// Canonical repository held in memory.
///
/// A provider ref belongs to at most one canonical work: re-linking it to
/// a different id moves it.
///
/// Each record also answers to its title key and, once known, its TMDB key.
/// An item only one provider resolved to TMDB still lands on the record the
/// other provider created.
#[derive(Debug, Default)]
pub struct InMemoryCanonicalRepository {
    state: RwLock<CanonicalState>,
}

impl InMemoryCanonicalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, id: &CanonicalMediaId) -> Option<CanonicalRecord> {
        let state = self.state.read().await;
        let id = state.resolve(id)?;
        state.records.get(&id).cloned()
    }

    pub async fn ids(&self) -> Vec<CanonicalMediaId> {
        let mut ids: Vec<_> = self.state.read().await.records.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Canonical id a provider item is linked to, if any.
    pub async fn owner_of(&self, key: &SourceRefKey) -> Option<CanonicalMediaId> {
        self.state.read().await.owners.get(key).cloned()
    }
}

fn merge_metadata(existing: &mut NormalizedMediaMetadata, incoming: &NormalizedMediaMetadata) {
    existing.year = existing.year.or(incoming.year);
    existing.tmdb_id = existing.tmdb_id.or(incoming.tmdb_id);
    existing.duration_ms = existing.duration_ms.or(incoming.duration_ms);
}

#[async_trait]
impl CanonicalMediaRepository for InMemoryCanonicalRepository {
    async fn upsert_canonical_media(
        &self,
        normalized: &NormalizedMediaMetadata,
    ) -> Result<CanonicalMediaId> {
        let primary = CanonicalMediaId::derive(normalized)?;
        let title = CanonicalMediaId::derive_from_title(normalized)
            .ok()
            .filter(|title| *title != primary);

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let existing = state.resolve(&primary).or_else(|| {
            title
                .as_ref()
                .and_then(|title| state.resolve_title(title, normalized.tmdb_id))
        });

        let id = match existing {
            Some(owner) => {
                if let Some(record) = state.records.get_mut(&owner) {
                    merge_metadata(&mut record.metadata, normalized);
                }
                owner
            }
            None => {
                state.records.insert(
                    primary.clone(),
                    CanonicalRecord {
                        id: primary.clone(),
                        metadata: normalized.clone(),
                        refs: BTreeMap::new(),
                        resume_position_ms: None,
                    },
                );
                primary.clone()
            }
        };

        for alias in [Some(primary), title].into_iter().flatten() {
            if alias == id || state.records.contains_key(&alias) {
                continue;
            }
            if let Entry::Vacant(slot) = state.aliases.entry(alias) {
                debug!(target: "sync::link", alias = %slot.key(), id = %id, "canonical alias added");
                slot.insert(id.clone());
            }
        }
        Ok(id)
    }

    async fn add_or_update_source_ref(
        &self,
        id: &CanonicalMediaId,
        source_ref: MediaSourceRef,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let resolved = state.resolve(id).ok_or_else(|| CanonicalState::unknown(id))?;
        let id = &resolved;

        let key = source_ref.key();
        if let Some(previous) = state.owners.insert(key.clone(), id.clone())
            && previous != *id
        {
            debug!(
                target: "sync::link",
                from = %previous,
                to = %id,
                source_id = %key.source_id,
                "moving source ref to a new canonical id"
            );
            if let Some(record) = state.records.get_mut(&previous) {
                record.refs.remove(&key);
            }
        }

        if let Some(record) = state.records.get_mut(id) {
            record.refs.insert(key, source_ref);
        }
        Ok(())
    }

    async fn source_refs(&self, id: &CanonicalMediaId) -> Result<Vec<MediaSourceRef>> {
        let state = self.state.read().await;
        Ok(state
            .resolve(id)
            .and_then(|id| state.records.get(&id))
            .map(|record| record.refs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save_resume_position(&self, id: &CanonicalMediaId, position_ms: u64) -> Result<()> {
        let mut state = self.state.write().await;
        let resolved = state.resolve(id).ok_or_else(|| CanonicalState::unknown(id))?;
        let record = state
            .records
            .get_mut(&resolved)
            .ok_or_else(|| CanonicalState::unknown(id))?;
        record.resume_position_ms = Some(position_ms);
        Ok(())
    }

    async fn resume_position(&self, id: &CanonicalMediaId) -> Result<Option<u64>> {
        let state = self.state.read().await;
        Ok(state
            .resolve(id)
            .and_then(|id| state.records.get(&id))
            .and_then(|record| record.resume_position_ms))
    }
}
