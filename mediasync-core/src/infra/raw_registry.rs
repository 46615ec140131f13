use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use mediasync_model::{RawMediaMetadata, SyncPhase};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::ports::RawCatalogRepository;

/// A raw repository behind a single-writer gate.
///
/// Every physical store is written by at most one task at a time, no
/// matter how many consumers a run spawns.
pub struct GatedRawStore {
    source: String,
    phase: SyncPhase,
    repository: Arc<dyn RawCatalogRepository>,
    gate: Mutex<()>,
}

impl fmt::Debug for GatedRawStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatedRawStore")
            .field("source", &self.source)
            .field("phase", &self.phase)
            .field("busy", &self.gate.try_lock().is_err())
            .finish()
    }
}

impl GatedRawStore {
    pub fn new(
        source: impl Into<String>,
        phase: SyncPhase,
        repository: Arc<dyn RawCatalogRepository>,
    ) -> Self {
        Self {
            source: source.into(),
            phase,
            repository,
            gate: Mutex::new(()),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub async fn upsert_all(&self, items: &[RawMediaMetadata]) -> Result<usize> {
        let _writer = self.gate.lock().await;
        self.repository.upsert_all(items).await
    }

    pub async fn delete_all(&self) -> Result<u64> {
        let _writer = self.gate.lock().await;
        self.repository.delete_all().await
    }

    pub async fn count(&self) -> Result<u64> {
        self.repository.count().await
    }
}

/// Raw stores keyed by `(source, phase)`.
#[derive(Debug, Default)]
pub struct RawStoreRegistry {
    stores: HashMap<(String, SyncPhase), Arc<GatedRawStore>>,
}

impl RawStoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `repository` for one phase, replacing any previous store.
    pub fn register(
        &mut self,
        source: &str,
        phase: SyncPhase,
        repository: Arc<dyn RawCatalogRepository>,
    ) -> &mut Self {
        let store = GatedRawStore::new(source, phase, repository);
        self.stores
            .insert((source.to_string(), phase), Arc::new(store));
        self
    }

    /// Register one store per phase, built by `factory`.
    pub fn register_all_phases<F>(&mut self, source: &str, mut factory: F) -> &mut Self
    where
        F: FnMut(SyncPhase) -> Arc<dyn RawCatalogRepository>,
    {
        for phase in SyncPhase::ALL {
            self.register(source, phase, factory(phase));
        }
        self
    }

    pub fn get(&self, source: &str, phase: SyncPhase) -> Option<Arc<GatedRawStore>> {
        self.stores.get(&(source.to_string(), phase)).cloned()
    }

    /// Stores registered for `source`, in phase order.
    pub fn for_source(&self, source: &str) -> Vec<Arc<GatedRawStore>> {
        let mut stores: Vec<_> = self
            .stores
            .iter()
            .filter(|((name, _), _)| name == source)
            .map(|(_, store)| Arc::clone(store))
            .collect();
        stores.sort_by_key(|store| store.phase());
        stores
    }

    pub fn has_source(&self, source: &str) -> bool {
        self.stores.keys().any(|(name, _)| name == source)
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}
