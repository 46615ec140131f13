//! # MediaSync Core
//!
//! Catalog synchronization and canonical unification engine. Consumes
//! per-source discovery streams, batches and persists what they find, and
//! links every provider item to one canonical identity per work.
//!
//! ## Architecture
//!
//! - [`ports`]: collaborator traits (pipelines, normalizer, repositories,
//!   batch-size policy)
//! - [`sync`]: batch manager, channel buffer, memory monitor, hint
//!   validation, linker, and the [`CatalogSyncOrchestrator`]
//! - [`infra`]: in-memory repositories, the default normalizer, and a
//!   file-backed pipeline
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use mediasync_core::infra::{
//!     CatalogFilePipeline, InMemoryCanonicalRepository, InMemoryRawRepository,
//!     RawStoreRegistry,
//! };
//! use mediasync_core::{CatalogSyncOrchestrator, ScanRequest, SyncConfig};
//!
//! # async fn run() -> mediasync_core::Result<()> {
//! let mut stores = RawStoreRegistry::new();
//! stores.register_all_phases("io", |_| Arc::new(InMemoryRawRepository::new()));
//!
//! let orchestrator = CatalogSyncOrchestrator::builder()
//!     .pipeline(Arc::new(CatalogFilePipeline::new("io", "catalog.ndjson")))
//!     .raw_stores(stores)
//!     .canonical_repository(Arc::new(InMemoryCanonicalRepository::new()))
//!     .build()?;
//!
//! let mut run = orchestrator.sync("io", ScanRequest::all(), SyncConfig::default());
//! while let Some(status) = run.next().await {
//!     println!("{status:?}");
//! }
//! # Ok(())
//! # }
//! ```
#![allow(missing_docs)]

pub mod error;
pub mod infra;
pub mod ports;
pub mod sync;

pub use error::{Result, SyncError};
pub use ports::{
    BatchSizePolicy, CanonicalMediaRepository, CatalogEvent, CatalogEventStream,
    CatalogPipeline, DeviceClass, MediaMetadataNormalizer, RawCatalogRepository,
    ScanRequest,
};
pub use sync::{
    BufferConfig, CatalogSyncOrchestrator, MemoryThresholds, SyncConfig,
    SyncMode, SyncRunHandle, TELEGRAM_SOURCE, XTREAM_SOURCE,
};

pub use mediasync_model as model;
