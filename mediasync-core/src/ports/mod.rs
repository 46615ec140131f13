//! Collaborator seams consumed by the sync engine.
//!
//! Everything behind these traits lives outside the engine: provider
//! transport clients, the on-disk schema, title-parsing tables. The
//! in-memory implementations under [`crate::infra`] back tests and the CLI.

pub mod batch_policy;
pub mod canonical;
pub mod normalizer;
pub mod pipeline;
pub mod raw_store;

pub use batch_policy::{
    BatchSizePolicy, ConstrainedDeviceBatchPolicy, DeviceClass,
    StandardBatchPolicy,
};
pub use canonical::CanonicalMediaRepository;
pub use normalizer::MediaMetadataNormalizer;
pub use pipeline::{CatalogEvent, CatalogEventStream, CatalogPipeline, ScanRequest};
pub use raw_store::RawCatalogRepository;
