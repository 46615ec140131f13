//! Reference implementations of the collaborator ports.

pub mod file_pipeline;
pub mod memory_canonical;
pub mod memory_raw;
pub mod normalizer;
pub mod raw_registry;

pub use file_pipeline::{CatalogFilePipeline, load_catalog, parse_catalog};
pub use memory_canonical::{CanonicalRecord, InMemoryCanonicalRepository};
pub use memory_raw::InMemoryRawRepository;
pub use normalizer::{BasicMetadataNormalizer, CleanedTitle};
pub use raw_registry::{GatedRawStore, RawStoreRegistry};
