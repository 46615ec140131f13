use mediasync_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid media: {0}")]
    Model(#[from] ModelError),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("No raw store registered for {source_name} / {phase}")]
    MissingStore { source_name: String, phase: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
