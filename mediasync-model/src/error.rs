use std::fmt::{self, Display};

/// Errors produced by model constructors and parsing routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    UnknownSourceType(String),
    UnknownMediaType(String),
    UnknownSyncPhase(String),
    InvalidMedia(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownSourceType(raw) => {
                write!(f, "unknown source type '{raw}'")
            }
            ModelError::UnknownMediaType(raw) => {
                write!(f, "unknown media type '{raw}'")
            }
            ModelError::UnknownSyncPhase(raw) => {
                write!(f, "unknown sync phase '{raw}'")
            }
            ModelError::InvalidMedia(msg) => write!(f, "invalid media: {msg}"),
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
