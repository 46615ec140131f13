use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ConfigGuardRailError;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("{0:#}")]
    Settings(anyhow::Error),

    #[error("config guard rail violated: {0}")]
    GuardRail(#[from] ConfigGuardRailError),
}
