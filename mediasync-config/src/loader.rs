use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ConfigLoadError;
use crate::settings::{SettingsSource, SyncSettings};
use crate::validation::ConfigWarnings;

/// Validated settings plus where they came from.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub settings: SyncSettings,
    pub source: SettingsSource,
    pub env_file_loaded: bool,
    pub warnings: ConfigWarnings,
}

/// Resolves [`SyncSettings`] for a process: `.env` first, then
/// [`SyncSettings::load_from_env`], then the guard rails.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    env_file: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read this file instead of searching for `.env`. A missing explicit
    /// file is an error; a missing implicit `.env` is not.
    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = self.load_env_file()?;
        let (settings, source) =
            SyncSettings::load_from_env().map_err(ConfigLoadError::Settings)?;
        Self::finish(settings, source, env_file_loaded)
    }

    /// Validate settings obtained some other way.
    pub fn finish(
        settings: SyncSettings,
        source: SettingsSource,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let warnings = settings.validate()?;
        warnings.log();
        info!(
            target: "config",
            source = ?source,
            device_class = %settings.device_class,
            mode = ?settings.sync.mode,
            warnings = warnings.len(),
            "sync settings loaded"
        );

        Ok(ConfigLoad {
            settings,
            source,
            env_file_loaded,
            warnings,
        })
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        match &self.env_file {
            Some(path) => load_explicit(path).map(|()| true),
            None => match dotenvy::dotenv() {
                Ok(path) => {
                    debug!(target: "config", path = %path.display(), "loaded .env");
                    Ok(true)
                }
                Err(err) if err.not_found() => Ok(false),
                Err(source) => Err(ConfigLoadError::EnvFile {
                    path: PathBuf::from(".env"),
                    source,
                }),
            },
        }
    }
}

fn load_explicit(path: &Path) -> Result<(), ConfigLoadError> {
    dotenvy::from_path(path).map_err(|source| ConfigLoadError::EnvFile {
        path: path.to_path_buf(),
        source,
    })
}
