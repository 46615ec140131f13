use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, anyhow};
use mediasync_core::{
    BatchSizePolicy, DeviceClass, MemoryThresholds, SyncConfig,
    sync::MemoryPressureMonitor,
};
use serde::{Deserialize, Serialize};

pub const CONFIG_PATH_VAR: &str = "MEDIASYNC_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "MEDIASYNC_CONFIG_JSON";
pub const DEVICE_CLASS_VAR: &str = "MEDIASYNC_DEVICE_CLASS";

const CANDIDATES: &[&str] = &[
    "mediasync.toml",
    "mediasync.json",
    "config/mediasync.toml",
    "config/mediasync.json",
];

/// Where the settings were read from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SettingsSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Everything a process needs to drive sync runs.
///
/// ```toml
/// device_class = "constrained"
///
/// [sync]
/// mode = "channel"
/// progress_every = 500
///
/// [sync.batches]
/// movies = 300
///
/// [memory]
/// critical = 0.9
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// `standard` or `constrained`; the latter caps every batch size.
    pub device_class: DeviceClass,
    /// Defaults applied to every run started by this process.
    pub sync: SyncConfig,
    pub memory: MemoryThresholds,
}

impl SyncSettings {
    /// Load settings using environment variables.
    /// Evaluation order:
    /// 1) `$MEDIASYNC_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$MEDIASYNC_CONFIG_JSON` (inline JSON),
    /// 3) the first default file found in the working directory,
    /// 4) defaults.
    ///
    /// `$MEDIASYNC_DEVICE_CLASS` overrides the device class from any of them.
    pub fn load_from_env() -> anyhow::Result<(Self, SettingsSource)> {
        let cwd = env::current_dir()
            .context("failed to resolve the working directory")?;
        Self::load_with(&cwd, |key| env::var(key).ok())
    }

    /// [`load_from_env`](Self::load_from_env) against an arbitrary variable
    /// lookup and base directory.
    pub fn load_with<F>(
        base_dir: &Path,
        var: F,
    ) -> anyhow::Result<(Self, SettingsSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| var(key).filter(|value| !value.trim().is_empty());

        let (mut settings, source) = if let Some(path_str) = lookup(CONFIG_PATH_VAR)
        {
            let path = PathBuf::from(path_str);
            let settings = Self::load_from_file(&path)?;
            (settings, SettingsSource::EnvPath(path))
        } else if let Some(raw) = lookup(CONFIG_JSON_VAR) {
            let settings = Self::parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_VAR}"))?;
            (settings, SettingsSource::EnvInline)
        } else if let Some(path) = Self::find_default_file(base_dir) {
            let settings = Self::load_from_file(&path)?;
            (settings, SettingsSource::File(path))
        } else {
            (Self::default(), SettingsSource::Default)
        };

        if let Some(raw) = lookup(DEVICE_CLASS_VAR) {
            settings.device_class = raw
                .parse()
                .with_context(|| format!("invalid {DEVICE_CLASS_VAR}"))?;
        }

        Ok((settings, source))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read sync settings from {}", path.display())
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid sync settings {}", path.display())
            }),
            Some("toml") => toml::from_str(&contents).map_err(|err| {
                anyhow!("invalid sync settings {}: {}", path.display(), err)
            }),
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        // TOML first, JSON as a fallback.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse sync settings {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid sync settings json: {err}"))
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("failed to render sync settings")
    }

    pub fn batch_policy(&self) -> Arc<dyn BatchSizePolicy> {
        self.device_class.batch_policy()
    }

    pub fn memory_monitor(&self) -> Arc<MemoryPressureMonitor> {
        Arc::new(MemoryPressureMonitor::for_process(self.memory))
    }

    fn find_default_file(base_dir: &Path) -> Option<PathBuf> {
        CANDIDATES
            .iter()
            .map(|candidate| base_dir.join(candidate))
            .find(|path| path.exists())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use mediasync_core::SyncMode;
    use mediasync_core::model::SyncPhase;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings = SyncSettings::parse_from_str(
            r#"
            device_class = "Constrained"

            [sync]
            mode = "channel"

            [sync.batches]
            movies = 300
            "#,
            "inline",
        )
        .unwrap();

        assert_eq!(settings.device_class, DeviceClass::Constrained);
        assert_eq!(settings.sync.mode, SyncMode::Channel);
        assert_eq!(settings.sync.batches.size_for(SyncPhase::Movies), 300);
        assert_eq!(settings.sync.batches.size_for(SyncPhase::Live), 400);
        assert_eq!(settings.memory, MemoryThresholds::default());
    }

    #[test]
    fn json_is_accepted_without_extension() {
        let settings =
            SyncSettings::parse_from_str(r#"{"sync":{"progress_every":10}}"#, "x")
                .unwrap();
        assert_eq!(settings.sync.progress_every, 10);
    }

    #[test]
    fn unknown_device_class_is_rejected() {
        let err =
            SyncSettings::parse_from_str(r#"device_class = "tablet""#, "inline")
                .unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn inline_json_wins_over_default_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mediasync.toml"), "[sync]\nprogress_every = 7\n")
            .unwrap();

        let (settings, source) = SyncSettings::load_with(
            dir.path(),
            vars(&[(CONFIG_JSON_VAR, r#"{"sync":{"progress_every":3}}"#)]),
        )
        .unwrap();
        assert_eq!(source, SettingsSource::EnvInline);
        assert_eq!(settings.sync.progress_every, 3);

        let (settings, source) =
            SyncSettings::load_with(dir.path(), vars(&[])).unwrap();
        assert_eq!(source, SettingsSource::File(dir.path().join("mediasync.toml")));
        assert_eq!(settings.sync.progress_every, 7);
    }

    #[test]
    fn nested_default_file_is_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("config")).unwrap();
        let path = dir.path().join("config/mediasync.json");
        fs::write(&path, r#"{"memory":{"critical":0.95}}"#).unwrap();

        let (settings, source) =
            SyncSettings::load_with(dir.path(), vars(&[])).unwrap();
        assert_eq!(source, SettingsSource::File(path));
        assert_eq!(settings.memory.critical, 0.95);
    }

    #[test]
    fn device_class_variable_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "device_class = \"standard\"\n").unwrap();
        let path_str = path.display().to_string();

        let (settings, source) = SyncSettings::load_with(
            dir.path(),
            vars(&[
                (CONFIG_PATH_VAR, path_str.as_str()),
                (DEVICE_CLASS_VAR, " CONSTRAINED "),
            ]),
        )
        .unwrap();
        assert_eq!(source, SettingsSource::EnvPath(path));
        assert_eq!(settings.device_class, DeviceClass::Constrained);

        assert!(
            SyncSettings::load_with(dir.path(), vars(&[(DEVICE_CLASS_VAR, "phone")]))
                .is_err()
        );
    }

    #[test]
    fn blank_variables_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, source) = SyncSettings::load_with(
            dir.path(),
            vars(&[(CONFIG_PATH_VAR, "  "), (DEVICE_CLASS_VAR, "")]),
        )
        .unwrap();
        assert_eq!(source, SettingsSource::Default);
        assert_eq!(settings, SyncSettings::default());
    }

    #[test]
    fn rendered_toml_parses_back() {
        let mut settings = SyncSettings::default();
        settings.sync.batch_size = Some(80);
        settings.memory.budget_bytes = Some(512 * 1024 * 1024);

        let rendered = settings.to_toml().unwrap();
        let parsed = SyncSettings::parse_from_str(&rendered, "rendered").unwrap();
        assert_eq!(parsed, settings);
    }
}
