use std::fs;

use mediasync_config::{ConfigLoadError, ConfigLoader, SettingsSource, SyncSettings};
use mediasync_core::model::SyncPhase;
use mediasync_core::{DeviceClass, SyncMode};

#[test]
fn constrained_channel_settings_load_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mediasync.toml");
    fs::write(
        &path,
        r#"
device_class = "constrained"

[sync]
mode = "channel"
enable_canonical_linking = false

[sync.channel]
consumers = 4

[sync.channel.buffer]
capacity = 100

[memory]
budget_bytes = 268435456
"#,
    )
    .unwrap();

    let settings = SyncSettings::load_from_file(&path).unwrap();
    let load =
        ConfigLoader::finish(settings, SettingsSource::File(path.clone()), false)
            .unwrap();

    let settings = &load.settings;
    assert!(load.warnings.is_empty(), "{:?}", load.warnings);
    assert_eq!(settings.device_class, DeviceClass::Constrained);
    assert_eq!(settings.sync.mode, SyncMode::Channel);
    assert!(!settings.sync.enable_canonical_linking);
    assert_eq!(settings.sync.channel.consumers, 4);
    assert_eq!(settings.sync.channel.buffer.capacity, 100);
    assert_eq!(settings.memory.budget_bytes, Some(268_435_456));
    assert_eq!(
        settings
            .batch_policy()
            .effective_batch_size(SyncPhase::Live, settings.sync.batches.live),
        35
    );
}

#[test]
fn malformed_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    let err = SyncSettings::load_from_file(&path).unwrap_err();
    assert!(format!("{err:#}").contains("broken.json"));
}

#[test]
fn unordered_thresholds_are_a_guard_rail_error() {
    let settings = SyncSettings::parse_json(
        r#"{"memory":{"normal":0.8,"warning":0.7,"critical":0.9}}"#,
    )
    .unwrap();

    let err = ConfigLoader::finish(settings, SettingsSource::EnvInline, false)
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::GuardRail(_)));
}
