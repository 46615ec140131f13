//! Settings for MediaSync processes.
//!
//! [`SyncSettings`] bundles the per-run [`SyncConfig`](mediasync_core::SyncConfig),
//! the memory thresholds and the device class. [`ConfigLoader`] resolves it from
//! the environment, a `.env` file or a config file, then runs the guard rails in
//! [`validation`].
#![allow(missing_docs)]

pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use error::ConfigLoadError;
pub use loader::{ConfigLoad, ConfigLoader};
pub use settings::{SettingsSource, SyncSettings};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
