//! # ddig-settings
//!
//! Configuration for the forms backend, loaded from three layers (in priority
//! order):
//! 1. **Compiled defaults**: [`DdigSettings::default()`]
//! 2. **Settings file**: `$DDIG_SETTINGS` or `./ddig.json` (deep-merged)
//! 3. **Environment variables**: `DDIG_*` overrides
//!
//! The loaded value is handed to the store, dispatcher and server at
//! construction; nothing reads it through a global.

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
