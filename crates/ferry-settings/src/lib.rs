//! # ferry-settings
//!
//! Client configuration: API origin, request timeout, poll intervals and log
//! level. Values come from compiled defaults, overlaid by
//! `~/.ferry/settings.json`, overlaid by `FERRY_*` environment variables.
//!
//! ```no_run
//! let settings = ferry_settings::get_settings();
//! println!("API origin: {}", settings.api.base_url);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<FerrySettings> = OnceLock::new();

/// Process-wide settings, loaded lazily on first access.
///
/// A load failure is logged and the compiled defaults are used instead.
pub fn get_settings() -> &'static FerrySettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            FerrySettings::default()
        })
    })
}

/// Install `settings` as the process-wide value before anything reads it.
///
/// Hands the value back when [`get_settings`] already ran.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: FerrySettings) -> std::result::Result<(), FerrySettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
