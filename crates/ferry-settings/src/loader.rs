//! Layered settings: compiled defaults, then `~/.ferry/settings.json`, then
//! `FERRY_*` environment variables, then validation.
//!
//! File values are overlaid with [`deep_merge`]. Objects merge per key, while
//! arrays and scalars replace. A `null` in the file leaves the default alone.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::FerrySettings;

/// Resolve the path to the settings file (`~/.ferry/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".ferry").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<FerrySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an invalid final value is
/// an error.
pub fn load_settings_from_path(path: &Path) -> Result<FerrySettings> {
    let defaults = serde_json::to_value(FerrySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: FerrySettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Overlay `overlay` onto `base`, descending into nested objects.
///
/// `null` in the overlay keeps the base value; any other non-object value
/// replaces it outright.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    let (mut fields, overrides) = match (base, overlay) {
        (Value::Object(fields), Value::Object(overrides)) => (fields, overrides),
        (_, overlay) => return overlay,
    };
    for (key, value) in overrides.into_iter().filter(|(_, v)| !v.is_null()) {
        let merged = match fields.remove(&key) {
            Some(existing) => deep_merge(existing, value),
            None => value,
        };
        let _ = fields.insert(key, merged);
    }
    Value::Object(fields)
}

/// Apply `FERRY_*` environment variable overrides.
pub fn apply_env_overrides(settings: &mut FerrySettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary lookup (env vars in production).
///
/// Invalid values are ignored with a warning and fall back to file/default.
pub fn apply_overrides(settings: &mut FerrySettings, lookup: impl Fn(&str) -> Option<String>) {
    let read_string = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let read_u64 = |name: &str, min: u64, max: u64| {
        let val = lookup(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    };

    // ── API ─────────────────────────────────────────────────────────
    if let Some(v) = read_string("FERRY_API_BASE_URL") {
        settings.api.base_url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = read_u64("FERRY_REQUEST_TIMEOUT_MS", 100, 600_000) {
        settings.api.request_timeout_ms = v;
    }

    // ── Polling ─────────────────────────────────────────────────────
    if let Some(v) = read_u64("FERRY_TASKS_POLL_MS", 250, 3_600_000) {
        settings.polling.tasks_interval_ms = v;
    }
    if let Some(v) = read_u64("FERRY_CONTACTS_POLL_MS", 250, 3_600_000) {
        settings.polling.contacts_interval_ms = v;
    }
    if let Some(v) = read_u64("FERRY_CONVERSATION_POLL_MS", 250, 3_600_000) {
        settings.polling.conversation_interval_ms = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_string("FERRY_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

/// Reject settings the client cannot run with.
pub fn validate(settings: &FerrySettings) -> Result<()> {
    if settings.api.base_url.trim().is_empty() {
        return Err(SettingsError::InvalidValue(
            "api.baseUrl must not be empty".to_string(),
        ));
    }
    let polling = &settings.polling;
    if polling.tasks_interval_ms == 0
        || polling.contacts_interval_ms == 0
        || polling.conversation_interval_ms == 0
    {
        return Err(SettingsError::InvalidValue(
            "poll intervals must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"api": {"baseUrl": "a", "requestTimeoutMs": 1}});
        let source = serde_json::json!({"api": {"baseUrl": "b"}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["api"]["baseUrl"], "b");
        assert_eq!(merged["api"]["requestTimeoutMs"], 1);
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn merge_array_replace() {
        let merged = deep_merge(
            serde_json::json!({"items": [1, 2, 3]}),
            serde_json::json!({"items": [4]}),
        );
        assert_eq!(merged["items"], serde_json::json!([4]));
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from_path(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings.polling.tasks_interval_ms, 5_000);
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"polling": {"conversationIntervalMs": 1000}, "logging": {"level": "debug"}}"#,
        )
        .unwrap();
        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.polling.conversation_interval_ms, 1_000);
        assert_eq!(settings.polling.contacts_interval_ms, 5_000);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"polling": {"tasksIntervalMs": 0}}"#).unwrap();
        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn overrides_apply_valid_values() {
        let mut settings = FerrySettings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[
                ("FERRY_API_BASE_URL", "http://127.0.0.1:8080/"),
                ("FERRY_REQUEST_TIMEOUT_MS", "3000"),
                ("FERRY_CONVERSATION_POLL_MS", "1000"),
                ("FERRY_LOG_LEVEL", "info"),
            ]),
        );
        assert_eq!(settings.api.base_url, "http://127.0.0.1:8080");
        assert_eq!(settings.api.request_timeout_ms, 3_000);
        assert_eq!(settings.polling.conversation_interval_ms, 1_000);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn overrides_ignore_invalid_values() {
        let mut settings = FerrySettings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[
                ("FERRY_REQUEST_TIMEOUT_MS", "soon"),
                ("FERRY_TASKS_POLL_MS", "1"),
                ("FERRY_API_BASE_URL", "   "),
            ]),
        );
        assert_eq!(settings.api.request_timeout_ms, 15_000);
        assert_eq!(settings.polling.tasks_interval_ms, 5_000);
        assert_eq!(settings.api.base_url, "https://efetosun.com");
    }

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("500", 100, 1000), Some(500));
        assert_eq!(parse_u64_range("50", 100, 1000), None);
        assert_eq!(parse_u64_range("-1", 0, 10), None);
    }
}
