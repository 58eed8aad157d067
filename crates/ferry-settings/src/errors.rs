//! Settings error types.

use thiserror::Error;

/// Why the settings file could not be used.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid JSON, or does not fit the settings shape.
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
    /// A value is outside what the client can run with.
    #[error("invalid setting: {0}")]
    InvalidValue(String),
}

/// Settings result.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_display() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        assert!(SettingsError::Json(json_err).to_string().starts_with("malformed settings"));
    }

    #[test]
    fn io_error_names_file() {
        let err = SettingsError::Io {
            path: "/tmp/settings.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "cannot read /tmp/settings.json: denied");
    }

    #[test]
    fn invalid_value_display() {
        let err = SettingsError::InvalidValue("baseUrl must not be empty".to_string());
        assert_eq!(err.to_string(), "invalid setting: baseUrl must not be empty");
    }
}
