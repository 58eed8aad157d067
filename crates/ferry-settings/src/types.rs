//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a partial
//! JSON file only needs the keys it overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FerrySettings {
    /// Backend origin, endpoint paths, and request policy.
    pub api: ApiSettings,
    /// Poll cadence per list view.
    pub polling: PollingSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Backend connection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// API origin, without trailing slash.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Message count requested when loading a conversation.
    pub conversation_limit: u32,
    /// Endpoint paths relative to `base_url`.
    pub endpoints: EndpointSettings,
}

impl ApiSettings {
    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://efetosun.com".to_string(),
            request_timeout_ms: 15_000,
            conversation_limit: 200,
            endpoints: EndpointSettings::default(),
        }
    }
}

/// Endpoint paths. Actions are selected through query parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointSettings {
    /// Task CRUD, steps, comments, create targets.
    pub tasks: String,
    /// Session probe (`action=me`).
    pub auth: String,
    /// Task file upload.
    pub upload: String,
    /// Contact list.
    pub contacts: String,
    /// User directory.
    pub all_users: String,
    /// Conversation with one contact.
    pub conversation: String,
    /// Send a message.
    pub send_message: String,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            tasks: "/system/api/tasks.php".to_string(),
            auth: "/system/api/auth.php".to_string(),
            upload: "/system/api/upload.php".to_string(),
            contacts: "/api/chat/get-contacts.php".to_string(),
            all_users: "/api/chat/get-all-users.php".to_string(),
            conversation: "/api/chat/get-conversation.php".to_string(),
            send_message: "/api/chat/send.php".to_string(),
        }
    }
}

/// Base poll intervals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollingSettings {
    /// Task board refresh interval in milliseconds.
    pub tasks_interval_ms: u64,
    /// Contact list refresh interval in milliseconds.
    pub contacts_interval_ms: u64,
    /// Open conversation refresh interval in milliseconds.
    pub conversation_interval_ms: u64,
}

impl PollingSettings {
    /// Task board interval.
    pub fn tasks_interval(&self) -> Duration {
        Duration::from_millis(self.tasks_interval_ms)
    }

    /// Contact list interval.
    pub fn contacts_interval(&self) -> Duration {
        Duration::from_millis(self.contacts_interval_ms)
    }

    /// Conversation interval.
    pub fn conversation_interval(&self) -> Duration {
        Duration::from_millis(self.conversation_interval_ms)
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            tasks_interval_ms: 5_000,
            contacts_interval_ms: 5_000,
            conversation_interval_ms: 2_500,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let settings: FerrySettings =
            serde_json::from_str(r#"{"api": {"baseUrl": "http://localhost:9000"}}"#).unwrap();
        assert_eq!(settings.api.base_url, "http://localhost:9000");
        assert_eq!(settings.api.endpoints.tasks, "/system/api/tasks.php");
        assert_eq!(settings.polling.conversation_interval_ms, 2_500);
    }

    #[test]
    fn camel_case_wire_format() {
        let json = serde_json::to_value(FerrySettings::default()).unwrap();
        assert!(json["api"]["requestTimeoutMs"].is_number());
        assert!(json["api"]["endpoints"]["sendMessage"].is_string());
        assert!(json["polling"]["tasksIntervalMs"].is_number());
    }

    #[test]
    fn durations() {
        let polling = PollingSettings::default();
        assert_eq!(polling.conversation_interval(), Duration::from_millis(2_500));
        assert_eq!(ApiSettings::default().request_timeout(), Duration::from_secs(15));
    }
}
