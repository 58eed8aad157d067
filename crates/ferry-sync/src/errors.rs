//! Engine error taxonomy.

use ferry_auth::DEFAULT_UNAUTHORIZED_REASON;
use ferry_client::ApiError;

/// Why an engine operation failed.
///
/// Dropped single-flight attempts are not errors; see
/// [`crate::MutationOutcome::Dropped`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Local validation failed; no request was sent.
    #[error("{0}")]
    Precondition(String),

    /// The server rejected the session. Forced logout is already under way.
    #[error("session rejected")]
    Unauthorized,

    /// `success: false` from the server.
    #[error("{}", message.as_deref().unwrap_or("request rejected by server"))]
    Application {
        /// Server message, if any.
        message: Option<String>,
    },

    /// Network failure, non-2xx status, or an unreadable body.
    #[error("{message}")]
    Transport {
        /// Best available diagnostic.
        message: String,
    },
}

impl SyncError {
    /// Precondition failure with `message`.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Text to show the user. Server and diagnostic text is passed through;
    /// an application error without a message uses `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Precondition(m)
            | Self::Application { message: Some(m) }
            | Self::Transport { message: m } => m.clone(),
            Self::Unauthorized => DEFAULT_UNAUTHORIZED_REASON.to_string(),
            Self::Application { message: None } => fallback.to_string(),
        }
    }
}

impl From<ApiError> for SyncError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Unauthorized { .. } => Self::Unauthorized,
            ApiError::Application { message } => Self::Application { message },
            ApiError::Http { status, message } => Self::Transport {
                message: message.unwrap_or_else(|| format!("HTTP {status}")),
            },
            ApiError::InvalidBody | ApiError::Transport(_) => Self::Transport {
                message: e.to_string(),
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
