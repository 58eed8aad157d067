//! Client error types.

/// Result type alias for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure below HTTP: nothing usable came back.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS, or protocol failure.
    #[error("network error: {message}")]
    Network {
        /// Error description.
        message: String,
    },

    /// The request could not be built (bad URL, bad MIME type, ...).
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Error description.
        message: String,
    },
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_builder() {
            Self::InvalidRequest {
                message: e.to_string(),
            }
        } else {
            Self::Network {
                message: e.to_string(),
            }
        }
    }
}

/// Errors returned by [`crate::ApiClient`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 401/403. The session gate has already been notified.
    #[error("unauthorized (HTTP {status})")]
    Unauthorized {
        /// HTTP status code.
        status: u16,
    },

    /// Any other non-2xx status.
    #[error("HTTP {status}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Server message from the body, if any.
        message: Option<String>,
    },

    /// 2xx with `success: false`.
    #[error("{}", message.as_deref().unwrap_or("request rejected by server"))]
    Application {
        /// Server message, if any.
        message: Option<String>,
    },

    /// 2xx whose body is not a JSON object.
    #[error("invalid response body")]
    InvalidBody,

    /// Transport-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ApiError {
    /// Whether this error was an authorization failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Text to show the user. Server messages are passed through verbatim;
    /// transport failures show their diagnostic; everything else uses
    /// `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Application { message: Some(m) } | Self::Http { message: Some(m), .. } => {
                m.clone()
            }
            Self::Transport(e) => e.to_string(),
            Self::Unauthorized { .. }
            | Self::Http { message: None, .. }
            | Self::Application { message: None }
            | Self::InvalidBody => fallback.to_string(),
        }
    }

    /// Error category string for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "auth",
            Self::Http { .. } => "http",
            Self::Application { .. } => "application",
            Self::InvalidBody => "parse",
            Self::Transport(_) => "network",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
