//! Credential store failures.

/// Failure reading or writing the persisted session.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The credential file is not valid JSON.
    #[error("corrupt credential file: {0}")]
    Json(#[from] serde_json::Error),

    /// The credential file could not be read or written.
    #[error("credential file unavailable: {0}")]
    Io(#[from] std::io::Error),

    /// Stored credentials use a format this client does not understand.
    #[error("unsupported credential store version: {0}")]
    UnsupportedVersion(u32),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
