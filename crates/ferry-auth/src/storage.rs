//! Credential storage.
//!
//! Session state is a handful of string keys. [`FileCredentialStore`] keeps
//! them in a JSON file written with 0o600 permissions;
//! [`MemoryCredentialStore`] is the non-persistent variant for tests and
//! ephemeral sessions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::AuthError;

/// Key holding the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Every key a signed-in session may leave behind. All are cleared on logout.
pub const SESSION_KEYS: &[&str] = &[
    TOKEN_KEY,
    "auth_token",
    "access_token",
    "jwt",
    "user",
    "auth_user",
];

/// Current on-disk format version.
const STORE_VERSION: u32 = 1;

/// Key/value persistence for session state.
pub trait CredentialStore: Send + Sync {
    /// Read a key.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a key.
    fn set(&self, key: &str, value: &str) -> Result<(), AuthError>;

    /// Remove keys. Missing keys are not an error.
    fn remove(&self, keys: &[&str]) -> Result<(), AuthError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory
// ─────────────────────────────────────────────────────────────────────────────

/// Non-persistent store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryCredentialStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let _ = self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<(), AuthError> {
        let mut entries = self.entries.lock();
        for key in keys {
            let _ = entries.remove(*key);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File-backed
// ─────────────────────────────────────────────────────────────────────────────

/// On-disk layout.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreFile {
    version: u32,
    last_updated: String,
    entries: BTreeMap<String, String>,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            last_updated: String::new(),
            entries: BTreeMap::new(),
        }
    }
}

/// JSON file store (`~/.ferry/session.json` by convention).
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Default file name under the data directory.
    pub const FILE_NAME: &'static str = "session.json";

    /// Store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at [`Self::FILE_NAME`] under `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(Self::FILE_NAME))
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file. Missing, unreadable, or unsupported files read as empty.
    fn load(&self) -> StoreFile {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StoreFile::default(),
            Err(e) => {
                tracing::warn!(path = ?self.path, "failed to read credential file: {e}");
                return StoreFile::default();
            }
        };

        match serde_json::from_str::<StoreFile>(&data) {
            Ok(file) if file.version == STORE_VERSION => file,
            Ok(file) => {
                tracing::warn!("{}", AuthError::UnsupportedVersion(file.version));
                StoreFile::default()
            }
            Err(e) => {
                tracing::warn!(path = ?self.path, "failed to parse credential file: {e}");
                StoreFile::default()
            }
        }
    }

    fn save(&self, file: &mut StoreFile) -> Result<(), AuthError> {
        file.last_updated = chrono::Utc::now().to_rfc3339();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(file)?;
        std::fs::write(&self.path, &json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&self.path, perms);
        }

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.load().entries.remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let _guard = self.write_lock.lock();
        let mut file = self.load();
        let _ = file.entries.insert(key.to_string(), value.to_string());
        self.save(&mut file)
    }

    fn remove(&self, keys: &[&str]) -> Result<(), AuthError> {
        let _guard = self.write_lock.lock();
        let mut file = self.load();
        let before = file.entries.len();
        file.entries.retain(|k, _| !keys.contains(&k.as_str()));
        if file.entries.len() == before {
            return Ok(());
        }
        self.save(&mut file)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
