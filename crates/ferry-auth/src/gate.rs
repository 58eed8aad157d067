//! Session gate.
//!
//! Holds the bearer token (present or absent) and routes authorization
//! failures into a single forced-logout broadcast.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::bus::{Subscription, UnauthorizedBus};
use crate::errors::AuthError;
use crate::storage::{CredentialStore, SESSION_KEYS, TOKEN_KEY};

/// Reason broadcast when an authorization failure carries no message.
pub const DEFAULT_UNAUTHORIZED_REASON: &str = "Please sign in again.";

/// Token holder and forced-logout broadcaster.
pub struct SessionGate {
    token: RwLock<Option<String>>,
    store: Arc<dyn CredentialStore>,
    bus: UnauthorizedBus,
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("authenticated", &self.is_authenticated())
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl SessionGate {
    /// Signed-out gate.
    pub fn new(store: Arc<dyn CredentialStore>, bus: UnauthorizedBus) -> Self {
        Self {
            token: RwLock::new(None),
            store,
            bus,
        }
    }

    /// Gate seeded from a previously persisted token.
    pub fn restore(store: Arc<dyn CredentialStore>, bus: UnauthorizedBus) -> Self {
        let token = store.get(TOKEN_KEY).filter(|t| !t.trim().is_empty());
        if token.is_some() {
            info!("restored persisted session");
        }
        Self {
            token: RwLock::new(token),
            store,
            bus,
        }
    }

    /// Whether a token is present.
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Current token, if any.
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Sign in: keep `token` in memory and persist it.
    pub fn set_session(&self, token: impl Into<String>) -> Result<(), AuthError> {
        let token = token.into();
        self.store.set(TOKEN_KEY, &token)?;
        *self.token.write() = Some(token);
        info!("session started");
        Ok(())
    }

    /// Sign out: forget the token in memory and in storage.
    pub fn clear_session(&self) -> Result<(), AuthError> {
        *self.token.write() = None;
        self.store.remove(&[TOKEN_KEY])
    }

    /// Remove every session key from storage.
    pub fn clear_stored_keys(&self) -> Result<(), AuthError> {
        self.store.remove(SESSION_KEYS)
    }

    /// Listen for forced logouts.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, listener: impl Fn(&str) + Send + Sync + 'static) -> Subscription {
        self.bus.subscribe(listener)
    }

    /// The bus this gate broadcasts on.
    pub fn bus(&self) -> &UnauthorizedBus {
        &self.bus
    }

    /// Handle a 401/403: clear the token, then broadcast exactly once.
    ///
    /// Blank reasons fall back to [`DEFAULT_UNAUTHORIZED_REASON`].
    pub fn report_unauthorized(&self, reason: Option<&str>) {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_UNAUTHORIZED_REASON);

        *self.token.write() = None;
        if let Err(e) = self.store.remove(&[TOKEN_KEY]) {
            warn!(error = %e, "failed to clear persisted token");
        }
        info!(reason, "session rejected by server");
        self.bus.emit(reason);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCredentialStore;
    use parking_lot::Mutex;

    fn gate() -> (SessionGate, Arc<MemoryCredentialStore>) {
        let store = Arc::new(MemoryCredentialStore::new());
        let gate = SessionGate::new(store.clone(), UnauthorizedBus::new());
        (gate, store)
    }

    #[test]
    fn set_and_clear_session() {
        let (gate, store) = gate();
        assert!(!gate.is_authenticated());
        gate.set_session("tok").unwrap();
        assert!(gate.is_authenticated());
        assert_eq!(gate.token().as_deref(), Some("tok"));
        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("tok"));

        gate.clear_session().unwrap();
        assert!(!gate.is_authenticated());
        assert_eq!(store.get(TOKEN_KEY), None);
    }

    #[test]
    fn restore_reads_persisted_token() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.set(TOKEN_KEY, "saved").unwrap();
        let gate = SessionGate::restore(store, UnauthorizedBus::new());
        assert_eq!(gate.token().as_deref(), Some("saved"));
    }

    #[test]
    fn restore_ignores_blank_token() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.set(TOKEN_KEY, "  ").unwrap();
        assert!(!SessionGate::restore(store, UnauthorizedBus::new()).is_authenticated());
    }

    #[test]
    fn unauthorized_clears_token_then_broadcasts_once() {
        let (gate, store) = gate();
        gate.set_session("tok").unwrap();
        let gate = Arc::new(gate);

        let seen: Arc<Mutex<Vec<(String, bool)>>> = Arc::default();
        let _sub = {
            let seen = Arc::clone(&seen);
            let weak = Arc::downgrade(&gate);
            gate.subscribe(move |reason| {
                let authed = weak.upgrade().is_some_and(|g| g.is_authenticated());
                seen.lock().push((reason.to_string(), authed));
            })
        };

        gate.report_unauthorized(Some("Session expired"));
        assert_eq!(*seen.lock(), vec![("Session expired".to_string(), false)]);
        assert!(!gate.is_authenticated());
        assert_eq!(store.get(TOKEN_KEY), None);
    }

    #[test]
    fn unauthorized_without_reason_uses_default() {
        let (gate, _) = gate();
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let _sub = {
            let seen = Arc::clone(&seen);
            gate.subscribe(move |r| seen.lock().push(r.to_string()))
        };
        gate.report_unauthorized(None);
        gate.report_unauthorized(Some(" "));
        assert_eq!(
            *seen.lock(),
            vec![DEFAULT_UNAUTHORIZED_REASON, DEFAULT_UNAUTHORIZED_REASON]
        );
    }

    #[test]
    fn clear_stored_keys_removes_all_session_keys() {
        let (gate, store) = gate();
        for key in SESSION_KEYS {
            store.set(key, "v").unwrap();
        }
        store.set("locale", "tr").unwrap();
        gate.clear_stored_keys().unwrap();
        assert!(SESSION_KEYS.iter().all(|k| store.get(k).is_none()));
        assert_eq!(store.get("locale").as_deref(), Some("tr"));
    }
}
