//! Unauthorized-event bus.
//!
//! Delivery is synchronous and in subscription order. The listener set is
//! snapshotted before delivery starts, so listeners added from inside a
//! callback only see later events. A panicking listener is logged and skipped.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, warn};

type Listener = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Publish/subscribe channel for forced-logout reasons.
#[derive(Clone, Default)]
pub struct UnauthorizedBus {
    inner: Arc<Mutex<Listeners>>,
}

impl std::fmt::Debug for UnauthorizedBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnauthorizedBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl UnauthorizedBus {
    /// Empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until the returned handle is
    /// dropped or [`Subscription::unsubscribe`] is called.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, listener: impl Fn(&str) + Send + Sync + 'static) -> Subscription {
        let mut listeners = self.inner.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription {
            bus: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Deliver `reason` to every current subscriber.
    pub fn emit(&self, reason: &str) {
        let snapshot: Vec<Listener> = self
            .inner
            .lock()
            .entries
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        debug!(subscribers = snapshot.len(), reason, "broadcasting unauthorized");

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(reason))).is_err() {
                warn!("unauthorized listener panicked");
            }
        }
    }

    /// Number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().entries.len()
    }
}

/// RAII registration on an [`UnauthorizedBus`].
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<Mutex<Listeners>>,
    id: u64,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
