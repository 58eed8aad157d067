//! # Adaptive poller
//!
//! One self-rescheduling refresh loop per list view, modelled as an explicit
//! state machine:
//!
//! ```text
//! STOPPED --start--> RUNNING <--foreground / unblocked--> PAUSED
//!    ^                  |                                    |
//!    +------stop--------+---------------stop-----------------+
//! ```
//!
//! - The first fetch after `start` is [`FetchMode::Visible`]; later ones are
//!   [`FetchMode::Silent`].
//! - Ticks are strictly sequential: the next wait starts only after the
//!   previous fetch settles.
//! - Going to background (or being blocked) cancels the pending wait; coming
//!   back fetches once immediately, then resumes the interval.
//! - `stop` cancels the loop's token. An in-flight fetch is not aborted, but
//!   its result is discarded.
//! - Silent failures are logged at `debug` and swallowed; visible failures
//!   are published as [`PollEvent::FetchFailed`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::SyncError;

/// Whether a fetch shows a loading indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchMode {
    /// First fetch of a view; errors are surfaced.
    Visible,
    /// Background refresh; errors are swallowed.
    Silent,
}

/// Poller lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollState {
    /// Not started, or torn down.
    Stopped,
    /// Fetching or waiting for the next tick.
    Running,
    /// Waiting for foreground / unblock.
    Paused,
}

/// Published by pollers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollEvent {
    /// A fetch result was applied.
    Fetched {
        /// Poller name.
        target: &'static str,
        /// Mode of the fetch.
        mode: FetchMode,
    },
    /// A visible fetch failed.
    FetchFailed {
        /// Poller name.
        target: &'static str,
        /// The failure.
        error: SyncError,
    },
}

/// A list view that can be refreshed.
#[async_trait]
pub trait PollTarget: Send + Sync + 'static {
    /// Fetched payload.
    type Item: Send;

    /// Read from the server. Must not touch view state.
    async fn fetch(&self, mode: FetchMode) -> Result<Self::Item, SyncError>;

    /// Replace view state with a fetched payload.
    fn apply(&self, item: Self::Item);
}

#[derive(Clone, Copy, Debug)]
struct Conditions {
    foreground: bool,
    blocked: bool,
}

impl Conditions {
    fn active(self) -> bool {
        self.foreground && !self.blocked
    }
}

/// Refresh loop for one view.
pub struct AdaptivePoller {
    name: &'static str,
    interval: Duration,
    conditions: watch::Sender<Conditions>,
    state: Arc<watch::Sender<PollState>>,
    events: broadcast::Sender<PollEvent>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl std::fmt::Debug for AdaptivePoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptivePoller")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl AdaptivePoller {
    /// Stopped poller publishing on `events`. Starts in the foreground.
    pub fn new(
        name: &'static str,
        interval: Duration,
        events: broadcast::Sender<PollEvent>,
    ) -> Self {
        let (conditions, _) = watch::channel(Conditions {
            foreground: true,
            blocked: false,
        });
        let (state, _) = watch::channel(PollState::Stopped);
        Self {
            name,
            interval,
            conditions,
            state: Arc::new(state),
            events,
            cancel: Mutex::new(None),
        }
    }

    /// Poller name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current state.
    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    /// Mount: spawn the loop for `target`. No-op if already started.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start<T: PollTarget>(&self, target: Arc<T>) {
        let mut slot = self.cancel.lock();
        if slot.as_ref().is_some_and(|t| !t.is_cancelled()) {
            return;
        }
        let token = CancellationToken::new();
        *slot = Some(token.clone());
        drop(slot);

        let initial = if self.conditions.borrow().active() {
            PollState::Running
        } else {
            PollState::Paused
        };
        let _ = self.state.send_replace(initial);
        debug!(poller = self.name, ?initial, "starting");
        let run = PollLoop {
            name: self.name,
            interval: self.interval,
            conditions: self.conditions.subscribe(),
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            cancel: token,
        };
        let _handle = tokio::spawn(run.run(target));
    }

    /// Tear down: cancel the pending wait and discard any in-flight result.
    pub fn stop(&self) {
        if let Some(token) = self.cancel.lock().take() {
            token.cancel();
            debug!(poller = self.name, "stopped");
        }
        let _ = self.state.send_replace(PollState::Stopped);
    }

    /// Application foreground/background transition.
    pub fn set_foreground(&self, foreground: bool) {
        self.conditions.send_modify(|c| c.foreground = foreground);
    }

    /// Transient UI condition (e.g. a modal) that pauses this poller.
    pub fn set_blocked(&self, blocked: bool) {
        self.conditions.send_modify(|c| c.blocked = blocked);
    }
}

impl Drop for AdaptivePoller {
    fn drop(&mut self) {
        if let Some(token) = self.cancel.get_mut().take() {
            token.cancel();
        }
    }
}

/// Wait until the view's active flag equals `active`. `false` when the
/// poller itself is gone.
async fn until(conditions: &mut watch::Receiver<Conditions>, active: bool) -> bool {
    conditions.wait_for(|c| c.active() == active).await.is_ok()
}

struct PollLoop {
    name: &'static str,
    interval: Duration,
    conditions: watch::Receiver<Conditions>,
    state: Arc<watch::Sender<PollState>>,
    events: broadcast::Sender<PollEvent>,
    cancel: CancellationToken,
}

impl PollLoop {
    /// Publish `next` unless the loop has been cancelled; `stop` owns the
    /// final `Stopped` transition.
    fn transition(&self, next: PollState) {
        let cancel = &self.cancel;
        let _ = self.state.send_if_modified(|s| {
            if cancel.is_cancelled() || *s == next {
                return false;
            }
            *s = next;
            true
        });
    }

    async fn run<T: PollTarget>(mut self, target: Arc<T>) {
        let mut mode = FetchMode::Visible;
        loop {
            if !self.conditions.borrow().active() {
                self.transition(PollState::Paused);
                debug!(poller = self.name, "paused");
                tokio::select! {
                    () = self.cancel.cancelled() => break,
                    open = until(&mut self.conditions, true) => {
                        if !open {
                            break;
                        }
                    }
                }
                debug!(poller = self.name, "resumed");
            }
            if self.cancel.is_cancelled() {
                break;
            }
            self.transition(PollState::Running);

            let result = target.fetch(mode).await;
            if self.cancel.is_cancelled() {
                debug!(poller = self.name, "discarding result fetched after teardown");
                break;
            }
            self.settle(&*target, mode, result);
            mode = FetchMode::Silent;

            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
                open = until(&mut self.conditions, false) => {
                    if !open {
                        break;
                    }
                }
            }
        }
    }

    fn settle<T: PollTarget>(
        &self,
        target: &T,
        mode: FetchMode,
        result: Result<T::Item, SyncError>,
    ) {
        match result {
            Ok(item) => {
                target.apply(item);
                let _ = self.events.send(PollEvent::Fetched {
                    target: self.name,
                    mode,
                });
            }
            Err(error) if mode == FetchMode::Visible => {
                warn!(poller = self.name, error = %error, "fetch failed");
                let _ = self.events.send(PollEvent::FetchFailed {
                    target: self.name,
                    error,
                });
            }
            Err(error) => {
                debug!(poller = self.name, error = %error, "silent fetch failed");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
