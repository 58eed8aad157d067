//! # Optimistic mutations
//!
//! [`apply_optimistic`] runs one local-first write:
//!
//! 1. take the single-flight slot (or drop the attempt)
//! 2. snapshot the whole state and apply the local patch under one lock
//! 3. await the remote call
//! 4. success: discard the snapshot and run `reconcile` (a re-fetch of
//!    server truth) while still holding the slot
//! 5. failure: put the snapshot back under one lock and return the error
//!
//! Everything a patch can touch must live in the one `Mutex<S>` so the
//! rollback restores it all together. The rollback replaces the whole state,
//! so a poll result applied while the call was in flight is reverted too.
//!
//! An authorization failure skips the rollback. The forced-logout handler has
//! already cleared the state by the time the call returns, and the previous
//! session's data must not come back.

use std::future::Future;

use ferry_client::ApiError;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::errors::SyncError;
use crate::flight::SingleFlight;

/// Result of a guarded mutation that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum MutationOutcome<T> {
    /// The server accepted the write and state was reconciled.
    Applied(T),
    /// Another mutation of the same kind was in flight; nothing happened.
    Dropped,
}

impl<T> MutationOutcome<T> {
    /// Whether the attempt was dropped.
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped)
    }

    /// The server's value, if applied.
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Dropped => None,
        }
    }
}

/// Apply `local_patch` to `state` now, confirm with `remote_call`, then
/// either `reconcile` or roll back.
pub async fn apply_optimistic<S, T, P, R, RF, C, CF>(
    state: &Mutex<S>,
    flight: &SingleFlight,
    local_patch: P,
    remote_call: R,
    reconcile: C,
) -> Result<MutationOutcome<T>, SyncError>
where
    S: Clone,
    P: FnOnce(&mut S),
    R: FnOnce() -> RF,
    RF: Future<Output = Result<T, ApiError>>,
    C: FnOnce() -> CF,
    CF: Future<Output = ()>,
{
    let Some(_guard) = flight.try_acquire() else {
        debug!("mutation already in flight, dropping");
        return Ok(MutationOutcome::Dropped);
    };

    let snapshot = {
        let mut current = state.lock();
        let snapshot = current.clone();
        local_patch(&mut current);
        snapshot
    };

    match remote_call().await {
        Ok(value) => {
            drop(snapshot);
            reconcile().await;
            Ok(MutationOutcome::Applied(value))
        }
        Err(e) if e.is_unauthorized() => {
            debug!("mutation rejected as unauthorized, leaving state to logout");
            Err(SyncError::from(e))
        }
        Err(e) => {
            *state.lock() = snapshot;
            let e = SyncError::from(e);
            warn!(error = %e, "mutation failed, local state rolled back");
            Err(e)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ferry_client::TransportError;
    use proptest::prelude::*;
    use std::time::Duration;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Board {
        list: Vec<u8>,
        detail: Option<u8>,
    }

    fn board() -> Mutex<Board> {
        Mutex::new(Board {
            list: vec![1, 2, 3],
            detail: Some(2),
        })
    }

    #[tokio::test]
    async fn success_reconciles_from_server() {
        let state = board();
        let flight = SingleFlight::new();
        let outcome = apply_optimistic(
            &state,
            &flight,
            |s| s.list[1] = 9,
            || async { Ok::<_, ApiError>("ok") },
            || async {
                *state.lock() = Board {
                    list: vec![7, 7],
                    detail: None,
                };
            },
        )
        .await
        .unwrap();
        assert_eq!(outcome, MutationOutcome::Applied("ok"));
        assert_eq!(state.lock().list, vec![7, 7]);
        assert!(!flight.is_busy());
    }

    #[tokio::test]
    async fn failure_restores_both_parts() {
        let state = board();
        let before = state.lock().clone();
        let flight = SingleFlight::new();
        let reconciled = Mutex::new(false);
        let err = apply_optimistic(
            &state,
            &flight,
            |s| {
                s.list[1] = 9;
                s.detail = Some(9);
            },
            || async {
                Err::<(), _>(ApiError::Application {
                    message: Some("nope".into()),
                })
            },
            || async {
                *reconciled.lock() = true;
            },
        )
        .await
        .unwrap_err();
        assert_matches!(err, SyncError::Application { .. });
        assert!(!*reconciled.lock());
        assert_eq!(*state.lock(), before);
        assert!(!flight.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_attempt_is_dropped() {
        let state = board();
        let flight = SingleFlight::new();
        let calls = Mutex::new(0);

        let slow = apply_optimistic(
            &state,
            &flight,
            |s| s.detail = Some(5),
            || async {
                *calls.lock() += 1;
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, ApiError>(())
            },
            || async {},
        );
        let fast = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            apply_optimistic(
                &state,
                &flight,
                |s| s.detail = Some(6),
                || async {
                    *calls.lock() += 1;
                    Ok::<_, ApiError>(())
                },
                || async {},
            )
            .await
        };

        let (first, second) = tokio::join!(slow, fast);
        assert_eq!(first.unwrap(), MutationOutcome::Applied(()));
        assert!(second.unwrap().is_dropped());
        assert_eq!(*calls.lock(), 1);
        assert_eq!(state.lock().detail, Some(5));
    }

    #[tokio::test]
    async fn transport_failure_releases_guard() {
        let state = board();
        let flight = SingleFlight::new();
        let err = apply_optimistic(
            &state,
            &flight,
            |s| s.list.clear(),
            || async { Err::<(), _>(ApiError::Transport(TransportError::Timeout)) },
            || async {},
        )
        .await
        .unwrap_err();
        assert_matches!(err, SyncError::Transport { .. });
        assert_eq!(state.lock().list, vec![1, 2, 3]);
        assert!(flight.try_acquire().is_some());
    }

    #[tokio::test]
    async fn unauthorized_failure_keeps_state_cleared_by_logout() {
        let state = board();
        let flight = SingleFlight::new();
        let err = apply_optimistic(
            &state,
            &flight,
            |s| s.detail = Some(9),
            || async {
                // The unauthorized listener runs before the call returns.
                *state.lock() = Board::default();
                Err::<(), _>(ApiError::Unauthorized { status: 401 })
            },
            || async {},
        )
        .await
        .unwrap_err();
        assert_eq!(err, SyncError::Unauthorized);
        assert_eq!(*state.lock(), Board::default());
        assert!(!flight.is_busy());
    }

    proptest! {
        #[test]
        fn failed_mutation_leaves_state_untouched(
            list in prop::collection::vec(any::<u8>(), 0..16),
            detail in prop::option::of(any::<u8>()),
            patch in prop::collection::vec((any::<usize>(), any::<u8>()), 1..8),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let state = Mutex::new(Board { list, detail });
            let before = state.lock().clone();
            let flight = SingleFlight::new();
            let result = rt.block_on(apply_optimistic(
                &state,
                &flight,
                |s| {
                    for (i, v) in &patch {
                        if !s.list.is_empty() {
                            let idx = i % s.list.len();
                            s.list[idx] = *v;
                        }
                        s.detail = Some(*v);
                    }
                },
                || async { Err::<(), _>(ApiError::InvalidBody) },
                || async {},
            ));
            prop_assert!(result.is_err());
            prop_assert_eq!(&*state.lock(), &before);
        }
    }
}
