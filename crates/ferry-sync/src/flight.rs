//! Single-flight guard.
//!
//! At most one operation of a kind runs at a time. A second attempt while the
//! first is pending is dropped, not queued.

use std::sync::atomic::{AtomicBool, Ordering};

/// One in-flight slot.
#[derive(Debug, Default)]
pub struct SingleFlight {
    busy: AtomicBool,
}

impl SingleFlight {
    /// Free slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the slot, or `None` when it is already taken.
    pub fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { flight: self })
    }

    /// Whether an operation holds the slot.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Holds the slot until dropped.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    flight: &'a SingleFlight,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flight.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let flight = SingleFlight::new();
        let guard = flight.try_acquire().unwrap();
        assert!(flight.is_busy());
        assert!(flight.try_acquire().is_none());
        drop(guard);
        assert!(!flight.is_busy());
        assert!(flight.try_acquire().is_some());
    }

    #[test]
    fn guard_released_on_panic_unwind() {
        let flight = SingleFlight::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = flight.try_acquire().unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(!flight.is_busy());
    }
}
