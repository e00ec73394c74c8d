//! Mount guard for views that remount on page mutations

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Mount cycle state of a view instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Idle,
    InFlight,
}

/// Allows at most one mount cycle per view at a time.
///
/// Requests arriving while a cycle is in flight are dropped, never queued.
#[derive(Debug, Clone, Default)]
pub struct MountGuard {
    in_flight: Arc<AtomicBool>,
}

impl MountGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MountState {
        if self.in_flight.load(Ordering::Acquire) {
            MountState::InFlight
        } else {
            MountState::Idle
        }
    }

    /// Move `Idle -> InFlight`. Returns `None` if a cycle is already running.
    pub fn try_begin(&self) -> Option<InFlight> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight {
                flag: Arc::clone(&self.in_flight),
            })
    }
}

/// Ticket for a running cycle. Dropping it settles the cycle back to `Idle`,
/// whether the cycle rendered, failed or panicked.
#[derive(Debug)]
pub struct InFlight {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
