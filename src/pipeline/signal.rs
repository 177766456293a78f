//! One-shot lifecycle signal shared by both run loops.
//!
//! Starts active. [`LifecycleSignal::signal_stop`] clears it exactly once;
//! it is never set again. Loops poll [`is_active`](LifecycleSignal::is_active)
//! at cycle boundaries and sleep through [`wait_for_stop`](LifecycleSignal::wait_for_stop),
//! which wakes immediately when the signal clears.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug)]
pub struct LifecycleSignal {
    active: AtomicBool,
    lock: Mutex<()>,
    stopped: Condvar,
}

impl LifecycleSignal {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
            lock: Mutex::new(()),
            stopped: Condvar::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Clear the signal and wake every waiter.
    ///
    /// Returns `true` for the call that actually cleared it; repeated calls
    /// are no-ops returning `false`.
    pub fn signal_stop(&self) -> bool {
        let was_active = self.active.swap(false, Ordering::SeqCst);
        if was_active {
            // Taking the lock orders the notify after any waiter's check.
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.stopped.notify_all();
        }
        was_active
    }

    /// Sleep up to `timeout`, returning early if the signal clears.
    ///
    /// Returns `true` when the signal is no longer active.
    pub fn wait_for_stop(&self, timeout: Duration) -> bool {
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = self
            .stopped
            .wait_timeout_while(guard, timeout, |_| self.is_active())
            .unwrap_or_else(PoisonError::into_inner);
        !self.is_active()
    }
}

impl Default for LifecycleSignal {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
