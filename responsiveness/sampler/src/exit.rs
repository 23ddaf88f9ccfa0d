//! Shutdown flag shared between the controller and the sampler thread

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// One-way exit flag with an interruptible sleep
///
/// Only the controller raises it; the sampler thread polls it every
/// iteration and sleeps on it between probes, so raising the flag also
/// cuts a pending sleep short.
#[derive(Debug, Default)]
pub struct ExitFlag {
    raised: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

impl ExitFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake a sleeping sampler
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.wake.notify_all();
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Sleep for up to `timeout`, returning early if the flag is raised
    ///
    /// Returns whether the flag is raised on wake-up.
    pub fn sleep(&self, timeout: Duration) -> bool {
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = self
            .wake
            .wait_timeout_while(guard, timeout, |_| !self.is_raised())
            .unwrap_or_else(PoisonError::into_inner);
        self.is_raised()
    }
}
