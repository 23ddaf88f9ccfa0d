//! Channel-based round-trip probe
//!
//! Posts a [`TraceToken`] into the foreground loop and parks the calling
//! thread on a condition variable until the loop completes the token or the
//! probe is interrupted.

use crate::event_loop::{ForegroundEvent, LoopHandle};
use anyhow::{Context, Result};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracer_common::{ProbeOutcome, RoundTripProbe};

#[derive(Debug, Default)]
struct WaitState {
    /// Highest token sequence number serviced so far
    serviced: u64,
    /// Highest token sequence number dropped without being serviced
    abandoned: u64,
    /// Sticky until the next `init`
    interrupted: bool,
}

#[derive(Debug, Default)]
struct TraceSignal {
    state: Mutex<WaitState>,
    cond: Condvar,
}

impl TraceSignal {
    fn lock(&self) -> MutexGuard<'_, WaitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Probe event travelling through the foreground loop
///
/// Dropping a token without completing it, e.g. when the loop shuts down
/// with the token still queued, wakes its waiter with `Interrupted`.
pub struct TraceToken {
    seq: u64,
    signal: Arc<TraceSignal>,
    completed: bool,
}

impl TraceToken {
    fn new(seq: u64, signal: Arc<TraceSignal>) -> Self {
        Self {
            seq,
            signal,
            completed: false,
        }
    }

    /// Mark the probe serviced and wake its waiter
    pub fn complete(mut self) {
        self.completed = true;
        let mut state = self.signal.lock();
        state.serviced = state.serviced.max(self.seq);
        self.signal.cond.notify_all();
    }
}

impl Drop for TraceToken {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let mut state = self.signal.lock();
        state.abandoned = state.abandoned.max(self.seq);
        self.signal.cond.notify_all();
    }
}

/// [`RoundTripProbe`] backed by a [`ForegroundLoop`](crate::ForegroundLoop) channel
pub struct ChannelProbe {
    handle: LoopHandle,
    signal: Arc<TraceSignal>,
    next_seq: AtomicU64,
}

impl ChannelProbe {
    pub fn new(handle: LoopHandle) -> Self {
        Self {
            handle,
            signal: Arc::new(TraceSignal::default()),
            next_seq: AtomicU64::new(0),
        }
    }
}

impl RoundTripProbe for ChannelProbe {
    fn init(&self) -> Result<()> {
        self.signal.lock().interrupted = false;

        // A no-op task doubles as a liveness check on the loop
        self.handle
            .post(|| {})
            .context("Failed to reach the foreground loop")?;

        debug!("Channel probe initialized");
        Ok(())
    }

    fn fire_and_wait(&self) -> ProbeOutcome {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;

        if self.signal.lock().interrupted {
            return ProbeOutcome::Interrupted;
        }

        let token = TraceToken::new(seq, Arc::clone(&self.signal));
        if self.handle.send(ForegroundEvent::Trace(token)).is_err() {
            debug!("Foreground loop closed, probe {} not delivered", seq);
            return ProbeOutcome::Interrupted;
        }

        let guard = self.signal.lock();
        let state = self
            .signal
            .cond
            .wait_while(guard, |s| {
                s.serviced < seq && s.abandoned < seq && !s.interrupted
            })
            .unwrap_or_else(PoisonError::into_inner);

        if state.serviced >= seq {
            ProbeOutcome::Completed
        } else {
            ProbeOutcome::Interrupted
        }
    }

    fn interrupt(&self) {
        let mut state = self.signal.lock();
        state.interrupted = true;
        self.signal.cond.notify_all();
    }

    fn cleanup(&self) {
        debug!(
            "Channel probe released after {} probes",
            self.next_seq.load(Ordering::Relaxed)
        );
    }
}
