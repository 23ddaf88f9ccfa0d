//! Round-trip probe contract
//!
//! The sampler never talks to the foreground loop directly. It goes through
//! an implementation of [`RoundTripProbe`], which knows how to post a
//! synthetic event into the loop and block until it has been serviced.

use crate::types::ProbeOutcome;
use anyhow::Result;

/// Injects a synthetic event into a foreground loop and waits for it
///
/// ## Lifecycle
///
/// ```text
/// init()  ->  fire_and_wait() ... fire_and_wait()  ->  interrupt()  ->  cleanup()
///  (start)          (sampler thread, repeatedly)         (stop)          (stop, after join)
/// ```
///
/// `fire_and_wait` runs on the sampler thread while `interrupt` is called
/// from the controlling thread, so implementations must be `Send + Sync`.
pub trait RoundTripProbe: Send + Sync + 'static {
    /// Prepare the round-trip mechanism. Called before the sampler thread
    /// is spawned; an error aborts the start.
    fn init(&self) -> Result<()>;

    /// Post one probe event and block until the foreground loop has
    /// serviced it, or until [`interrupt`](Self::interrupt) is called.
    fn fire_and_wait(&self) -> ProbeOutcome;

    /// Unblock a thread waiting in `fire_and_wait`.
    ///
    /// Must stay in effect until the next `init`: a `fire_and_wait` that
    /// begins after `interrupt` returns `Interrupted` immediately.
    fn interrupt(&self);

    /// Release whatever `init` acquired. Called once the sampler thread has
    /// been joined.
    fn cleanup(&self);
}
