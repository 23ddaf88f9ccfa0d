//! Foreground Event Loop
//!
//! The measured side of the event tracer: a single-threaded event loop fed
//! through a channel, and a [`RoundTripProbe`](tracer_common::RoundTripProbe)
//! that times how long the loop takes to get to a synthetic event.
//!
//! ## Architecture
//!
//! ```text
//! ChannelProbe::fire_and_wait() -> post Trace(token) to the loop channel
//!                                  |  (waits behind queued tasks)
//!                                  v
//! ForegroundLoop::run()         -> dispatch Trace: token.complete()
//!                                  |
//!                                  v
//! ChannelProbe                  -> waiter wakes, returns Completed
//! ```

pub mod event_loop;
pub mod probe;

pub use event_loop::{ForegroundEvent, ForegroundLoop, LoopHandle, LoopStats, Task};
pub use probe::{ChannelProbe, TraceToken};
