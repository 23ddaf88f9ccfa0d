//! Shared types and utilities for the event tracer
//!
//! This crate provides the constants, data structures, and the round-trip
//! probe contract shared between the foreground event loop and the
//! responsiveness sampler.

pub mod constants;
pub mod probe;
pub mod types;

// Re-export commonly used types
pub use constants::*;
pub use probe::RoundTripProbe;
pub use types::{round_to_millis, ProbeOutcome, Sample};
