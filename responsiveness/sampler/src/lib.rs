//! Event Loop Responsiveness Sampler
//!
//! Measures how quickly a foreground event loop services a synthetic
//! round-trip probe fired from a background thread, and writes every
//! sample that exceeds a threshold to a trace sink.

pub mod collector;
pub mod config;
pub mod exit;
pub mod exporter;
pub mod lifecycle;
pub mod logger;
pub mod sampler;
pub mod types;

#[cfg(test)]
mod testing;

pub use collector::MetricsCollector;
pub use config::{LogSink, SamplerConfig};
pub use exit::ExitFlag;
pub use exporter::{ExporterType, JsonExporter, MetricsExporter, PrometheusExporter};
pub use lifecycle::EventTracer;
pub use logger::SampleLogger;
pub use sampler::{NoopObserver, ResponsivenessObserver};
pub use types::*;
