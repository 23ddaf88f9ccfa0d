//! Shared constants for the event tracer
//!
//! These constants are used by both the foreground loop and the sampler
//! to keep defaults, environment keys, and output formats consistent.

// ============================================================================
// Environment Overrides
// ============================================================================

/// File path that receives trace lines instead of stdout
pub const ENV_OUTPUT: &str = "MOZ_INSTRUMENT_EVENT_LOOP_OUTPUT";

/// Reporting threshold override, integer milliseconds
pub const ENV_THRESHOLD: &str = "MOZ_INSTRUMENT_EVENT_LOOP_THRESHOLD";

/// Sampling interval override, integer milliseconds
pub const ENV_INTERVAL: &str = "MOZ_INSTRUMENT_EVENT_LOOP_INTERVAL";

// ============================================================================
// Sampler Defaults
// ============================================================================

/// Default reporting threshold. Probes serviced within this many
/// milliseconds are not reported.
pub const DEFAULT_THRESHOLD_MS: u64 = 20;

/// Default sampling interval. Two probes are never fired less than this
/// many milliseconds apart.
pub const DEFAULT_INTERVAL_MS: u64 = 10;

/// Name given to the background sampler thread
pub const SAMPLER_THREAD_NAME: &str = "Event Tracer";

// ============================================================================
// Trace Output
// ============================================================================

/// Prefix of every line written to the trace sink
pub const TRACE_PREFIX: &str = "MOZ_EVENT_TRACE";

// ============================================================================
// Histogram Buckets (in milliseconds)
// ============================================================================

/// Histogram bucket boundary: 0-1ms
pub const HISTOGRAM_BUCKET_1MS: f64 = 1.0;

/// Histogram bucket boundary: 1-5ms
pub const HISTOGRAM_BUCKET_5MS: f64 = 5.0;

/// Histogram bucket boundary: 5-10ms
pub const HISTOGRAM_BUCKET_10MS: f64 = 10.0;

/// Histogram bucket boundary: 10-50ms
pub const HISTOGRAM_BUCKET_50MS: f64 = 50.0;

/// Histogram bucket boundary: 50-100ms
pub const HISTOGRAM_BUCKET_100MS: f64 = 100.0;

// ============================================================================
// Statistics
// ============================================================================

/// Number of most recent probe durations kept for percentile calculation
pub const MAX_RETAINED_DURATIONS: usize = 65_536;
