//! Report type definitions
//!
//! Data structures describing one sampler run, built by the collector when
//! the sampler thread exits and handed to the exporters.
//!
//! ## Organization
//!
//! - **Shared Types**: re-exported from tracer_common (`Sample`, `ProbeOutcome`)
//! - **Report Types**: used only here, for aggregation and export

use serde::{Deserialize, Serialize};
use tracer_common::{
    HISTOGRAM_BUCKET_100MS, HISTOGRAM_BUCKET_10MS, HISTOGRAM_BUCKET_1MS, HISTOGRAM_BUCKET_50MS,
    HISTOGRAM_BUCKET_5MS,
};

pub use tracer_common::{ProbeOutcome, Sample};

/// Summary of one start/stop cycle of the sampler
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResponsivenessReport {
    /// ISO 8601 timestamp when the report was generated
    pub timestamp: String,
    /// Wall time the sampler ran, in seconds
    pub duration_seconds: u64,
    /// Reporting threshold in effect, in milliseconds
    pub threshold_ms: u64,
    /// Sampling interval in effect, in milliseconds
    pub interval_ms: u64,
    /// Probes the foreground loop serviced
    pub completed_probes: u64,
    /// Probes cut short by shutdown
    pub interrupted_probes: u64,
    /// Probes above the threshold
    pub reported_samples: u64,
    /// Round-trip time statistics in milliseconds
    pub round_trip: RoundTripStats,
    /// Round-trip time histogram
    pub histogram: LatencyHistogram,
    /// Round-trip time percentiles in milliseconds
    pub percentiles: Percentiles,
}

/// Aggregate round-trip times
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct RoundTripStats {
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
    pub std_dev_ms: f64,
}

/// Round-trip histogram buckets
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct LatencyHistogram {
    /// 0-1ms bucket
    #[serde(rename = "0-1ms")]
    pub bucket_0_1ms: u64,
    /// 1-5ms bucket
    #[serde(rename = "1-5ms")]
    pub bucket_1_5ms: u64,
    /// 5-10ms bucket
    #[serde(rename = "5-10ms")]
    pub bucket_5_10ms: u64,
    /// 10-50ms bucket
    #[serde(rename = "10-50ms")]
    pub bucket_10_50ms: u64,
    /// 50-100ms bucket
    #[serde(rename = "50-100ms")]
    pub bucket_50_100ms: u64,
    /// 100ms+ bucket
    #[serde(rename = "100ms+")]
    pub bucket_100ms_plus: u64,
}

impl LatencyHistogram {
    /// Add a round-trip time to the appropriate bucket
    ///
    /// # Arguments
    ///
    /// * `latency_ms` - Round-trip time in milliseconds
    pub fn add_sample(&mut self, latency_ms: f64) {
        match latency_ms {
            l if l < HISTOGRAM_BUCKET_1MS => self.bucket_0_1ms += 1,
            l if l < HISTOGRAM_BUCKET_5MS => self.bucket_1_5ms += 1,
            l if l < HISTOGRAM_BUCKET_10MS => self.bucket_5_10ms += 1,
            l if l < HISTOGRAM_BUCKET_50MS => self.bucket_10_50ms += 1,
            l if l < HISTOGRAM_BUCKET_100MS => self.bucket_50_100ms += 1,
            _ => self.bucket_100ms_plus += 1,
        }
    }

    /// Get total count across all buckets
    pub fn total_count(&self) -> u64 {
        self.bucket_0_1ms
            + self.bucket_1_5ms
            + self.bucket_5_10ms
            + self.bucket_10_50ms
            + self.bucket_50_100ms
            + self.bucket_100ms_plus
    }
}

/// Round-trip percentiles
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct Percentiles {
    /// 50th percentile (median)
    pub p50: f64,
    /// 75th percentile
    pub p75: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
    /// 99.9th percentile
    pub p999: f64,
}

/// Calculate percentiles from a vector of samples
///
/// # Arguments
///
/// * `samples` - Vector of values (sorted in place)
///
/// # Returns
///
/// Percentiles structure with p50, p75, p90, p95, p99, p999
pub fn calculate_percentiles(mut samples: Vec<f64>) -> Percentiles {
    if samples.is_empty() {
        return Percentiles::default();
    }

    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let len = samples.len();

    // Nearest-rank on a per-mille scale
    let per_mille = |p: usize| {
        let rank = (len * p).div_ceil(1000);
        samples[rank.saturating_sub(1).min(len - 1)]
    };

    Percentiles {
        p50: per_mille(500),
        p75: per_mille(750),
        p90: per_mille(900),
        p95: per_mille(950),
        p99: per_mille(990),
        p999: per_mille(999),
    }
}

/// Calculate population standard deviation
pub fn calculate_std_dev(samples: &[f64], mean: f64) -> f64 {
    if samples.len() <= 1 {
        return 0.0;
    }

    let variance: f64 = samples
        .iter()
        .map(|x| (x - mean).powi(2))
        .sum::<f64>()
        / samples.len() as f64;
    variance.sqrt()
}
