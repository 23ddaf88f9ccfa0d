//! Round-trip statistics
//!
//! Aggregates every probe the sampler thread runs. The collector lives on
//! the sampler thread and is turned into a report when the thread exits, so
//! it needs no synchronization.

use crate::types::*;
use std::collections::VecDeque;
use std::time::Duration;
use tracer_common::{round_to_millis, MAX_RETAINED_DURATIONS};

/// Metrics collector for probe round trips
#[derive(Debug)]
pub struct MetricsCollector {
    /// Most recent round-trip times in ms (for percentiles and std dev)
    recent: VecDeque<f64>,
    /// Round-trip histogram over the whole run
    histogram: LatencyHistogram,
    completed: u64,
    interrupted: u64,
    reported: u64,
    sum_ms: f64,
    min_ms: f64,
    max_ms: f64,
    retain: usize,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::with_retention(MAX_RETAINED_DURATIONS)
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector that keeps at most `retain` recent durations
    pub fn with_retention(retain: usize) -> Self {
        Self {
            recent: VecDeque::new(),
            histogram: LatencyHistogram::default(),
            completed: 0,
            interrupted: 0,
            reported: 0,
            sum_ms: 0.0,
            min_ms: f64::INFINITY,
            max_ms: f64::NEG_INFINITY,
            retain: retain.max(1),
        }
    }

    /// Add a completed round trip
    ///
    /// # Arguments
    ///
    /// * `duration` - Measured round-trip time
    /// * `reported` - Whether it exceeded the threshold and was logged
    pub fn record_completed(&mut self, duration: Duration, reported: bool) {
        let ms = duration.as_nanos() as f64 / 1_000_000.0;

        if self.recent.len() == self.retain {
            self.recent.pop_front();
        }
        self.recent.push_back(ms);

        self.histogram.add_sample(ms);
        self.sum_ms += ms;
        self.min_ms = self.min_ms.min(ms);
        self.max_ms = self.max_ms.max(ms);
        self.completed += 1;
        if reported {
            self.reported += 1;
        }
    }

    /// Count a probe that was cut short
    pub fn record_interrupted(&mut self) {
        self.interrupted += 1;
    }

    /// Generate the run report
    ///
    /// Min, max, and average cover the whole run; percentiles and standard
    /// deviation cover the retained window.
    pub fn generate_report(
        &self,
        elapsed: Duration,
        threshold: Duration,
        interval: Duration,
    ) -> ResponsivenessReport {
        let round_trip = if self.completed == 0 {
            RoundTripStats::default()
        } else {
            let window: Vec<f64> = self.recent.iter().copied().collect();
            let window_mean = window.iter().sum::<f64>() / window.len() as f64;
            RoundTripStats {
                min_ms: self.min_ms,
                max_ms: self.max_ms,
                avg_ms: self.sum_ms / self.completed as f64,
                std_dev_ms: calculate_std_dev(&window, window_mean),
            }
        };

        ResponsivenessReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            duration_seconds: elapsed.as_secs(),
            threshold_ms: round_to_millis(threshold),
            interval_ms: round_to_millis(interval),
            completed_probes: self.completed,
            interrupted_probes: self.interrupted,
            reported_samples: self.reported,
            round_trip,
            histogram: self.histogram.clone(),
            percentiles: calculate_percentiles(self.recent.iter().copied().collect()),
        }
    }

    pub fn completed_count(&self) -> u64 {
        self.completed
    }

    pub fn interrupted_count(&self) -> u64 {
        self.interrupted
    }

    pub fn reported_count(&self) -> u64 {
        self.reported
    }
}
