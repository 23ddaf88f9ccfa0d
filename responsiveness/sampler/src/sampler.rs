//! Sampler loop
//!
//! Runs on the background thread. Each iteration fires one probe at the
//! foreground loop, times the round trip, reports it if it crossed the
//! threshold, and sleeps for whatever is left of the sampling interval.
//!
//! ## Pacing
//!
//! ```text
//! |<------------- sample_interval ------------->|
//! |<-- round trip -->|<------- sleep --------->|  next probe
//!
//! |<------------- sample_interval ------------->|
//! |<------------------ round trip ------------------>|  next probe, no sleep
//! ```
//!
//! A loop that is already slow is never front-run: the next probe waits
//! for the previous one, so probes never queue up behind each other.

use crate::{
    collector::MetricsCollector,
    config::SamplerConfig,
    exit::ExitFlag,
    logger::{now_millis, SampleLogger},
    types::ResponsivenessReport,
};
use log::debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracer_common::{ProbeOutcome, RoundTripProbe, Sample};

/// Hook notified at the start of every probe
///
/// Meant for an external profiler that wants to line its own timeline up
/// with the sampler's probes. Called on the sampler thread; must not block.
pub trait ResponsivenessObserver: Send + Sync {
    fn on_probe_start(&self, start: Instant);
}

/// Observer that ignores every probe
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ResponsivenessObserver for NoopObserver {
    fn on_probe_start(&self, _start: Instant) {}
}

/// Time to wait before the next probe: `max(0, interval - elapsed)`
pub fn next_sleep(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

/// The measurement loop and everything it owns for its lifetime
pub struct SamplerLoop<P: RoundTripProbe> {
    probe: Arc<P>,
    observer: Arc<dyn ResponsivenessObserver>,
    exit: Arc<ExitFlag>,
    logger: SampleLogger,
    report_threshold: Duration,
    sample_interval: Duration,
    collector: MetricsCollector,
}

impl<P: RoundTripProbe> SamplerLoop<P> {
    pub fn new(
        config: SamplerConfig,
        probe: Arc<P>,
        observer: Arc<dyn ResponsivenessObserver>,
        exit: Arc<ExitFlag>,
    ) -> Self {
        Self {
            probe,
            observer,
            exit,
            logger: SampleLogger::new(config.sink, config.logging_enabled),
            report_threshold: config.report_threshold,
            sample_interval: config.sample_interval,
            collector: MetricsCollector::new(),
        }
    }

    /// Sample until the exit flag is raised, then write the stop line,
    /// close the sink, and return the run report
    pub fn run(mut self) -> ResponsivenessReport {
        let started = Instant::now();
        self.logger.log_start(now_millis());

        while !self.exit.is_raised() {
            let sleep_for = self.sample_once();
            if !sleep_for.is_zero() && !self.exit.is_raised() {
                self.exit.sleep(sleep_for);
            }
        }

        self.logger.log_stop(now_millis());

        let report = self.collector.generate_report(
            started.elapsed(),
            self.report_threshold,
            self.sample_interval,
        );
        debug!(
            "Sampler loop exiting: {} probes, {} above threshold, {} interrupted",
            report.completed_probes, report.reported_samples, report.interrupted_probes
        );

        self.logger.close();
        report
    }

    /// Run one probe and return how long to sleep before the next
    fn sample_once(&mut self) -> Duration {
        let start = Instant::now();
        self.observer.on_probe_start(start);

        match self.probe.fire_and_wait() {
            ProbeOutcome::Completed => {
                let duration = start.elapsed();
                let exceeded = duration > self.report_threshold;
                if exceeded && self.logger.is_enabled() {
                    self.logger.log_sample(&Sample::new(now_millis(), duration));
                }
                self.collector.record_completed(duration, exceeded);
                next_sleep(self.sample_interval, duration)
            }
            ProbeOutcome::Interrupted => {
                self.collector.record_interrupted();
                self.sample_interval
            }
        }
    }
}
