//! Sampler lifecycle
//!
//! [`EventTracer`] is the handle the embedding system keeps: it starts the
//! sampler thread, stops it, and guarantees that once `stop` returns the
//! thread is gone and nothing more is written to the trace sink.

use crate::{
    config::SamplerConfig,
    exit::ExitFlag,
    sampler::{NoopObserver, ResponsivenessObserver, SamplerLoop},
    types::ResponsivenessReport,
};
use log::{info, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracer_common::{RoundTripProbe, SAMPLER_THREAD_NAME};

/// A running sampler thread and the flag that stops it
struct Worker {
    exit: Arc<ExitFlag>,
    thread: JoinHandle<ResponsivenessReport>,
}

/// Start/stop handle for the responsiveness sampler
///
/// At most one sampler thread runs per handle. Dropping the handle stops
/// the sampler.
pub struct EventTracer<P: RoundTripProbe> {
    probe: Arc<P>,
    observer: Arc<dyn ResponsivenessObserver>,
    worker: Option<Worker>,
    last_report: Option<ResponsivenessReport>,
}

impl<P: RoundTripProbe> EventTracer<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe: Arc::new(probe),
            observer: Arc::new(NoopObserver),
            worker: None,
            last_report: None,
        }
    }

    /// Install a hook notified at the start of every probe
    ///
    /// Takes effect on the next `start`.
    pub fn with_observer(mut self, observer: Arc<dyn ResponsivenessObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Start sampling, configured from the process environment
    ///
    /// Returns `true` if a sampler is running afterwards. Calling it while
    /// already running is a no-op that returns `true`. The environment is
    /// read once, here; later changes do not affect the running sampler.
    pub fn start(&mut self, logging_enabled: bool) -> bool {
        if self.is_running() {
            return true;
        }
        self.spawn(move || SamplerConfig::from_env(logging_enabled))
    }

    /// Start sampling with an explicit configuration
    ///
    /// Same contract as [`start`](Self::start). When already running the
    /// configuration is dropped unused.
    pub fn start_with_config(&mut self, config: SamplerConfig) -> bool {
        if self.is_running() {
            return true;
        }
        self.spawn(move || config)
    }

    /// Stop sampling and wait for the sampler thread to finish
    ///
    /// No-op when nothing is running.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        worker.exit.raise();
        // The thread may be parked inside a probe waiting on the foreground loop
        self.probe.interrupt();

        match worker.thread.join() {
            Ok(report) => {
                info!(
                    "Event tracer stopped: {} probes, {} above threshold",
                    report.completed_probes, report.reported_samples
                );
                self.last_report = Some(report);
            }
            Err(_) => warn!("Event tracer thread panicked"),
        }

        self.probe.cleanup();
    }

    /// Whether a sampler thread is alive
    ///
    /// A thread that died without `stop` (it panicked) does not count.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.thread.is_finished())
    }

    /// Report from the most recently stopped run
    pub fn last_report(&self) -> Option<&ResponsivenessReport> {
        self.last_report.as_ref()
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    fn spawn<F>(&mut self, resolve: F) -> bool
    where
        F: FnOnce() -> SamplerConfig,
    {
        // Reap a worker whose thread died on its own
        self.stop();

        if let Err(e) = self.probe.init() {
            warn!("Failed to initialize round-trip probe: {:#}", e);
            return false;
        }

        // Resolved only after init succeeds, so a failed start opens no sink
        let config = resolve();
        let threshold = config.report_threshold;
        let interval = config.sample_interval;

        let exit = Arc::new(ExitFlag::new());
        let sampler = SamplerLoop::new(
            config,
            Arc::clone(&self.probe),
            Arc::clone(&self.observer),
            Arc::clone(&exit),
        );

        let spawned = thread::Builder::new()
            .name(SAMPLER_THREAD_NAME.to_string())
            .spawn(move || sampler.run());

        match spawned {
            Ok(thread) => {
                info!(
                    "Event tracer started (threshold {:?}, interval {:?})",
                    threshold, interval
                );
                self.worker = Some(Worker { exit, thread });
                true
            }
            Err(e) => {
                warn!("Failed to spawn {} thread: {}", SAMPLER_THREAD_NAME, e);
                self.probe.cleanup();
                false
            }
        }
    }
}

impl<P: RoundTripProbe> Drop for EventTracer<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogSink;
    use crate::testing::{wait_until, ScriptedProbe, SharedBuffer};
    use foreground_loop::{ChannelProbe, ForegroundLoop};
    use serial_test::serial;
    use std::env;
    use std::sync::atomic::Ordering;
    use std::time::{Duration, Instant};
    use tracer_common::{ENV_INTERVAL, ENV_OUTPUT, ENV_THRESHOLD};

    fn buffered_config(buffer: &SharedBuffer, logging: bool) -> SamplerConfig {
        SamplerConfig::new(logging).with_sink(LogSink::writer(buffer.clone()))
    }

    #[test]
    fn test_start_stop_cycle_writes_start_and_stop() {
        let buffer = SharedBuffer::default();
        let mut tracer =
            EventTracer::new(ScriptedProbe::new(vec![Duration::from_millis(1); 3]));

        assert!(tracer.start_with_config(buffered_config(&buffer, true)));
        assert!(tracer.is_running());
        wait_until(Duration::from_secs(10), || {
            tracer.probe().fires.load(Ordering::SeqCst) >= 4
        });
        tracer.stop();

        assert!(!tracer.is_running());
        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("MOZ_EVENT_TRACE start "));
        assert!(lines[1].starts_with("MOZ_EVENT_TRACE stop "));

        let probe = tracer.probe();
        assert_eq!(probe.inits.load(Ordering::SeqCst), 1);
        assert_eq!(probe.interrupts.load(Ordering::SeqCst), 1);
        assert_eq!(probe.cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(tracer.last_report().unwrap().completed_probes, 3);
    }

    #[test]
    fn test_start_twice_runs_one_sampler() {
        let buffer = SharedBuffer::default();
        let mut tracer = EventTracer::new(ScriptedProbe::hung());

        assert!(tracer.start_with_config(buffered_config(&buffer, true)));
        assert!(tracer.start_with_config(buffered_config(&buffer, true)));
        assert!(tracer.start(true));
        tracer.stop();

        assert_eq!(tracer.probe().inits.load(Ordering::SeqCst), 1);
        let starts = buffer
            .lines()
            .iter()
            .filter(|l| l.starts_with("MOZ_EVENT_TRACE start "))
            .count();
        assert_eq!(starts, 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut tracer = EventTracer::new(ScriptedProbe::hung());
        tracer.stop();

        let buffer = SharedBuffer::default();
        assert!(tracer.start_with_config(buffered_config(&buffer, false)));
        tracer.stop();
        tracer.stop();

        assert_eq!(tracer.probe().interrupts.load(Ordering::SeqCst), 1);
        assert_eq!(tracer.probe().cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_init_leaves_nothing_running() {
        let buffer = SharedBuffer::default();
        let mut tracer = EventTracer::new(ScriptedProbe::failing_init());

        assert!(!tracer.start_with_config(buffered_config(&buffer, true)));
        assert!(!tracer.is_running());
        assert_eq!(tracer.probe().fires.load(Ordering::SeqCst), 0);
        assert!(buffer.contents().is_empty());

        tracer.stop();
        assert_eq!(tracer.probe().cleanups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_disabled_logging_writes_nothing() {
        let buffer = SharedBuffer::default();
        let mut tracer = EventTracer::new(ScriptedProbe::new([Duration::from_millis(50)]));

        assert!(tracer.start_with_config(buffered_config(&buffer, false)));
        wait_until(Duration::from_secs(10), || {
            tracer.probe().fires.load(Ordering::SeqCst) >= 2
        });
        tracer.stop();

        assert!(buffer.contents().is_empty());
        assert_eq!(tracer.last_report().unwrap().reported_samples, 1);
    }

    #[test]
    fn test_stop_unblocks_hung_probe() {
        let buffer = SharedBuffer::default();
        let mut tracer = EventTracer::new(ScriptedProbe::hung());

        assert!(tracer.start_with_config(buffered_config(&buffer, true)));
        wait_until(Duration::from_secs(10), || {
            tracer.probe().fires.load(Ordering::SeqCst) >= 1
        });

        let stopping = Instant::now();
        tracer.stop();
        assert!(stopping.elapsed() < Duration::from_secs(5));

        // Nothing may be written once stop has returned
        let after_stop = buffer.contents();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(buffer.contents(), after_stop);
        assert!(after_stop.ends_with('\n'));
        assert!(buffer.lines().last().unwrap().starts_with("MOZ_EVENT_TRACE stop "));
    }

    #[test]
    fn test_restart_after_stop() {
        let buffer = SharedBuffer::default();
        let mut tracer = EventTracer::new(ScriptedProbe::hung());

        assert!(tracer.start_with_config(buffered_config(&buffer, true)));
        tracer.stop();
        assert!(tracer.start_with_config(buffered_config(&buffer, true)));
        tracer.stop();

        assert_eq!(tracer.probe().inits.load(Ordering::SeqCst), 2);
        assert_eq!(buffer.lines().len(), 4);
    }

    #[test]
    fn test_drop_stops_sampler() {
        let buffer = SharedBuffer::default();
        {
            let mut tracer = EventTracer::new(ScriptedProbe::hung());
            assert!(tracer.start_with_config(buffered_config(&buffer, true)));
        }
        assert!(buffer.lines().last().unwrap().starts_with("MOZ_EVENT_TRACE stop "));
    }

    #[test]
    fn test_samples_a_real_foreground_loop() {
        let (event_loop, handle) = ForegroundLoop::new();
        let foreground = std::thread::spawn(move || event_loop.run());

        // Block the loop long enough for one probe to cross the threshold
        handle
            .post(|| std::thread::sleep(Duration::from_millis(120)))
            .unwrap();

        let buffer = SharedBuffer::default();
        let mut tracer = EventTracer::new(ChannelProbe::new(handle.clone()));
        let config = buffered_config(&buffer, true)
            .with_threshold(Duration::from_millis(60))
            .with_interval(Duration::from_millis(5));

        assert!(tracer.start_with_config(config));
        wait_until(Duration::from_secs(10), || buffer.lines().len() >= 2);
        tracer.stop();

        handle.quit().unwrap();
        let stats = foreground.join().unwrap();
        assert!(stats.traces_serviced >= 1);

        let lines = buffer.lines();
        assert!(lines[0].starts_with("MOZ_EVENT_TRACE start "));
        assert!(lines[1].starts_with("MOZ_EVENT_TRACE sample "));
        assert!(lines.last().unwrap().starts_with("MOZ_EVENT_TRACE stop "));
    }

    #[test]
    fn test_failed_init_on_closed_loop() {
        let (event_loop, handle) = ForegroundLoop::new();
        drop(event_loop);

        let mut tracer = EventTracer::new(ChannelProbe::new(handle));
        assert!(!tracer.start(true));
        assert!(!tracer.is_running());
    }

    #[test]
    fn test_dead_sampler_is_reaped_on_start() {
        let buffer = SharedBuffer::default();
        let mut tracer = EventTracer::new(ScriptedProbe::panicking());

        assert!(tracer.start_with_config(buffered_config(&buffer, false)));
        wait_until(Duration::from_secs(10), || !tracer.is_running());

        tracer.probe().panic_on_fire.store(false, Ordering::SeqCst);
        assert!(tracer.start_with_config(buffered_config(&buffer, false)));
        assert!(tracer.is_running());
        tracer.stop();

        let probe = tracer.probe();
        assert_eq!(probe.inits.load(Ordering::SeqCst), 2);
        assert_eq!(probe.cleanups.load(Ordering::SeqCst), 2);
        assert!(tracer.last_report().is_some());
    }

    #[test]
    #[serial]
    fn test_start_reads_environment_once() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("trace.log");
        let second = dir.path().join("moved.log");
        env::set_var(ENV_OUTPUT, &first);
        env::set_var(ENV_THRESHOLD, "60000");
        env::remove_var(ENV_INTERVAL);

        let mut tracer = EventTracer::new(ScriptedProbe::new(vec![Duration::from_millis(30); 3]));
        assert!(tracer.start(true));

        env::set_var(ENV_THRESHOLD, "1");
        env::set_var(ENV_OUTPUT, &second);
        wait_until(Duration::from_secs(10), || {
            tracer.probe().fires.load(Ordering::SeqCst) >= 4
        });
        tracer.stop();

        env::remove_var(ENV_OUTPUT);
        env::remove_var(ENV_THRESHOLD);

        let written = std::fs::read_to_string(&first).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("MOZ_EVENT_TRACE start "));
        assert!(lines[1].starts_with("MOZ_EVENT_TRACE stop "));
        assert!(written.ends_with('\n'));
        assert!(!second.exists());

        let report = tracer.last_report().unwrap();
        assert_eq!(report.threshold_ms, 60_000);
        assert_eq!(report.reported_samples, 0);
        assert_eq!(report.completed_probes, 3);
    }
}
