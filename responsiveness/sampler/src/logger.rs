//! Trace line writer
//!
//! Formats the `start`, `sample`, and `stop` lines and appends them to the
//! configured sink. Only the sampler thread ever holds a `SampleLogger`.

use crate::config::LogSink;
use log::warn;
use std::io::Write;
use tracer_common::{Sample, TRACE_PREFIX};

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

pub fn format_start(timestamp_ms: u64) -> String {
    format!("{} start {}", TRACE_PREFIX, timestamp_ms)
}

pub fn format_sample(sample: &Sample) -> String {
    format!(
        "{} sample {} {}",
        TRACE_PREFIX,
        sample.timestamp_ms,
        sample.duration_ms()
    )
}

pub fn format_stop(timestamp_ms: u64) -> String {
    format!("{} stop {}", TRACE_PREFIX, timestamp_ms)
}

/// Writes trace lines when logging is enabled, and nothing otherwise
pub struct SampleLogger {
    sink: LogSink,
    enabled: bool,
    lines_written: u64,
}

impl SampleLogger {
    pub fn new(sink: LogSink, enabled: bool) -> Self {
        Self {
            sink,
            enabled,
            lines_written: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn log_start(&mut self, timestamp_ms: u64) {
        self.write_line(&format_start(timestamp_ms));
    }

    pub fn log_sample(&mut self, sample: &Sample) {
        self.write_line(&format_sample(sample));
    }

    pub fn log_stop(&mut self, timestamp_ms: u64) {
        self.write_line(&format_stop(timestamp_ms));
    }

    /// Flush and release the sink; a file sink is closed here
    pub fn close(mut self) {
        if let Err(e) = self.sink.flush() {
            warn!("[SampleLogger] Failed to flush trace sink {:?}: {}", self.sink, e);
        }
    }

    fn write_line(&mut self, line: &str) {
        if !self.enabled {
            return;
        }

        // Flushed per line so an external reader sees samples as they happen
        let result = writeln!(self.sink, "{}", line).and_then(|_| self.sink.flush());
        match result {
            Ok(()) => self.lines_written += 1,
            Err(e) => warn!("[SampleLogger] Failed to write to {:?}: {}", self.sink, e),
        }
    }
}
