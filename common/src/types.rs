//! Shared data structures between the foreground loop and the sampler

use std::time::Duration;

/// Result of one round trip through the foreground loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The foreground loop serviced the probe event
    Completed,
    /// The wait was cut short before the probe was serviced
    /// (shutdown in progress, or the loop is gone)
    Interrupted,
}

/// A probe whose service time exceeded the reporting threshold
///
/// Produced by the sampler loop, written to the trace sink, then dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    /// Wall-clock time the sample was taken (milliseconds since the epoch)
    pub timestamp_ms: u64,
    /// Measured round-trip time
    pub duration: Duration,
}

impl Sample {
    pub fn new(timestamp_ms: u64, duration: Duration) -> Self {
        Self {
            timestamp_ms,
            duration,
        }
    }

    /// Round-trip time in whole milliseconds, rounded to nearest
    pub fn duration_ms(&self) -> u64 {
        round_to_millis(self.duration)
    }
}

/// Round a duration to the nearest millisecond, halves rounding up
///
/// Threshold and pacing decisions use the full-precision `Duration`;
/// only reported values go through this.
pub fn round_to_millis(duration: Duration) -> u64 {
    let micros = duration.as_micros();
    u64::try_from((micros + 500) / 1000).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_millis() {
        assert_eq!(round_to_millis(Duration::ZERO), 0);
        assert_eq!(round_to_millis(Duration::from_micros(499)), 0);
        assert_eq!(round_to_millis(Duration::from_micros(500)), 1);
        assert_eq!(round_to_millis(Duration::from_micros(35_400)), 35);
        assert_eq!(round_to_millis(Duration::from_micros(35_600)), 36);
        assert_eq!(round_to_millis(Duration::from_millis(20)), 20);
    }

    #[test]
    fn test_sample_duration_ms() {
        let sample = Sample::new(1_700_000_000_000, Duration::from_micros(34_987));
        assert_eq!(sample.duration_ms(), 35);
        assert_eq!(sample.timestamp_ms, 1_700_000_000_000);
    }
}
