//! Sampler configuration
//!
//! Resolves the sampler's settings once, at start, from defaults and
//! optional key/value overrides (normally the process environment).
//! Resolution never fails: anything missing or malformed falls back to the
//! default.

use anyhow::{Context, Result};
use log::debug;
use std::{
    fmt,
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use tracer_common::{
    DEFAULT_INTERVAL_MS, DEFAULT_THRESHOLD_MS, ENV_INTERVAL, ENV_OUTPUT, ENV_THRESHOLD,
};

/// Destination for trace lines
pub enum LogSink {
    /// Process standard output
    Stdout(io::Stdout),
    /// A file opened (and truncated) for writing; closed when dropped
    File { path: PathBuf, file: File },
    /// Any other writer supplied by the embedding system
    Writer(Box<dyn Write + Send>),
}

impl LogSink {
    pub fn stdout() -> Self {
        LogSink::Stdout(io::stdout())
    }

    /// Create or truncate `path` for writing
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .with_context(|| format!("Failed to open trace output file: {:?}", path))?;
        Ok(LogSink::File { path, file })
    }

    pub fn writer<W: Write + Send + 'static>(writer: W) -> Self {
        LogSink::Writer(Box::new(writer))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, LogSink::File { .. })
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogSink::Stdout(out) => out.write(buf),
            LogSink::File { file, .. } => file.write(buf),
            LogSink::Writer(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogSink::Stdout(out) => out.flush(),
            LogSink::File { file, .. } => file.flush(),
            LogSink::Writer(writer) => writer.flush(),
        }
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSink::Stdout(_) => f.write_str("stdout"),
            LogSink::File { path, .. } => write!(f, "file {:?}", path),
            LogSink::Writer(_) => f.write_str("writer"),
        }
    }
}

/// Immutable sampler settings, owned by the sampler thread once started
#[derive(Debug)]
pub struct SamplerConfig {
    /// Whether trace lines are written at all
    pub logging_enabled: bool,
    /// Probes taking longer than this are reported
    pub report_threshold: Duration,
    /// Minimum spacing between the start of two probes
    pub sample_interval: Duration,
    /// Where trace lines go
    pub sink: LogSink,
}

impl SamplerConfig {
    /// Defaults only: 20 ms threshold, 10 ms interval, stdout
    pub fn new(logging_enabled: bool) -> Self {
        Self {
            logging_enabled,
            report_threshold: Duration::from_millis(DEFAULT_THRESHOLD_MS),
            sample_interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            sink: LogSink::stdout(),
        }
    }

    /// Resolve overrides from the process environment
    pub fn from_env(logging_enabled: bool) -> Self {
        Self::resolve_with(logging_enabled, |key| std::env::var(key).ok())
    }

    /// Resolve overrides through an arbitrary key lookup
    ///
    /// The output file is only opened when logging is enabled, so a
    /// disabled sampler never creates or truncates it.
    pub fn resolve_with<F>(logging_enabled: bool, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(logging_enabled);

        if logging_enabled {
            if let Some(path) = lookup(ENV_OUTPUT).filter(|p| !p.is_empty()) {
                match LogSink::open(&path) {
                    Ok(sink) => config.sink = sink,
                    Err(e) => debug!("{:#}; tracing to stdout", e),
                }
            }
        }

        if let Some(threshold) = lookup_millis(&lookup, ENV_THRESHOLD) {
            config.report_threshold = threshold;
        }
        if let Some(interval) = lookup_millis(&lookup, ENV_INTERVAL) {
            config.sample_interval = interval;
        }

        debug!(
            "Resolved sampler config: threshold={:?}, interval={:?}, sink={:?}",
            config.report_threshold, config.sample_interval, config.sink
        );
        config
    }

    pub fn with_sink(mut self, sink: LogSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.report_threshold = threshold;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }
}

fn lookup_millis<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    let parsed = parse_millis(&raw);
    if parsed.is_none() {
        debug!("Ignoring invalid {}={:?}", key, raw);
    }
    parsed
}

/// Parse a positive integer millisecond count
///
/// Zero, negative, non-numeric, and values that overflow `u32` are rejected.
/// Parsing is strict on purpose: a value with trailing text such as `12ms`
/// is rejected as a whole rather than read up to its numeric prefix.
pub fn parse_millis(value: &str) -> Option<Duration> {
    match value.trim().parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(ms) => Some(Duration::from_millis(u64::from(ms))),
    }
}
