//! Event Tracer - responsiveness sampler demo
//!
//! Runs a synthetic foreground event loop, optionally makes it janky by
//! posting blocking tasks, and samples its responsiveness with the event
//! tracer. Trace lines go to stdout or to `MOZ_INSTRUMENT_EVENT_LOOP_OUTPUT`.
//!
//! ## Usage
//!
//! ```bash
//! # Sample for 10 seconds, logging every probe slower than 20ms
//! ./event-tracer --log --duration 10
//!
//! # Block the loop for 45ms every 500ms and export a JSON report
//! ./event-tracer --log --jank-ms 45 --jank-every-ms 500 --report report.json
//!
//! # Custom threshold and interval
//! MOZ_INSTRUMENT_EVENT_LOOP_THRESHOLD=50 MOZ_INSTRUMENT_EVENT_LOOP_INTERVAL=5 \
//!     ./event-tracer --log --jank-ms 80
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use foreground_loop::{ChannelProbe, ForegroundLoop, LoopHandle};
use log::{info, warn};
use responsiveness_sampler::{EventTracer, ExporterType, MetricsExporter, ResponsivenessReport};
use std::{path::PathBuf, thread, time::Duration};
use tokio::{
    signal,
    sync::watch,
    task,
    time::{interval, sleep, Instant},
};

/// Event loop responsiveness sampler
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Write MOZ_EVENT_TRACE lines
    #[clap(short, long)]
    log: bool,

    /// Duration to run (in seconds, 0 = until Ctrl-C)
    #[clap(short, long, default_value_t = 10)]
    duration: u64,

    /// Block the foreground loop for this many milliseconds per jank task (0 = no jank)
    #[clap(long, default_value_t = 0)]
    jank_ms: u64,

    /// Post a jank task every this many milliseconds
    #[clap(long, default_value_t = 1000)]
    jank_every_ms: u64,

    /// Output file for the run report
    #[clap(short, long)]
    report: Option<PathBuf>,

    /// Report format (json, prometheus)
    #[clap(short, long, default_value = "json")]
    format: String,

    /// Verbose logging
    #[clap(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let export_format = ExporterType::from_name(&args.format).with_context(|| {
        format!("Unsupported format: {}. Use json or prometheus", args.format)
    })?;
    if args.jank_ms > 0 && args.jank_every_ms == 0 {
        anyhow::bail!("--jank-every-ms must be >= 1");
    }

    info!("Starting event tracer demo...");
    info!(
        "   Duration: {}",
        if args.duration == 0 {
            "until Ctrl-C".to_string()
        } else {
            format!("{} seconds", args.duration)
        }
    );
    info!("   Trace logging: {}", if args.log { "on" } else { "off" });
    if args.jank_ms > 0 {
        info!("   Jank: {}ms every {}ms", args.jank_ms, args.jank_every_ms);
    }

    // The loop being measured gets its own OS thread, like a UI thread
    let (event_loop, handle) = ForegroundLoop::new();
    let foreground = thread::Builder::new()
        .name("foreground".to_string())
        .spawn(move || event_loop.run())
        .context("Failed to spawn foreground loop thread")?;

    let (stop_jank, jank_stopped) = watch::channel(false);
    if args.jank_ms > 0 {
        spawn_jank_injector(
            handle.clone(),
            Duration::from_millis(args.jank_ms),
            Duration::from_millis(args.jank_every_ms),
            jank_stopped,
        );
    }

    let mut tracer = EventTracer::new(ChannelProbe::new(handle.clone()));
    if !tracer.start(args.log) {
        let _ = handle.quit();
        anyhow::bail!("Failed to start the event tracer");
    }

    // Run for specified duration or until interrupted
    let start_time = Instant::now();
    if args.duration > 0 {
        tokio::select! {
            _ = sleep(Duration::from_secs(args.duration)) => {
                info!("Duration reached, shutting down...");
            }
            _ = signal::ctrl_c() => {
                info!("Interrupted, shutting down...");
            }
        }
    } else {
        signal::ctrl_c().await?;
        info!("Interrupted, shutting down...");
    }

    let _ = stop_jank.send(true);
    // Joins the sampler thread, which may be parked on a probe
    task::block_in_place(|| tracer.stop());
    info!("Sampled for {} seconds", start_time.elapsed().as_secs());

    if handle.quit().is_err() {
        warn!("Foreground loop already gone");
    }
    match task::block_in_place(|| foreground.join()) {
        Ok(stats) => info!(
            "Foreground loop serviced {} tasks and {} probes",
            stats.tasks_run, stats.traces_serviced
        ),
        Err(_) => warn!("Foreground loop thread panicked"),
    }

    let Some(report) = tracer.last_report() else {
        warn!("No report produced");
        return Ok(());
    };

    if let Some(path) = &args.report {
        export_format.exporter(path.clone()).export(report)?;
        info!("Report written to {:?}", path);
    }

    print_summary(report);

    Ok(())
}

/// Periodically post a task that blocks the foreground loop
fn spawn_jank_injector(
    handle: LoopHandle,
    block_for: Duration,
    every: Duration,
    mut stopped: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let mut ticker = interval(every);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if handle.post(move || thread::sleep(block_for)).is_err() {
                        break;
                    }
                }
                _ = stopped.changed() => break,
            }
        }
    });
}

fn print_summary(report: &ResponsivenessReport) {
    info!("");
    info!("============================================");
    info!("             Summary Report");
    info!("============================================");
    info!("");
    info!("  Probes completed:   {}", report.completed_probes);
    info!("  Probes interrupted: {}", report.interrupted_probes);
    info!(
        "  Above {}ms:         {}",
        report.threshold_ms, report.reported_samples
    );
    info!("  Interval:           {}ms", report.interval_ms);
    info!("");
    info!("  Round trip (ms):");
    info!("    min:  {:>10.2}", report.round_trip.min_ms);
    info!("    avg:  {:>10.2}", report.round_trip.avg_ms);
    info!("    max:  {:>10.2}", report.round_trip.max_ms);
    info!("    std:  {:>10.2}", report.round_trip.std_dev_ms);
    info!("");
    info!("  Percentiles (ms):");
    info!("    p50:  {:>10.2}", report.percentiles.p50);
    info!("    p90:  {:>10.2}", report.percentiles.p90);
    info!("    p99:  {:>10.2}", report.percentiles.p99);
    info!("    p999: {:>10.2}", report.percentiles.p999);
    info!("");
    info!("  Histogram:");
    info!("    0-1ms:       {:>8}", report.histogram.bucket_0_1ms);
    info!("    1-5ms:       {:>8}", report.histogram.bucket_1_5ms);
    info!("    5-10ms:      {:>8}", report.histogram.bucket_5_10ms);
    info!("    10-50ms:     {:>8}", report.histogram.bucket_10_50ms);
    info!("    50-100ms:    {:>8}", report.histogram.bucket_50_100ms);
    info!("    100ms+:      {:>8}", report.histogram.bucket_100ms_plus);
    info!("");
    info!("============================================");
}
