//! Report exporters
//!
//! Writes a [`ResponsivenessReport`] to a file as JSON or in the Prometheus
//! text exposition format.

use crate::types::ResponsivenessReport;
use anyhow::{Context, Result};
use std::{
    fmt::Write as _,
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

/// Trait for report exporters
pub trait MetricsExporter {
    /// Export a run report
    ///
    /// # Arguments
    ///
    /// * `report` - Report produced when the sampler stopped
    fn export(&self, report: &ResponsivenessReport) -> Result<()>;
}

/// Export format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterType {
    /// JSON format
    Json,
    /// Prometheus format
    Prometheus,
}

impl ExporterType {
    /// Parse a format name as given on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "json" => Some(ExporterType::Json),
            "prometheus" | "prom" => Some(ExporterType::Prometheus),
            _ => None,
        }
    }

    /// Build the exporter for this format
    pub fn exporter(self, output_path: PathBuf) -> Box<dyn MetricsExporter> {
        match self {
            ExporterType::Json => Box::new(JsonExporter::new(output_path, true)),
            ExporterType::Prometheus => Box::new(PrometheusExporter::new(output_path)),
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;

    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write to output file: {:?}", path))?;

    Ok(())
}

/// JSON exporter
pub struct JsonExporter {
    output_path: PathBuf,
    pretty: bool,
}

impl JsonExporter {
    /// Create a new JSON exporter
    ///
    /// # Arguments
    ///
    /// * `output_path` - Path to output file
    /// * `pretty` - Enable pretty-printing
    pub fn new(output_path: PathBuf, pretty: bool) -> Self {
        Self {
            output_path,
            pretty,
        }
    }
}

impl MetricsExporter for JsonExporter {
    fn export(&self, report: &ResponsivenessReport) -> Result<()> {
        let json = if self.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };

        write_file(&self.output_path, &json)
    }
}

/// Prometheus exporter
pub struct PrometheusExporter {
    output_path: PathBuf,
}

impl PrometheusExporter {
    /// Create a new Prometheus exporter
    ///
    /// # Arguments
    ///
    /// * `output_path` - Path to output file
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    /// Convert a report to Prometheus format
    fn to_prometheus_format(report: &ResponsivenessReport) -> String {
        let mut output = String::new();

        // Writing into a String cannot fail
        let mut metric = |name: &str, kind: &str, help: &str, samples: &[(&str, String)]| {
            let _ = writeln!(output, "# HELP event_tracer_{} {}", name, help);
            let _ = writeln!(output, "# TYPE event_tracer_{} {}", name, kind);
            for (labels, value) in samples {
                let _ = writeln!(output, "event_tracer_{}{} {}", name, labels, value);
            }
            output.push('\n');
        };

        metric(
            "probes_total",
            "counter",
            "Round-trip probes by outcome",
            &[
                ("{outcome=\"completed\"}", report.completed_probes.to_string()),
                ("{outcome=\"interrupted\"}", report.interrupted_probes.to_string()),
            ],
        );
        metric(
            "samples_reported_total",
            "counter",
            "Probes whose round trip exceeded the threshold",
            &[("", report.reported_samples.to_string())],
        );
        metric(
            "threshold_milliseconds",
            "gauge",
            "Reporting threshold",
            &[("", report.threshold_ms.to_string())],
        );
        metric(
            "interval_milliseconds",
            "gauge",
            "Sampling interval",
            &[("", report.interval_ms.to_string())],
        );
        metric(
            "duration_seconds",
            "gauge",
            "Duration of the sampling run",
            &[("", report.duration_seconds.to_string())],
        );

        let p = &report.percentiles;
        metric(
            "round_trip_milliseconds",
            "gauge",
            "Round-trip time percentiles in milliseconds",
            &[
                ("{percentile=\"0.50\"}", p.p50.to_string()),
                ("{percentile=\"0.75\"}", p.p75.to_string()),
                ("{percentile=\"0.90\"}", p.p90.to_string()),
                ("{percentile=\"0.95\"}", p.p95.to_string()),
                ("{percentile=\"0.99\"}", p.p99.to_string()),
                ("{percentile=\"0.999\"}", p.p999.to_string()),
            ],
        );

        let h = &report.histogram;
        metric(
            "round_trip_histogram_bucket",
            "gauge",
            "Round-trip histogram buckets (upper bound in milliseconds)",
            &[
                ("{le=\"1\"}", h.bucket_0_1ms.to_string()),
                ("{le=\"5\"}", h.bucket_1_5ms.to_string()),
                ("{le=\"10\"}", h.bucket_5_10ms.to_string()),
                ("{le=\"50\"}", h.bucket_10_50ms.to_string()),
                ("{le=\"100\"}", h.bucket_50_100ms.to_string()),
                ("{le=\"+Inf\"}", h.bucket_100ms_plus.to_string()),
            ],
        );

        output
    }
}

impl MetricsExporter for PrometheusExporter {
    fn export(&self, report: &ResponsivenessReport) -> Result<()> {
        write_file(&self.output_path, &Self::to_prometheus_format(report))
    }
}
