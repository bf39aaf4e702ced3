//! Command handler functions for the covtrack CLI.
//!
//! The one-shot `cmd_*` functions return their output as a `String`, making
//! them easy to test without capturing stdout.

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::changelog::{render_record, FileChangeLog, LogFormat};
use crate::delta::{build_record, detect_anomalies, overall_coverage};
use crate::model::MetricKind;
use crate::parsers::jacoco::JacocoParser;
use crate::parsers::ReportParser;
use crate::session::{Clock, SystemClock, Tracker};
use crate::source::ReportSource;
use crate::watch::{watch, WatchOptions, WatchStats};

fn load(path: &Path) -> Result<crate::model::CoverageSnapshot> {
    let raw = std::fs::read(path)
        .with_context(|| format!("Failed to read report {}", path.display()))?;
    JacocoParser
        .parse(&raw)
        .with_context(|| format!("Failed to parse report {}", path.display()))
}

/// Render the record that `current` would produce after `previous`.
pub fn cmd_diff(previous: &Path, current: &Path, format: LogFormat) -> Result<String> {
    cmd_diff_at(previous, current, format, &SystemClock)
}

pub fn cmd_diff_at(
    previous: &Path,
    current: &Path,
    format: LogFormat,
    clock: &dyn Clock,
) -> Result<String> {
    let before = load(previous)?;
    let after = load(current)?;

    let mut out = render_record(&build_record(&after, Some(&before), clock.now()), format)?;
    for anomaly in detect_anomalies(&after, Some(&before)) {
        match format {
            LogFormat::Yaml => writeln!(out, "# warning: {anomaly}").unwrap(),
            // JSON Lines has no comments; keep stdout parseable.
            LogFormat::Json => warn!(%anomaly, "coverage went backwards"),
        }
    }
    Ok(out)
}

/// Human-readable overall coverage of one report.
pub fn cmd_summary(report: &Path) -> Result<String> {
    let snapshot = load(report)?;
    let overall = overall_coverage(&snapshot);

    let mut out = String::new();
    if overall.is_empty() {
        out.push_str("No coverage counters in report.\n");
        return Ok(out);
    }
    for kind in MetricKind::ALL {
        if let Some(entry) = overall.get(&kind) {
            let label = format!("{}:", capitalize(kind.as_str()));
            writeln!(
                out,
                "{:<13} {}/{} ({:.1}%)",
                label, entry.covered, entry.total, entry.percent
            )
            .unwrap();
        }
    }
    writeln!(out, "Files hit:    {}", snapshot.covered_lines().len()).unwrap();
    Ok(out)
}

/// Run the watch loop, logging into `output`.
pub fn cmd_watch(
    source: &dyn ReportSource,
    output: &Path,
    format: LogFormat,
    options: &WatchOptions,
) -> WatchStats {
    let tracker = Tracker::new(FileChangeLog::new(output, format));
    watch(&tracker, source, options)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
