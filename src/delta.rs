//! Snapshot diffing: what moved between the previous and the current
//! snapshot, and what the current snapshot looks like in absolute terms.
//!
//! Every function here is pure. `previous == None` means "first cycle".

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::model::{
    percent, ChangeLogRecord, CoverageSnapshot, DeltaEntry, MetricKind, OverallEntry,
};

/// Lines covered now that were not covered in `previous`, per file, in
/// ascending order. Files without new lines are omitted.
pub fn newly_covered_lines(
    current: &CoverageSnapshot,
    previous: Option<&CoverageSnapshot>,
) -> BTreeMap<String, Vec<u32>> {
    let mut result = BTreeMap::new();
    for (file, lines) in current.covered_lines() {
        let new_lines: Vec<u32> = match previous.and_then(|p| p.lines_for(file)) {
            Some(before) => lines.difference(before).copied().collect(),
            None => lines.iter().copied().collect(),
        };
        if !new_lines.is_empty() {
            result.insert(file.clone(), new_lines);
        }
    }
    result
}

/// Positive growth per metric kind. Empty on the first cycle.
///
/// A kind missing from `previous` is reported whole. A kind whose covered
/// count stayed the same or dropped is left out; drops are surfaced
/// separately by [`detect_anomalies`].
pub fn metric_delta(
    current: &CoverageSnapshot,
    previous: Option<&CoverageSnapshot>,
) -> BTreeMap<MetricKind, DeltaEntry> {
    let mut result = BTreeMap::new();
    let Some(previous) = previous else {
        return result;
    };

    for (kind, count) in current.metrics() {
        let total = count.total();
        let entry = match previous.metric(*kind) {
            None => DeltaEntry {
                covered: count.covered,
                total,
                percent: percent(count.covered, total),
            },
            Some(before) if count.covered > before.covered => {
                let delta = count.covered - before.covered;
                DeltaEntry {
                    covered: delta,
                    total,
                    percent: percent(delta, total),
                }
            }
            Some(_) => continue,
        };
        result.insert(*kind, entry);
    }
    result
}

/// Absolute coverage for every kind present in the snapshot.
pub fn overall_coverage(current: &CoverageSnapshot) -> BTreeMap<MetricKind, OverallEntry> {
    current
        .metrics()
        .iter()
        .map(|(kind, count)| {
            (
                *kind,
                OverallEntry {
                    covered: count.covered,
                    total: count.total(),
                    percent: count.percent(),
                },
            )
        })
        .collect()
}

/// A violation of the expectation that coverage only ever grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// Covered count of a metric kind went down.
    MetricRegression {
        kind: MetricKind,
        previous: u64,
        current: u64,
    },
    /// Lines covered in the previous snapshot are no longer covered.
    LinesLost { file: String, lines: Vec<u32> },
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::MetricRegression {
                kind,
                previous,
                current,
            } => write!(f, "{kind} covered count dropped from {previous} to {current}"),
            Anomaly::LinesLost { file, lines } => {
                write!(f, "{} previously covered lines lost in {file}", lines.len())
            }
        }
    }
}

/// Monotonicity violations between two snapshots. Kinds or files that
/// disappear entirely count as dropping to zero.
pub fn detect_anomalies(
    current: &CoverageSnapshot,
    previous: Option<&CoverageSnapshot>,
) -> Vec<Anomaly> {
    let Some(previous) = previous else {
        return Vec::new();
    };
    let mut anomalies = Vec::new();

    for (kind, before) in previous.metrics() {
        let now = current.metric(*kind).map_or(0, |c| c.covered);
        if now < before.covered {
            anomalies.push(Anomaly::MetricRegression {
                kind: *kind,
                previous: before.covered,
                current: now,
            });
        }
    }

    for (file, before) in previous.covered_lines() {
        let lost: Vec<u32> = match current.lines_for(file) {
            Some(now) => before.difference(now).copied().collect(),
            None => before.iter().copied().collect(),
        };
        if !lost.is_empty() {
            anomalies.push(Anomaly::LinesLost {
                file: file.clone(),
                lines: lost,
            });
        }
    }

    anomalies
}

/// Assemble the change log record for one cycle.
pub fn build_record(
    current: &CoverageSnapshot,
    previous: Option<&CoverageSnapshot>,
    timestamp: DateTime<Utc>,
) -> ChangeLogRecord {
    ChangeLogRecord {
        timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
        overall_coverage: overall_coverage(current),
        coverage_change: metric_delta(current, previous),
        newly_covered_lines: newly_covered_lines(current, previous),
    }
}
