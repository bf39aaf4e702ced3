//! Typed representation of one coverage snapshot and of the records written
//! to the change log. Parsers produce a `CoverageSnapshot`; the delta engine
//! turns two of them into a `ChangeLogRecord`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Compute a coverage percentage, returning 0.0 when the total is zero.
#[must_use]
pub fn percent(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 * 100.0 / total as f64
    }
}

/// A category of coverage measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Instruction,
    Line,
    Branch,
    Method,
    Class,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Instruction,
        MetricKind::Line,
        MetricKind::Branch,
        MetricKind::Method,
        MetricKind::Class,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Instruction => "instruction",
            MetricKind::Line => "line",
            MetricKind::Branch => "branch",
            MetricKind::Method => "method",
            MetricKind::Class => "class",
        }
    }
}

impl FromStr for MetricKind {
    type Err = String;

    /// Accepts both the lower-case log spelling and JaCoCo's upper-case
    /// counter types.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "instruction" => Ok(MetricKind::Instruction),
            "line" => Ok(MetricKind::Line),
            "branch" => Ok(MetricKind::Branch),
            "method" => Ok(MetricKind::Method),
            "class" => Ok(MetricKind::Class),
            _ => Err(format!("unknown metric kind '{s}'")),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Missed/covered counter for one metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricCount {
    pub missed: u64,
    pub covered: u64,
}

impl MetricCount {
    pub fn new(missed: u64, covered: u64) -> Self {
        Self { missed, covered }
    }

    /// Saturates at `u64::MAX`; the parser rejects counters that would.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.missed.saturating_add(self.covered)
    }

    #[must_use]
    pub fn percent(&self) -> f64 {
        percent(self.covered, self.total())
    }
}

/// Logical source path (`package/File.java`) to its executed line numbers.
pub type CoveredLines = BTreeMap<String, BTreeSet<u32>>;

/// Point-in-time coverage measurement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoverageSnapshot {
    metrics: BTreeMap<MetricKind, MetricCount>,
    covered_lines: CoveredLines,
}

impl CoverageSnapshot {
    /// Files with an empty covered set are dropped; the snapshot only keeps
    /// files that have at least one executed line.
    pub fn new(metrics: BTreeMap<MetricKind, MetricCount>, mut covered_lines: CoveredLines) -> Self {
        covered_lines.retain(|_, lines| !lines.is_empty());
        Self {
            metrics,
            covered_lines,
        }
    }

    #[must_use]
    pub fn with_metric(mut self, kind: MetricKind, missed: u64, covered: u64) -> Self {
        self.metrics.insert(kind, MetricCount::new(missed, covered));
        self
    }

    #[must_use]
    pub fn with_covered_lines<I>(mut self, file: &str, lines: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        let set: BTreeSet<u32> = lines.into_iter().collect();
        if !set.is_empty() {
            self.covered_lines
                .entry(file.to_string())
                .or_default()
                .extend(set);
        }
        self
    }

    pub fn metrics(&self) -> &BTreeMap<MetricKind, MetricCount> {
        &self.metrics
    }

    pub fn metric(&self, kind: MetricKind) -> Option<&MetricCount> {
        self.metrics.get(&kind)
    }

    pub fn covered_lines(&self) -> &CoveredLines {
        &self.covered_lines
    }

    pub fn lines_for(&self, file: &str) -> Option<&BTreeSet<u32>> {
        self.covered_lines.get(file)
    }
}

/// Absolute coverage for one metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverallEntry {
    pub covered: u64,
    pub total: u64,
    pub percent: f64,
}

/// Growth of one metric kind since the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaEntry {
    /// Newly covered count, not the absolute covered count.
    pub covered: u64,
    pub total: u64,
    pub percent: f64,
}

/// One entry of the change log. Each record is self-contained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogRecord {
    pub timestamp: String,
    pub overall_coverage: BTreeMap<MetricKind, OverallEntry>,
    pub coverage_change: BTreeMap<MetricKind, DeltaEntry>,
    pub newly_covered_lines: BTreeMap<String, Vec<u32>>,
}

impl ChangeLogRecord {
    /// True when neither a metric nor a line moved in this cycle.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.coverage_change.is_empty() && self.newly_covered_lines.is_empty()
    }

    /// Number of newly covered lines across all files.
    #[must_use]
    pub fn new_line_count(&self) -> usize {
        self.newly_covered_lines.values().map(Vec::len).sum()
    }
}
