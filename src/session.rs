//! Session state and the per-cycle pipeline.
//!
//! A [`Session`] owns the previous snapshot. [`Tracker`] puts a session and
//! its change log behind one mutex so that at most one cycle runs at a time.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::changelog::ChangeLog;
use crate::delta::{build_record, detect_anomalies};
use crate::error::{CovtrackError, Result};
use crate::model::{ChangeLogRecord, CoverageSnapshot};
use crate::parsers::jacoco::JacocoParser;
use crate::parsers::ReportParser;
use crate::source::ReportSource;

/// Source of record timestamps.
pub trait Clock {
    /// Returns the current time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// State carried from one cycle to the next. Nothing here is persisted.
#[derive(Debug, Default)]
pub struct Session {
    previous: Option<CoverageSnapshot>,
    latest: Option<ChangeLogRecord>,
    cycles: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_first_cycle(&self) -> bool {
        self.previous.is_none()
    }

    pub fn previous(&self) -> Option<&CoverageSnapshot> {
        self.previous.as_ref()
    }

    pub fn latest(&self) -> Option<&ChangeLogRecord> {
        self.latest.as_ref()
    }

    /// Successful cycles so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Parse `raw` once and run the rest of the cycle against it.
    pub fn cycle(
        &mut self,
        raw: &[u8],
        parser: &dyn ReportParser,
        log: &mut dyn ChangeLog,
        clock: &dyn Clock,
    ) -> Result<ChangeLogRecord> {
        let current = parser.parse(raw)?;
        self.advance(current, log, clock)
    }

    /// Diff `current` against the stored snapshot, append the record, and
    /// only then make `current` the new baseline. On error the session is
    /// left exactly as it was.
    pub fn advance(
        &mut self,
        current: CoverageSnapshot,
        log: &mut dyn ChangeLog,
        clock: &dyn Clock,
    ) -> Result<ChangeLogRecord> {
        let previous = self.previous.as_ref();

        for anomaly in detect_anomalies(&current, previous) {
            warn!(%anomaly, "coverage went backwards; upstream counters may have been reset");
        }

        let record = build_record(&current, previous, clock.now());
        log.append(&record)?;

        self.previous = Some(current);
        self.latest = Some(record.clone());
        self.cycles += 1;
        Ok(record)
    }
}

struct Inner {
    session: Session,
    log: Box<dyn ChangeLog + Send>,
}

/// Single-flight handle around a session. Cycles requested while another is
/// in flight block until it finishes ([`Tracker::run_cycle`]) or are rejected
/// ([`Tracker::try_run_cycle`]).
pub struct Tracker {
    inner: Mutex<Inner>,
    parser: Box<dyn ReportParser + Send + Sync>,
    clock: Box<dyn Clock + Send + Sync>,
}

impl Tracker {
    /// A tracker reading JaCoCo XML and stamping records with the wall clock.
    pub fn new(log: impl ChangeLog + Send + 'static) -> Self {
        Self {
            inner: Mutex::new(Inner {
                session: Session::new(),
                log: Box::new(log),
            }),
            parser: Box::new(JacocoParser),
            clock: Box::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_parser(mut self, parser: impl ReportParser + Send + Sync + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Run one cycle on an already acquired report.
    pub fn run_cycle(&self, raw: &[u8]) -> Result<ChangeLogRecord> {
        let mut inner = self.inner.lock();
        self.cycle_locked(&mut inner, raw)
    }

    /// Like [`Tracker::run_cycle`], but fails with `Busy` instead of waiting.
    pub fn try_run_cycle(&self, raw: &[u8]) -> Result<ChangeLogRecord> {
        let mut inner = self.inner.try_lock().ok_or(CovtrackError::Busy)?;
        self.cycle_locked(&mut inner, raw)
    }

    /// Fetch a report and run one cycle on it. The report is fetched while
    /// holding the lock so snapshots are diffed in the order they were taken.
    pub fn run_from_source(&self, source: &dyn ReportSource) -> Result<ChangeLogRecord> {
        let mut inner = self.inner.lock();
        let raw = source.fetch()?;
        self.cycle_locked(&mut inner, &raw)
    }

    /// Latest successfully logged record, without touching the session.
    ///
    /// Shares the cycle lock, so while [`Tracker::run_from_source`] is
    /// fetching (two `jacococli` runs for [`crate::source::JacocoCli`]) this
    /// blocks until that cycle is done.
    pub fn latest(&self) -> Option<ChangeLogRecord> {
        self.inner.lock().session.latest().cloned()
    }

    pub fn cycles(&self) -> u64 {
        self.inner.lock().session.cycles()
    }

    fn cycle_locked(&self, inner: &mut Inner, raw: &[u8]) -> Result<ChangeLogRecord> {
        let Inner { session, log } = inner;
        let record = session.cycle(raw, &*self.parser, &mut **log, &*self.clock)?;
        info!(
            cycle = session.cycles(),
            new_lines = record.new_line_count(),
            changed_metrics = record.coverage_change.len(),
            "coverage snapshot logged"
        );
        Ok(record)
    }
}
