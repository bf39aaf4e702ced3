//! Timer-driven trigger loop.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::FailureKind;
use crate::session::Tracker;
use crate::source::ReportSource;

#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Pause between the end of one attempt and the start of the next.
    pub interval: Duration,
    /// Stop after this many attempts (successful or not). `None` runs forever.
    pub max_cycles: Option<u64>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_cycles: None,
        }
    }
}

/// Outcome counts of a finished watch loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    pub attempts: u64,
    pub logged: u64,
    pub failed: u64,
}

/// Repeatedly fetch a report and run a cycle. A failed cycle never ends the
/// loop; the next attempt diffs against the last good snapshot.
pub fn watch(tracker: &Tracker, source: &dyn ReportSource, options: &WatchOptions) -> WatchStats {
    let mut stats = WatchStats::default();
    info!(source = %source.describe(), interval = ?options.interval, "watching coverage");

    loop {
        stats.attempts += 1;
        match tracker.run_from_source(source) {
            Ok(record) => {
                stats.logged += 1;
                info!(timestamp = %record.timestamp, "logged");
            }
            Err(e) => {
                stats.failed += 1;
                match e.kind() {
                    FailureKind::SourceUnavailable => {
                        warn!(error = %e, "no coverage report this cycle")
                    }
                    FailureKind::WriteFailure => {
                        error!(error = %e, "change log append failed; baseline kept")
                    }
                    _ => error!(error = %e, "coverage cycle failed"),
                }
            }
        }

        if options.max_cycles.is_some_and(|max| stats.attempts >= max) {
            break;
        }
        std::thread::sleep(options.interval);
    }

    stats
}
