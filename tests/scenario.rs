mod common;

use covtrack::changelog::{FileChangeLog, LogFormat};
use covtrack::error::FailureKind;
use covtrack::model::{ChangeLogRecord, MetricKind};
use covtrack::session::Tracker;
use covtrack::source::FileSource;

fn read_yaml_log(path: &std::path::Path) -> Vec<ChangeLogRecord> {
    let text = std::fs::read_to_string(path).unwrap();
    serde_yaml::from_str(&text).unwrap()
}

/// Three cycles: nothing covered, three lines covered, no further change.
#[test]
fn three_cycle_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("coverage_log.yaml");
    let tracker = Tracker::new(FileChangeLog::new(&log_path, LogFormat::Yaml))
        .with_clock(common::SteppingClock::default());

    let first = tracker
        .run_cycle(include_bytes!("fixtures/cycle1.xml"))
        .unwrap();
    let line = first.overall_coverage[&MetricKind::Line];
    assert_eq!((line.covered, line.total), (0, 10));
    assert_eq!(line.percent, 0.0);
    assert!(first.coverage_change.is_empty());
    assert!(first.newly_covered_lines.is_empty());

    let second = tracker
        .run_cycle(include_bytes!("fixtures/cycle2.xml"))
        .unwrap();
    let line = second.overall_coverage[&MetricKind::Line];
    assert_eq!((line.covered, line.total), (3, 10));
    assert!((line.percent - 30.0).abs() < 1e-9);
    let change = second.coverage_change[&MetricKind::Line];
    assert_eq!((change.covered, change.total), (3, 10));
    assert!((change.percent - 30.0).abs() < 1e-9);
    assert_eq!(second.newly_covered_lines.len(), 1);
    assert_eq!(second.newly_covered_lines["pkg/A.java"], vec![1, 2, 3]);

    let third = tracker
        .run_cycle(include_bytes!("fixtures/cycle3.xml"))
        .unwrap();
    assert!(third.coverage_change.is_empty());
    assert!(third.newly_covered_lines.is_empty());
    assert_eq!(third.overall_coverage, second.overall_coverage);

    let logged = read_yaml_log(&log_path);
    assert_eq!(logged, vec![first, second, third.clone()]);
    assert_eq!(tracker.latest(), Some(third));
}

#[test]
fn fresh_tracker_truncates_previous_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("coverage_log.yaml");

    let tracker = Tracker::new(FileChangeLog::new(&log_path, LogFormat::Yaml));
    for _ in 0..3 {
        tracker
            .run_cycle(include_bytes!("fixtures/cycle2.xml"))
            .unwrap();
    }
    assert_eq!(read_yaml_log(&log_path).len(), 3);

    // A new process lifetime starts from an empty log.
    let restarted = Tracker::new(FileChangeLog::new(&log_path, LogFormat::Yaml));
    let record = restarted
        .run_cycle(include_bytes!("fixtures/cycle2.xml"))
        .unwrap();
    let logged = read_yaml_log(&log_path);
    assert_eq!(logged.len(), 1);
    // First cycle of the new session: every covered line is new again.
    assert_eq!(record.newly_covered_lines["pkg/A.java"], vec![1, 2, 3]);
    assert!(record.coverage_change.is_empty());
}

#[test]
fn malformed_report_produces_no_record() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("coverage_log.jsonl");
    let tracker = Tracker::new(FileChangeLog::new(&log_path, LogFormat::Json));

    tracker
        .run_cycle(include_bytes!("fixtures/cycle1.xml"))
        .unwrap();
    let err = tracker
        .run_cycle(include_bytes!("fixtures/malformed.xml"))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::MalformedReport);

    // The next good report is diffed against cycle 1, not the broken one.
    let record = tracker
        .run_cycle(include_bytes!("fixtures/cycle2.xml"))
        .unwrap();
    assert_eq!(record.coverage_change[&MetricKind::Line].covered, 3);

    let text = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert_eq!(tracker.cycles(), 2);
}

#[test]
fn unavailable_source_leaves_state_alone() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("jacoco_report.xml");
    let log_path = dir.path().join("coverage_log.yaml");
    let tracker = Tracker::new(FileChangeLog::new(&log_path, LogFormat::Yaml));
    let source = FileSource::new(&report_path);

    let err = tracker.run_from_source(&source).unwrap_err();
    assert_eq!(err.kind(), FailureKind::SourceUnavailable);
    assert_eq!(tracker.latest(), None);
    assert!(!log_path.exists());

    std::fs::write(&report_path, common::jacoco_report(8, 2, "pkg/B.java", &[5, 6])).unwrap();
    let record = tracker.run_from_source(&source).unwrap();
    assert_eq!(record.newly_covered_lines["pkg/B.java"], vec![5, 6]);
}

#[test]
fn write_failure_keeps_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().join("logs");
    let log_path = log_dir.join("coverage_log.yaml");
    let tracker = Tracker::new(FileChangeLog::new(&log_path, LogFormat::Yaml));

    // The log directory does not exist yet, so the append fails.
    let err = tracker
        .run_cycle(&common::jacoco_report(9, 1, "pkg/A.java", &[1]))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::WriteFailure);
    assert_eq!(tracker.cycles(), 0);

    std::fs::create_dir(&log_dir).unwrap();
    let record = tracker
        .run_cycle(&common::jacoco_report(8, 2, "pkg/A.java", &[1, 2]))
        .unwrap();
    // Still the first successful cycle: no previous baseline was recorded.
    assert!(record.coverage_change.is_empty());
    assert_eq!(record.newly_covered_lines["pkg/A.java"], vec![1, 2]);
}
