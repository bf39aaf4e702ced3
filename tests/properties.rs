use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use covtrack::delta::{metric_delta, newly_covered_lines};
use covtrack::model::{CoverageSnapshot, CoveredLines, MetricCount, MetricKind};

fn kind() -> impl Strategy<Value = MetricKind> {
    prop::sample::select(MetricKind::ALL.to_vec())
}

fn snapshot() -> impl Strategy<Value = CoverageSnapshot> {
    let metrics = prop::collection::btree_map(kind(), (0u64..1000, 0u64..1000), 0..5);
    let files = prop::collection::btree_map(
        "[a-z]{1,3}/[A-Z][a-z]{0,4}\\.java",
        prop::collection::btree_set(1u32..500, 0..20),
        0..6,
    );
    (metrics, files).prop_map(|(metrics, files)| {
        let metrics: BTreeMap<MetricKind, MetricCount> = metrics
            .into_iter()
            .map(|(k, (missed, covered))| (k, MetricCount::new(missed, covered)))
            .collect();
        CoverageSnapshot::new(metrics, files)
    })
}

fn as_vecs(lines: &CoveredLines) -> BTreeMap<String, Vec<u32>> {
    lines
        .iter()
        .map(|(file, set)| (file.clone(), set.iter().copied().collect()))
        .collect()
}

proptest! {
    #[test]
    fn first_cycle_reports_every_covered_line(s in snapshot()) {
        prop_assert_eq!(newly_covered_lines(&s, None), as_vecs(s.covered_lines()));
        prop_assert!(metric_delta(&s, None).is_empty());
    }

    #[test]
    fn identical_snapshots_produce_nothing(s in snapshot()) {
        prop_assert!(newly_covered_lines(&s, Some(&s)).is_empty());
        prop_assert!(metric_delta(&s, Some(&s)).is_empty());
    }

    #[test]
    fn accumulated_lines_are_exactly_the_extra_ones(
        a in snapshot(),
        extra in prop::collection::btree_set(500u32..1000, 1..10),
    ) {
        let Some(file) = a.covered_lines().keys().next().cloned() else {
            return Ok(());
        };
        let b = a.clone().with_covered_lines(&file, extra.iter().copied());

        let new_lines = newly_covered_lines(&b, Some(&a));
        prop_assert_eq!(new_lines.len(), 1);
        prop_assert_eq!(&new_lines[&file], &extra.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn delta_only_contains_growth(a in snapshot(), b in snapshot()) {
        for (kind, entry) in metric_delta(&b, Some(&a)) {
            let now = b.metric(kind).unwrap();
            prop_assert_eq!(entry.total, now.total());
            prop_assert!(entry.percent.is_finite());
            match a.metric(kind) {
                Some(before) => {
                    prop_assert!(now.covered > before.covered);
                    prop_assert_eq!(entry.covered, now.covered - before.covered);
                }
                None => prop_assert_eq!(entry.covered, now.covered),
            }
        }
    }

    #[test]
    fn new_lines_are_sorted_and_not_previously_covered(a in snapshot(), b in snapshot()) {
        for (file, lines) in newly_covered_lines(&b, Some(&a)) {
            prop_assert!(!lines.is_empty());
            prop_assert!(lines.windows(2).all(|w| w[0] < w[1]));
            let before: BTreeSet<u32> = a.lines_for(&file).cloned().unwrap_or_default();
            prop_assert!(lines.iter().all(|l| !before.contains(l)));
        }
    }
}

#[test]
fn zero_total_kind_has_zero_percent() {
    let a = CoverageSnapshot::default().with_metric(MetricKind::Line, 5, 5);
    let b = CoverageSnapshot::default()
        .with_metric(MetricKind::Line, 5, 5)
        .with_metric(MetricKind::Class, 0, 0);
    let delta = metric_delta(&b, Some(&a));
    assert_eq!(delta[&MetricKind::Class].percent, 0.0);
    assert_eq!(delta[&MetricKind::Class].covered, 0);
}

#[test]
fn positivity_filter() {
    let previous = CoverageSnapshot::default().with_metric(MetricKind::Branch, 50, 50);
    let same = CoverageSnapshot::default().with_metric(MetricKind::Branch, 50, 50);
    assert!(!metric_delta(&same, Some(&previous)).contains_key(&MetricKind::Branch));

    let grown = CoverageSnapshot::default().with_metric(MetricKind::Branch, 45, 55);
    assert_eq!(metric_delta(&grown, Some(&previous))[&MetricKind::Branch].covered, 5);
}
