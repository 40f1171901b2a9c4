// Composition tests — the full clique pipeline from table to export.
//
// Covers the concrete grouping scenarios (disjoint pairs, triangle,
// overlapping cliques, rank filter, threshold boundary, permutation
// stability) and the report invariants, without touching the network.
// Export tests write to the system temp dir.

use std::sync::Mutex;
use std::time::Duration;

use corank::analysis::clique::CliqueBudget;
use corank::analysis::control::{CancelFlag, ProgressSink, RunControl};
use corank::analysis::normalize::{ColumnSelection, DroppedRows};
use corank::analysis::overlap::OverlapStrategy;
use corank::analysis::report::GroupingReport;
use corank::analysis::{analyze, AnalysisOptions};
use corank::error::AnalysisError;
use corank::output::export::{self, ExportFormat};
use corank::table::Table;

// ============================================================
// Helpers
// ============================================================

fn table_from(rows: &[(&str, &str, &str)]) -> Table {
    let mut t = Table::new(&["Keyword", "URL", "Position"]);
    for (k, u, r) in rows {
        t.push_row([*k, *u, *r]);
    }
    t
}

/// Rows for a keyword ranking the given URLs at positions 1, 2, 3, ...
fn ranked(keyword: &'static str, urls: &[&'static str]) -> Vec<(&'static str, &'static str, String)> {
    urls.iter()
        .enumerate()
        .map(|(i, u)| (keyword, *u, (i + 1).to_string()))
        .collect()
}

fn build(groups: &[Vec<(&'static str, &'static str, String)>]) -> Table {
    let mut t = Table::new(&["Keyword", "URL", "Position"]);
    for rows in groups {
        for (k, u, r) in rows {
            t.push_row([*k, *u, r.as_str()]);
        }
    }
    t
}

fn options(threshold: u32, min_group_size: usize) -> AnalysisOptions {
    AnalysisOptions::new(ColumnSelection::new("Keyword", "URL", "Position"))
        .with_top_n(10)
        .with_threshold(threshold)
        .with_min_group_size(min_group_size)
}

fn run(table: &Table, options: &AnalysisOptions) -> GroupingReport {
    analyze(table, options, &RunControl::default()).unwrap()
}

fn groups(report: &GroupingReport) -> Vec<Vec<&str>> {
    report
        .groups
        .iter()
        .map(|g| g.keywords.iter().map(String::as_str).collect())
        .collect()
}

/// a, b, c mutually similar; c, d similar; a, d not.
fn scenario_c() -> Table {
    build(&[
        ranked("a", &["u1", "u2", "u3", "u4", "u5", "u6", "x1"]),
        ranked("b", &["u1", "u2", "u3", "u4", "u5", "u6", "x2"]),
        ranked("c", &["u1", "u2", "u3", "u4", "u5", "v1", "v2", "v3", "v4", "v5"]),
        ranked("d", &["v1", "v2", "v3", "v4", "v5", "y1"]),
    ])
}

// ============================================================
// Scenarios
// ============================================================

#[test]
fn scenario_a_disjoint_pairs() {
    let table = build(&[
        ranked("kw1", &["u1", "u2", "u3", "u4", "u5"]),
        ranked("kw2", &["u1", "u2", "u3", "u4", "u5"]),
        ranked("kw3", &["u6", "u7", "u8", "u9", "u10"]),
    ]);
    let report = run(&table, &options(50, 2));
    assert_eq!(groups(&report), vec![vec!["kw1", "kw2"]]);
    assert_eq!(report.groups[0].group_id, 1);
    assert_eq!(report.groups[0].size(), 2);
}

#[test]
fn scenario_b_triangle_clique() {
    // Each pair shares exactly 4 of its 5 URLs
    let table = build(&[
        ranked("a", &["s1", "s2", "s3", "s4", "xa"]),
        ranked("b", &["s1", "s2", "s3", "s4", "xb"]),
        ranked("c", &["s1", "s2", "s3", "s4", "xc"]),
    ]);
    let report = run(&table, &options(30, 3));
    assert_eq!(groups(&report), vec![vec!["a", "b", "c"]]);
}

#[test]
fn scenario_c_overlapping_cliques() {
    let report = run(&scenario_c(), &options(50, 2));
    assert_eq!(groups(&report), vec![vec!["a", "b", "c"], vec!["c", "d"]]);
    assert_eq!(report.groups[0].group_id, 1);
    assert_eq!(report.groups[1].group_id, 2);
    assert_eq!(report.groups[1].size(), 2);
}

#[test]
fn scenario_d_rank_filter() {
    let mut rows = ranked("a", &["u1", "u2", "u3", "u4", "u5"]);
    for (i, u) in ["u1", "u2", "u3", "u4", "u5"].iter().enumerate() {
        rows.push(("b", *u, (i + 11).to_string()));
    }
    let report = run(&build(&[rows]), &options(50, 2));
    assert!(report.is_empty());
    assert_eq!(report.stats.keywords, 1, "b has nothing inside the window");
}

#[test]
fn scenario_e_threshold_boundary() {
    let five = build(&[
        ranked("a", &["u1", "u2", "u3", "u4", "u5", "a6"]),
        ranked("b", &["u1", "u2", "u3", "u4", "u5", "b6"]),
    ]);
    assert_eq!(run(&five, &options(50, 2)).groups.len(), 1);

    let four = build(&[
        ranked("a", &["u1", "u2", "u3", "u4", "a5", "a6"]),
        ranked("b", &["u1", "u2", "u3", "u4", "b5", "b6"]),
    ]);
    assert!(run(&four, &options(50, 2)).is_empty());
}

#[test]
fn scenario_f_permutation_stability() {
    let forward = scenario_c();
    let mut reversed = Table::new(forward.columns());
    for row in forward.rows().iter().rev() {
        reversed.push_row(row.iter().map(String::as_str));
    }

    let a = run(&forward, &options(50, 2));
    let b = run(&reversed, &options(50, 2));
    assert_eq!(a, b);
    assert_eq!(
        export::grouping_csv(&a).unwrap(),
        export::grouping_csv(&b).unwrap(),
        "exports must be byte-identical"
    );
}

// ============================================================
// Boundary behaviours
// ============================================================

#[test]
fn threshold_100_requires_identical_full_windows() {
    let ten: Vec<&'static str> = vec!["u1", "u2", "u3", "u4", "u5", "u6", "u7", "u8", "u9", "u10"];
    let table = build(&[
        ranked("full_a", &ten),
        ranked("full_b", &ten),
        // identical to each other but only five URLs each
        ranked("short_a", &ten[..5]),
        ranked("short_b", &ten[..5]),
    ]);
    let report = run(&table, &options(100, 2));
    assert_eq!(groups(&report), vec![vec!["full_a", "full_b"]]);
}

#[test]
fn threshold_100_counts_shared_urls_not_set_equality() {
    // "a" holds an eleventh URL tied at rank 3. The ten it shares with "b"
    // already make 100% of the window.
    let ten: Vec<&'static str> = vec!["u1", "u2", "u3", "u4", "u5", "u6", "u7", "u8", "u9", "u10"];
    let mut rows = ranked("a", &ten);
    rows.push(("a", "extra", "3".to_string()));
    let table = build(&[rows, ranked("b", &ten)]);
    let report = run(&table, &options(100, 2));
    assert_eq!(groups(&report), vec![vec!["a", "b"]]);
}

#[test]
fn threshold_0_makes_one_clique_of_everything() {
    let table = build(&[
        ranked("a", &["u1"]),
        ranked("b", &["u2"]),
        ranked("c", &["u3"]),
        ranked("d", &["u4"]),
    ]);
    for strategy in [OverlapStrategy::Pairwise, OverlapStrategy::InvertedIndex] {
        let report = run(&table, &options(0, 2).with_strategy(strategy));
        assert_eq!(groups(&report), vec![vec!["a", "b", "c", "d"]]);
    }
}

#[test]
fn no_edges_gives_empty_report() {
    let table = build(&[ranked("a", &["u1", "u2"]), ranked("b", &["u3", "u4"])]);
    let report = run(&table, &options(10, 2));
    assert!(report.is_empty());
    assert!(report.rows().is_empty());
}

#[test]
fn single_keyword_gives_empty_report() {
    let table = build(&[ranked("solo", &["u1", "u2", "u3"])]);
    for threshold in [0, 50, 100] {
        assert!(run(&table, &options(threshold, 2)).is_empty());
    }
}

// ============================================================
// Report invariants on a denser input
// ============================================================

fn dense_table() -> Table {
    // Twelve keywords drawing URLs from overlapping pools
    let pools: [&[&'static str]; 12] = [
        &["p1", "p2", "p3", "p4", "p5", "q1"],
        &["p1", "p2", "p3", "p4", "q1", "q2"],
        &["p1", "p2", "p3", "q1", "q2", "q3"],
        &["p2", "p3", "q1", "q2", "q3", "r1"],
        &["q1", "q2", "q3", "r1", "r2", "r3"],
        &["q2", "q3", "r1", "r2", "r3", "s1"],
        &["r1", "r2", "r3", "s1", "s2", "p1"],
        &["s1", "s2", "s3", "p1", "p2", "r1"],
        &["s1", "s2", "s3", "s4", "p1", "p2"],
        &["p1", "p2", "p3", "p4", "p5", "p6"],
        &["t1", "t2", "t3"],
        &["p1", "q1", "r1", "s1", "t1", "p2"],
    ];
    let names = ["k00", "k01", "k02", "k03", "k04", "k05", "k06", "k07", "k08", "k09", "k10", "k11"];
    let rows: Vec<_> = names
        .iter()
        .zip(pools.iter())
        .map(|(n, p)| ranked(*n, p))
        .collect();
    build(&rows)
}

#[test]
fn dense_report_satisfies_invariants() {
    let table = dense_table();
    for threshold in [20, 30, 40, 50] {
        let opts = options(threshold, 2);
        let report = run(&table, &opts);

        // URL sets for checking pairwise similarity directly
        let set_of = |kw: &str| -> std::collections::HashSet<&str> {
            table
                .rows()
                .iter()
                .filter(|r| r[0] == kw)
                .map(|r| r[1].as_str())
                .collect()
        };
        let similar = |a: &str, b: &str| {
            let shared = set_of(a).intersection(&set_of(b)).count() as u32;
            100 * shared >= threshold * 10
        };
        let all_keywords: Vec<String> = {
            let mut k: Vec<String> = table.rows().iter().map(|r| r[0].clone()).collect();
            k.sort();
            k.dedup();
            k
        };

        for (i, group) in report.groups.iter().enumerate() {
            // contiguous ids
            assert_eq!(group.group_id, i + 1);
            // size filter
            assert!(group.size() >= 2);
            // ascending members
            assert!(group.keywords.windows(2).all(|w| w[0] < w[1]));
            // pairwise similarity
            for a in &group.keywords {
                for b in &group.keywords {
                    if a != b {
                        assert!(similar(a, b), "{a} ~ {b} below {threshold}%");
                    }
                }
            }
            // maximality
            for outsider in all_keywords.iter().filter(|k| !group.keywords.contains(k)) {
                assert!(
                    !group.keywords.iter().all(|m| similar(m, outsider)),
                    "group {} extendable by {outsider} at {threshold}%",
                    group.group_id
                );
            }
        }

        // ordering: (-size, smallest member)
        for w in report.groups.windows(2) {
            let (x, y) = (&w[0], &w[1]);
            assert!(
                x.size() > y.size() || (x.size() == y.size() && x.keywords <= y.keywords),
                "groups {} and {} out of order",
                x.group_id,
                y.group_id
            );
        }
    }
}

#[test]
fn strategies_produce_identical_reports() {
    let table = dense_table();
    for threshold in [10, 30, 50] {
        let pairwise = run(&table, &options(threshold, 2).with_strategy(OverlapStrategy::Pairwise));
        let inverted = run(&table, &options(threshold, 2).with_strategy(OverlapStrategy::InvertedIndex));
        assert_eq!(pairwise, inverted, "strategies disagree at {threshold}%");
    }
}

#[test]
fn rerun_is_byte_identical() {
    let table = dense_table();
    let a = export::grouping_csv(&run(&table, &options(30, 2))).unwrap();
    let b = export::grouping_csv(&run(&table, &options(30, 2))).unwrap();
    assert_eq!(a, b);
}

// ============================================================
// Coercion, configuration, and run control
// ============================================================

#[test]
fn dropped_rows_are_counted_not_fatal() {
    let table = table_from(&[
        ("a", "u1", "1"),
        ("a", "u2", "2"),
        ("b", "u1", "1"),
        ("b", "u2", "two"),
        ("b", "u2", "2.0"),
        ("", "u3", "3"),
        ("c", "", "1"),
    ]);
    let report = run(&table, &options(20, 2));
    assert_eq!(report.stats.rows_read, 7);
    assert_eq!(report.stats.dropped.total(), 3);
    assert_eq!(groups(&report), vec![vec!["a", "b"]]);
}

#[test]
fn oversized_rank_is_kept_but_outside_the_window() {
    let table = table_from(&[
        ("a", "u1", "1"),
        ("b", "u1", "1"),
        ("b", "u2", "4294967296"),
    ]);
    let report = run(&table, &options(10, 2));
    assert_eq!(report.stats.dropped.total(), 0);
    assert_eq!(groups(&report), vec![vec!["a", "b"]]);
}

#[test]
fn unknown_column_is_a_configuration_error() {
    let table = table_from(&[("a", "u1", "1")]);
    let opts = AnalysisOptions::new(ColumnSelection::new("Keyword", "Landing Page", "Position"));
    let err = analyze(&table, &opts, &RunControl::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::Configuration(_)));
    assert!(err.to_string().contains("Landing Page"));
}

#[test]
fn cancellation_returns_no_report() {
    let control = RunControl::default();
    control.cancel.cancel();
    let err = analyze(&scenario_c(), &options(50, 2), &control).unwrap_err();
    assert_eq!(err, AnalysisError::Cancelled);
}

/// Records every notification the analyzer sends.
#[derive(Default)]
struct RecordingSink {
    dropped: Mutex<Vec<DroppedRows>>,
    pairs: Mutex<Vec<(u64, u64)>>,
    cliques: Mutex<Vec<usize>>,
}

impl ProgressSink for RecordingSink {
    fn rows_dropped(&self, dropped: &DroppedRows) {
        self.dropped.lock().unwrap().push(*dropped);
    }

    fn pairs_processed(&self, done: u64, total: u64) {
        self.pairs.lock().unwrap().push((done, total));
    }

    fn cliques_found(&self, count: usize) {
        self.cliques.lock().unwrap().push(count);
    }
}

#[test]
fn progress_sink_sees_every_stage() {
    let mut table = scenario_c();
    table.push_row(["", "u1", "1"]);
    table.push_row(["a", "u9", "first"]);

    for strategy in [OverlapStrategy::Pairwise, OverlapStrategy::InvertedIndex] {
        let sink = RecordingSink::default();
        let control = RunControl::new(&sink, CancelFlag::new());
        let report = analyze(&table, &options(50, 2).with_strategy(strategy), &control).unwrap();
        assert_eq!(groups(&report), vec![vec!["a", "b", "c"], vec!["c", "d"]]);

        let dropped = sink.dropped.lock().unwrap();
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].empty_keyword, 1);
        assert_eq!(dropped[0].invalid_rank, 1);

        // 4 keywords -> 6 pairs, reported monotonically and ending complete
        let pairs = sink.pairs.lock().unwrap();
        assert_eq!(pairs.last(), Some(&(6, 6)));
        assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(pairs.iter().all(|&(_, total)| total == 6));

        assert_eq!(*sink.cliques.lock().unwrap(), vec![2]);
    }
}

#[test]
fn clique_budget_aborts_the_whole_run() {
    let opts = options(50, 2).with_budget(CliqueBudget {
        max_cliques: Some(1),
        max_duration: None,
    });
    let err = analyze(&scenario_c(), &opts, &RunControl::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::ResourceBudgetExceeded { limit: 1, .. }));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn time_budget_aborts_the_whole_run() {
    let opts = options(20, 2).with_budget(CliqueBudget {
        max_cliques: None,
        max_duration: Some(Duration::from_nanos(1)),
    });
    let err = analyze(&dense_table(), &opts, &RunControl::default()).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::ResourceBudgetExceeded { what: "enumeration seconds", .. }
    ));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn parameters_block_describes_the_run() {
    let report = run(&scenario_c(), &options(50, 3));
    let p = &report.parameters;
    assert_eq!(p.keyword_column, "Keyword");
    assert_eq!(p.url_column, "URL");
    assert_eq!(p.rank_column, "Position");
    assert_eq!((p.top_n, p.threshold_pct, p.min_group_size), (10, 50, 3));
    assert_eq!(groups(&report), vec![vec!["a", "b", "c"]]);
}

// ============================================================
// Export
// ============================================================

#[test]
fn csv_export_writes_table_and_parameters_sheet() {
    let report = run(&scenario_c(), &options(50, 2));
    let dir = std::env::temp_dir().join(format!("corank-export-{}", std::process::id()));
    let path = dir.join("groups.csv");

    let written = export::write_grouping_report(&report, &path, ExportFormat::Csv).unwrap();
    assert_eq!(written.len(), 2);

    let table = std::fs::read_to_string(&written[0]).unwrap();
    assert_eq!(
        table,
        "group_id,keyword,group_size\n1,a,3\n1,b,3\n1,c,3\n2,c,2\n2,d,2\n"
    );
    let params = std::fs::read_to_string(&written[1]).unwrap();
    assert!(params.starts_with("parameter,value\n"));
    assert!(params.contains("threshold_pct,50\n"));
    assert!(params.contains("keyword_column,Keyword\n"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn json_export_holds_parameters_stats_and_groups() {
    let report = run(&scenario_c(), &options(50, 2));
    let dir = std::env::temp_dir().join(format!("corank-json-{}", std::process::id()));
    let path = dir.join("groups.json");

    export::write_grouping_report(&report, &path, ExportFormat::Json).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["parameters"]["top_n"], 10);
    assert_eq!(value["stats"]["keywords"], 4);
    assert_eq!(value["groups"][1]["keywords"][1], "d");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn empty_report_still_exports_header() {
    let table = build(&[ranked("solo", &["u1"])]);
    let report = run(&table, &options(50, 2));
    assert_eq!(
        export::grouping_csv(&report).unwrap(),
        "group_id,keyword,group_size\n"
    );
}
