//! End-to-end calculator scenarios: diff text + report text -> verdict.

use covgate_core::{
    evaluate_partition, parse_unified_diff, LcovIngester, PathRules, ReportIngester,
};

fn lcov(text: &str) -> covgate_core::LineExecutionMap {
    LcovIngester.parse_str(text, &PathRules::default()).unwrap()
}

#[test]
fn three_line_hunk_with_uninstrumented_line() {
    let changed = parse_unified_diff(
        "--- a/a.ts\n+++ b/a.ts\n@@ -5,0 +10,3 @@\n+x\n+y\n+z\n",
        &PathRules::default(),
    );
    let coverage = lcov("SF:a.ts\nDA:10,1\nDA:11,1\nend_of_record\n");

    let verdict = evaluate_partition("frontend", 80.0, &changed, &coverage);

    let file = &verdict.files[0];
    assert_eq!(format!("{:.2}", file.percentage), "66.67");
    assert_eq!(file.missing_lines, vec![12]);
    assert!(!verdict.passed);
}

#[test]
fn empty_diff_passes_regardless_of_threshold() {
    let changed = parse_unified_diff("", &PathRules::default());
    let coverage = lcov("SF:a.ts\nDA:1,0\nend_of_record\n");

    for threshold in [0.0, 80.0, 100.0] {
        let verdict = evaluate_partition("frontend", threshold, &changed, &coverage);
        assert_eq!(verdict.percentage, 100.0);
        assert!(verdict.passed);
    }
}

#[test]
fn changed_file_missing_from_report() {
    let changed = parse_unified_diff(
        "--- a/b.ts\n+++ b/b.ts\n@@ -5 +5 @@\n-old\n+new\n",
        &PathRules::default(),
    );
    let coverage = lcov("SF:a.ts\nDA:5,1\nend_of_record\n");

    let verdict = evaluate_partition("frontend", 80.0, &changed, &coverage);
    assert_eq!(verdict.changed_lines, 1);
    assert_eq!(verdict.covered_lines, 0);
    assert_eq!(verdict.files[0].percentage, 0.0);
    assert_eq!(verdict.files[0].missing_lines, vec![5]);
}

#[test]
fn two_files_aggregate_worst_first() {
    let changed = parse_unified_diff(
        "\
--- a/c.ts
+++ b/c.ts
@@ -0,0 +1,10 @@
+1
+2
+3
+4
+5
+6
+7
+8
+9
+10
--- a/d.ts
+++ b/d.ts
@@ -0,0 +1,5 @@
+1
+2
+3
+4
+5
",
        &PathRules::default(),
    );
    let mut report = String::from("SF:c.ts\n");
    for line in 1..=10 {
        report.push_str(&format!("DA:{line},1\n"));
    }
    report.push_str("end_of_record\nSF:d.ts\n");
    for line in 1..=5 {
        report.push_str(&format!("DA:{line},0\n"));
    }
    report.push_str("end_of_record\n");

    let verdict = evaluate_partition("frontend", 80.0, &changed, &lcov(&report));
    assert_eq!(format!("{:.2}", verdict.percentage), "66.67");
    assert!(!verdict.passed);
    let order: Vec<&str> = verdict.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(order, vec!["d.ts", "c.ts"]);
}

#[test]
fn malformed_record_between_good_records() {
    let coverage = lcov("SF:src/m.rs\nDA:3,1\nDA:4;1\nDA:5,2\nend_of_record\n");
    assert_eq!(coverage.executed("src/m.rs", 3), Some(true));
    assert_eq!(coverage.executed("src/m.rs", 5), Some(true));
    assert_eq!(coverage.executed("src/m.rs", 4), None);
}
