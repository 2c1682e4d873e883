//! Diff coverage calculation.
//!
//! Intersects a [`ChangedLineSet`] with a [`LineExecutionMap`]. A changed
//! line counts as covered only when the report marks it executed; lines the
//! report never instrumented, and files the report does not mention at all,
//! count as missing.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::{
    coverage_percent, ChangedLineSet, FileCoverageDetail, LineExecutionMap, PartitionVerdict,
};
use crate::paths::find_report_key;

/// Aggregate diff coverage for one partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffCoverage {
    /// `covered_lines / changed_lines * 100`, or 100.0 when nothing changed.
    pub percentage: f64,
    pub covered_lines: usize,
    pub changed_lines: usize,
    /// Worst coverage first.
    pub files: Vec<FileCoverageDetail>,
}

/// Compute diff coverage of `changed` against `coverage`.
pub fn compute_diff_coverage(
    changed: &ChangedLineSet,
    coverage: &LineExecutionMap,
) -> DiffCoverage {
    let mut files = Vec::with_capacity(changed.file_count());
    let mut covered_total = 0usize;
    let mut changed_total = 0usize;

    for (path, lines) in changed.iter() {
        if lines.is_empty() {
            continue;
        }

        let matched = find_report_key(path, coverage.paths());
        let executed = matched.and_then(|key| coverage.file(key));

        let mut covered = 0usize;
        let mut missing = Vec::new();
        for &line in lines {
            let hit = executed
                .and_then(|m| m.get(&line).copied())
                .unwrap_or(false);
            if hit {
                covered += 1;
            } else {
                missing.push(line);
            }
        }

        covered_total += covered;
        changed_total += lines.len();
        files.push(FileCoverageDetail {
            path: path.to_string(),
            matched_report_path: matched.map(str::to_string),
            changed_lines: lines.len(),
            covered_lines: covered,
            percentage: coverage_percent(covered, lines.len()),
            missing_lines: missing,
        });
    }

    files.sort_by(worst_first);

    DiffCoverage {
        percentage: coverage_percent(covered_total, changed_total),
        covered_lines: covered_total,
        changed_lines: changed_total,
        files,
    }
}

/// Ascending percentage; more missing lines first among equals; then path.
fn worst_first(a: &FileCoverageDetail, b: &FileCoverageDetail) -> Ordering {
    a.percentage
        .total_cmp(&b.percentage)
        .then_with(|| b.missing_lines.len().cmp(&a.missing_lines.len()))
        .then_with(|| a.path.cmp(&b.path))
}

/// Compute diff coverage and judge it against `threshold`.
pub fn evaluate_partition(
    partition: &str,
    threshold: f64,
    changed: &ChangedLineSet,
    coverage: &LineExecutionMap,
) -> PartitionVerdict {
    if changed.is_empty() {
        return PartitionVerdict::vacuous(partition, threshold);
    }

    let result = compute_diff_coverage(changed, coverage);
    PartitionVerdict {
        partition: partition.to_string(),
        passed: result.percentage >= threshold,
        percentage: result.percentage,
        threshold,
        covered_lines: result.covered_lines,
        changed_lines: result.changed_lines,
        files: result.files,
        vacuous: result.changed_lines == 0,
        test_command_failed: false,
    }
}
