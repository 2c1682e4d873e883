//! Per-file, per-partition and gate-wide coverage verdicts.

use serde::{Deserialize, Serialize};

use super::error::{EXIT_COVERAGE_FAILED, EXIT_PASS};

/// `covered / changed * 100`, or 100.0 when nothing changed.
pub fn coverage_percent(covered: usize, changed: usize) -> f64 {
    if changed == 0 {
        return 100.0;
    }
    let pct = covered as f64 / changed as f64 * 100.0;
    pct.clamp(0.0, 100.0)
}

/// Diff coverage of one changed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCoverageDetail {
    /// Path as it appeared in the diff (normalized).
    pub path: String,

    /// Report key the path was matched against, if any.
    pub matched_report_path: Option<String>,

    pub changed_lines: usize,
    pub covered_lines: usize,

    /// In `[0, 100]`.
    pub percentage: f64,

    /// Changed lines not marked executed, ascending.
    pub missing_lines: Vec<u32>,
}

impl FileCoverageDetail {
    pub fn has_coverage_data(&self) -> bool {
        self.matched_report_path.is_some()
    }

    pub fn is_fully_covered(&self) -> bool {
        self.missing_lines.is_empty()
    }
}

/// Verdict for one partition (e.g. "backend").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionVerdict {
    pub partition: String,
    pub percentage: f64,
    pub threshold: f64,
    pub passed: bool,
    pub covered_lines: usize,
    pub changed_lines: usize,

    /// Sorted by ascending percentage, worst first.
    pub files: Vec<FileCoverageDetail>,

    /// True when the verdict passed because there was nothing to measure.
    #[serde(default)]
    pub vacuous: bool,

    /// The regeneration command exited non-zero but left a usable report.
    #[serde(default)]
    pub test_command_failed: bool,
}

impl PartitionVerdict {
    /// Pass verdict for a partition whose diff touched no relevant lines.
    pub fn vacuous(partition: impl Into<String>, threshold: f64) -> Self {
        Self {
            partition: partition.into(),
            percentage: 100.0,
            threshold,
            passed: true,
            covered_lines: 0,
            changed_lines: 0,
            files: Vec::new(),
            vacuous: true,
            test_command_failed: false,
        }
    }

    pub fn uncovered_files(&self) -> impl Iterator<Item = &FileCoverageDetail> {
        self.files.iter().filter(|f| !f.is_fully_covered())
    }
}

/// Combined verdict across every configured partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    /// In configuration order.
    pub partitions: Vec<PartitionVerdict>,
    pub passed: bool,
}

impl GateResult {
    pub fn from_verdicts(partitions: Vec<PartitionVerdict>) -> Self {
        let passed = partitions.iter().all(|p| p.passed);
        Self { partitions, passed }
    }

    pub fn failed_partitions(&self) -> impl Iterator<Item = &PartitionVerdict> {
        self.partitions.iter().filter(|p| !p.passed)
    }

    /// `0` when every partition passed, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.passed {
            EXIT_PASS
        } else {
            EXIT_COVERAGE_FAILED
        }
    }
}
