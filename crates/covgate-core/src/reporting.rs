//! Console report rendering and machine-readable gate artifacts.
//!
//! Two outputs are produced for CI consumers:
//! - a human-readable console report per partition plus a gate summary
//! - `covgate.json` with a `covgate.digest` integrity file (`--json-out`)

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{CovgateError, FileCoverageDetail, GateResult, PartitionVerdict, Result};

const RULE_WIDTH: usize = 72;

/// Console rendering knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Missing line numbers shown per file before truncating.
    pub max_missing: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { max_missing: 10 }
    }
}

fn pass_fail(passed: bool) -> &'static str {
    if passed {
        "PASS"
    } else {
        "FAIL"
    }
}

fn glyph(file: &FileCoverageDetail) -> &'static str {
    if file.is_fully_covered() {
        "✓"
    } else if file.covered_lines == 0 {
        "✗"
    } else {
        "~"
    }
}

/// Render the first `max` missing lines with contiguous runs collapsed
/// (`3-5, 9`) and a `(+N more)` suffix for the rest.
pub fn missing_preview(missing: &[u32], max: usize) -> String {
    let shown = &missing[..missing.len().min(max)];
    let mut parts: Vec<String> = Vec::new();
    let mut i = 0;
    while i < shown.len() {
        let start = shown[i];
        let mut end = start;
        while i + 1 < shown.len() && shown[i + 1] == end + 1 {
            i += 1;
            end = shown[i];
        }
        parts.push(if start == end {
            start.to_string()
        } else {
            format!("{start}-{end}")
        });
        i += 1;
    }

    let mut out = parts.join(", ");
    let hidden = missing.len() - shown.len();
    if hidden > 0 {
        let _ = write!(out, " (+{hidden} more)");
    }
    out
}

/// Console report for one partition.
pub fn render_partition_report(verdict: &PartitionVerdict, opts: &RenderOptions) -> String {
    let mut out = String::new();
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    let _ = writeln!(out, "{heavy}");
    if verdict.vacuous {
        let _ = writeln!(
            out,
            "Diff coverage [{}]: no changed source lines (threshold {:.2}%)  PASS",
            verdict.partition, verdict.threshold
        );
        let _ = writeln!(out, "{heavy}");
        return out;
    }

    let _ = writeln!(
        out,
        "Diff coverage [{}]: {:.2}% (threshold {:.2}%)  {}",
        verdict.partition,
        verdict.percentage,
        verdict.threshold,
        pass_fail(verdict.passed)
    );
    let _ = writeln!(
        out,
        "  {}/{} changed lines covered across {} file(s)",
        verdict.covered_lines,
        verdict.changed_lines,
        verdict.files.len()
    );
    if verdict.test_command_failed {
        let _ = writeln!(
            out,
            "  ! test command exited non-zero; figures come from the report it left behind"
        );
    }
    let _ = writeln!(out, "{light}");

    let count_width = verdict
        .files
        .iter()
        .map(|f| format!("{}/{}", f.covered_lines, f.changed_lines).len())
        .max()
        .unwrap_or(3);

    for file in &verdict.files {
        let counts = format!("{}/{}", file.covered_lines, file.changed_lines);
        let _ = write!(
            out,
            "  {} {:>6.2}%  {:>width$}  {}",
            glyph(file),
            file.percentage,
            counts,
            file.path,
            width = count_width
        );
        if !file.missing_lines.is_empty() {
            let _ = write!(
                out,
                "  missing: {}",
                missing_preview(&file.missing_lines, opts.max_missing)
            );
        }
        if !file.has_coverage_data() {
            let _ = write!(out, "  [no coverage data]");
        }
        out.push('\n');
    }
    let _ = writeln!(out, "{heavy}");
    out
}

/// Consolidated pass/fail table across partitions.
pub fn render_gate_summary(result: &GateResult) -> String {
    let mut out = String::new();
    let name_width = result
        .partitions
        .iter()
        .map(|p| p.partition.len())
        .max()
        .unwrap_or(0);

    let _ = writeln!(out, "Diff coverage gate summary");
    for p in &result.partitions {
        let _ = write!(
            out,
            "  {}  {:<width$}  {:>6.2}%  (threshold {:.2}%)",
            pass_fail(p.passed),
            p.partition,
            p.percentage,
            p.threshold,
            width = name_width
        );
        if p.vacuous {
            let _ = write!(out, "  [no changes]");
        }
        out.push('\n');
    }

    let failed = result.failed_partitions().count();
    if result.passed {
        let _ = writeln!(out, "Overall: PASS");
    } else {
        let _ = writeln!(
            out,
            "Overall: FAIL ({failed} of {} partition(s) below threshold)",
            result.partitions.len()
        );
    }
    out
}

// ── covgate.json artifact ─────────────────────────────────────────────────

/// Machine-readable record of one gate run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateArtifact {
    pub generated_at: DateTime<Utc>,
    pub head_sha: Option<String>,
    pub result: GateResult,
}

impl GateArtifact {
    pub fn new(result: GateResult, head_sha: Option<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            head_sha,
            result,
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Persist `<dir>/covgate.json` and `<dir>/covgate.digest`.
pub fn write_gate_artifact(artifact: &GateArtifact, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join("covgate.json");
    let digest_path = dir.join("covgate.digest");
    let json = serde_json::to_vec_pretty(artifact)?;

    std::fs::write(&path, &json)?;
    std::fs::write(&digest_path, sha256_hex(&json).as_bytes())?;

    Ok(path)
}

/// Read `<dir>/covgate.json` and verify it against `covgate.digest`.
pub fn read_gate_artifact(dir: &Path) -> Result<GateArtifact> {
    let json = std::fs::read(dir.join("covgate.json"))?;
    let digest = std::fs::read_to_string(dir.join("covgate.digest"))?;
    let actual = sha256_hex(&json);
    if digest.trim() != actual {
        return Err(CovgateError::DigestMismatch {
            expected: digest.trim().to_string(),
            actual,
        });
    }
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, covered: usize, changed: usize, missing: Vec<u32>) -> FileCoverageDetail {
        FileCoverageDetail {
            path: path.to_string(),
            matched_report_path: Some(path.to_string()),
            changed_lines: changed,
            covered_lines: covered,
            percentage: crate::domain::coverage_percent(covered, changed),
            missing_lines: missing,
        }
    }

    #[test]
    fn test_missing_preview_collapses_runs() {
        assert_eq!(missing_preview(&[1, 2, 3, 7, 9, 10], 10), "1-3, 7, 9-10");
    }

    #[test]
    fn test_missing_preview_truncates() {
        let missing: Vec<u32> = (1..=25).step_by(2).collect();
        let preview = missing_preview(&missing, 3);
        assert_eq!(preview, "1, 3, 5 (+10 more)");
    }

    #[test]
    fn test_missing_preview_empty() {
        assert_eq!(missing_preview(&[], 10), "");
    }

    #[test]
    fn test_partition_report_contents() {
        let verdict = PartitionVerdict {
            partition: "frontend".to_string(),
            percentage: 66.666_666,
            threshold: 80.0,
            passed: false,
            covered_lines: 10,
            changed_lines: 15,
            files: vec![
                file("src/d.ts", 0, 5, vec![1, 2, 3, 4, 5]),
                file("src/c.ts", 10, 10, vec![]),
            ],
            vacuous: false,
            test_command_failed: true,
        };
        let out = render_partition_report(&verdict, &RenderOptions::default());
        assert!(out.contains("Diff coverage [frontend]: 66.67% (threshold 80.00%)  FAIL"));
        assert!(out.contains("0/5"));
        assert!(out.contains("missing: 1-5"));
        assert!(out.contains("✓ 100.00%"));
        assert!(out.contains("test command exited non-zero"));
        let d = out.find("src/d.ts").unwrap();
        let c = out.find("src/c.ts").unwrap();
        assert!(d < c);
    }

    #[test]
    fn test_unmatched_file_flagged() {
        let mut f = file("src/new.ts", 0, 1, vec![5]);
        f.matched_report_path = None;
        let verdict = PartitionVerdict {
            partition: "frontend".to_string(),
            percentage: 0.0,
            threshold: 80.0,
            passed: false,
            covered_lines: 0,
            changed_lines: 1,
            files: vec![f],
            vacuous: false,
            test_command_failed: false,
        };
        let out = render_partition_report(&verdict, &RenderOptions::default());
        assert!(out.contains("[no coverage data]"));
    }

    #[test]
    fn test_gate_summary() {
        let mut a = PartitionVerdict::vacuous("backend", 80.0);
        a.vacuous = false;
        a.percentage = 95.0;
        let mut b = PartitionVerdict::vacuous("frontend", 80.0);
        b.vacuous = false;
        b.percentage = 70.0;
        b.passed = false;
        let out = render_gate_summary(&GateResult::from_verdicts(vec![a, b]));
        assert!(out.contains("PASS  backend"));
        assert!(out.contains("FAIL  frontend"));
        assert!(out.contains("Overall: FAIL (1 of 2"));
    }

    #[test]
    fn test_artifact_digest_round_trip_and_tamper() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = GateArtifact::new(
            GateResult::from_verdicts(vec![PartitionVerdict::vacuous("backend", 80.0)]),
            Some("abc123".to_string()),
        );
        write_gate_artifact(&artifact, dir.path()).unwrap();
        let read = read_gate_artifact(dir.path()).unwrap();
        assert_eq!(read, artifact);

        std::fs::write(dir.path().join("covgate.json"), b"{}").unwrap();
        let err = read_gate_artifact(dir.path()).unwrap_err();
        assert!(matches!(err, CovgateError::DigestMismatch { .. }));
    }
}
