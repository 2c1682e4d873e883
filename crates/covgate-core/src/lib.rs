//! covgate core library
//!
//! Diff-scoped coverage: which of the lines a change touches were executed
//! by the test suite.
//!
//! - [`diff`]: changed-line extraction from `git diff -U0`
//! - [`ingest`]: coverage report parsing behind [`ReportIngester`]
//! - [`calculator`]: intersection of the two into a verdict
//! - [`reporting`]: console rendering and JSON artifacts

pub mod calculator;
pub mod diff;
pub mod domain;
pub mod git;
pub mod ingest;
pub mod obs;
pub mod paths;
pub mod reporting;
pub mod telemetry;

pub use calculator::{compute_diff_coverage, evaluate_partition, DiffCoverage};
pub use diff::{
    parse_unified_diff, DiffExtractor, DiffFailurePolicy, DiffSource, DiffStrategy,
    StrategyAttempt,
};
pub use domain::{
    coverage_percent, ChangedLineSet, CovgateError, FileCoverageDetail, FileLineStats,
    GateResult, LineExecutionMap, PartitionVerdict, Result, EXIT_COVERAGE_FAILED,
    EXIT_HARD_ERROR, EXIT_PASS,
};
pub use git::{capture_head_sha, is_git_repo};
pub use ingest::{
    CoveragePyIngester, IstanbulIngester, LcovIngester, ReportFormat, ReportIngester,
};
pub use paths::{find_report_key, paths_match, PathRules};
pub use reporting::{
    missing_preview, read_gate_artifact, render_gate_summary, render_partition_report,
    write_gate_artifact, GateArtifact, RenderOptions,
};
pub use telemetry::init_tracing;

/// covgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
