//! Structured observability hooks for the gate lifecycle.
//!
//! Events are emitted at `info!` level unless noted; filter with `RUST_LOG`.

use tracing::{info, warn};

use crate::domain::{GateResult, PartitionVerdict};

/// Span covering one partition's run. Attach with `Instrument::instrument`
/// so it survives `.await` points.
pub fn partition_span(partition: &str) -> tracing::Span {
    tracing::info_span!("covgate.partition", partition = %partition)
}

pub fn emit_partition_started(partition: &str, base: &str, threshold: f64) {
    info!(event = "partition.started", partition = %partition, base = %base, threshold = threshold);
}

pub fn emit_diff_extracted(partition: &str, files: usize, lines: usize) {
    info!(event = "diff.extracted", partition = %partition, files = files, lines = lines);
}

pub fn emit_report_ingested(partition: &str, report: &str, files: usize) {
    info!(event = "report.ingested", partition = %partition, report = %report, files = files);
}

/// Warning level: the test command failed but left a usable report.
pub fn emit_test_command_failed(partition: &str, exit_code: i32) {
    warn!(
        event = "test_command.failed",
        partition = %partition,
        exit_code = exit_code,
        "test command failed; continuing with the report it produced"
    );
}

pub fn emit_partition_evaluated(verdict: &PartitionVerdict) {
    info!(
        event = "partition.evaluated",
        partition = %verdict.partition,
        percentage = verdict.percentage,
        threshold = verdict.threshold,
        covered = verdict.covered_lines,
        changed = verdict.changed_lines,
        passed = verdict.passed,
        vacuous = verdict.vacuous,
    );
}

pub fn emit_gate_finished(result: &GateResult, duration_ms: u64) {
    info!(
        event = "gate.finished",
        partitions = result.partitions.len(),
        failed = result.failed_partitions().count(),
        passed = result.passed,
        duration_ms = duration_ms,
    );
}
