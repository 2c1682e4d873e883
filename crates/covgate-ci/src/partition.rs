//! Single-partition pipeline: diff, optional regeneration, ingestion,
//! evaluation.

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use covgate_core::obs::{
    emit_diff_extracted, emit_partition_evaluated, emit_partition_started, emit_report_ingested,
    emit_test_command_failed, partition_span,
};
use covgate_core::{
    evaluate_partition, ChangedLineSet, CovgateError, DiffExtractor, DiffSource, PartitionVerdict,
    PathRules, Result,
};
use tracing::{debug, warn, Instrument};

use crate::config::{PartitionConfig, Regenerate};
use crate::runner::{CoverageRegenerator, ProcessRegenerator};

/// Runs one partition end to end.
#[derive(Clone)]
pub struct PartitionRunner {
    extractor: DiffExtractor,
    regenerator: Arc<dyn CoverageRegenerator>,
}

impl PartitionRunner {
    pub fn new(extractor: DiffExtractor) -> Self {
        Self {
            extractor,
            regenerator: Arc::new(ProcessRegenerator),
        }
    }

    pub fn with_regenerator(mut self, regenerator: Arc<dyn CoverageRegenerator>) -> Self {
        self.regenerator = regenerator;
        self
    }

    pub fn with_diff_source(mut self, source: DiffSource) -> Self {
        self.extractor = self.extractor.with_source(source);
        self
    }

    pub fn repo_root(&self) -> &Path {
        self.extractor.repo_root()
    }

    /// Produce the partition's verdict.
    ///
    /// A partition with no relevant changed lines passes without touching
    /// its report or running its test command.
    pub async fn run(&self, config: &PartitionConfig) -> Result<PartitionVerdict> {
        self.run_inner(config)
            .instrument(partition_span(&config.name))
            .await
    }

    async fn run_inner(&self, config: &PartitionConfig) -> Result<PartitionVerdict> {
        emit_partition_started(&config.name, &config.base_ref, config.threshold);

        let rules = config.path_rules();
        let changed = self.changed_lines(&config.base_ref, &rules).await?;
        emit_diff_extracted(&config.name, changed.file_count(), changed.total_lines());

        if changed.is_empty() {
            let verdict = PartitionVerdict::vacuous(&config.name, config.threshold);
            emit_partition_evaluated(&verdict);
            return Ok(verdict);
        }

        let repo_root = self.repo_root();
        let report_path = config.report_path(repo_root);
        let command = config.test_command(repo_root);

        let should_regenerate = match config.regenerate {
            Regenerate::Never => false,
            Regenerate::IfMissing => !report_path.is_file(),
            Regenerate::Always => true,
        };

        let mut test_command_failed = false;
        if should_regenerate {
            let before = report_modified(&report_path);
            let result = self.regenerator.regenerate(&command).await?;
            let rewritten = report_path.is_file() && report_modified(&report_path) != before;
            if !result.passed() {
                // A failed run may only be evaluated against a report it wrote.
                if !rewritten {
                    return Err(CovgateError::CommandFailed(format!(
                        "partition '{}': `{}` exited with code {} and produced no new report at {}",
                        config.name,
                        result.command,
                        result.exit_code,
                        report_path.display()
                    )));
                }
                emit_test_command_failed(&config.name, result.exit_code);
                test_command_failed = true;
            } else if !rewritten {
                warn!(
                    partition = %config.name,
                    report = %report_path.display(),
                    "test command passed but left the report untouched"
                );
            }
        }

        let ingester = config.format.ingester();
        let coverage = ingester
            .parse_report(&report_path, &rules)
            .map_err(|e| match e {
                CovgateError::ReportMissing { path, .. } => CovgateError::ReportMissing {
                    path,
                    hint: command.display(),
                },
                other => other,
            })?;
        emit_report_ingested(
            &config.name,
            &report_path.display().to_string(),
            coverage.file_count(),
        );

        let mut verdict =
            evaluate_partition(&config.name, config.threshold, &changed, &coverage);
        verdict.test_command_failed = test_command_failed;
        emit_partition_evaluated(&verdict);
        Ok(verdict)
    }

    /// Diff extraction shells out to git, so it runs on the blocking pool.
    async fn changed_lines(&self, base: &str, rules: &PathRules) -> Result<ChangedLineSet> {
        let extractor = self.extractor.clone();
        let base = base.to_string();
        let rules = rules.clone();
        debug!(base = %base, "extracting changed lines");
        tokio::task::spawn_blocking(move || extractor.extract_changed_lines(&base, &rules))
            .await
            .map_err(|e| CovgateError::GitError(format!("diff task failed: {e}")))?
    }
}

fn report_modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
