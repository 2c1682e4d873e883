//! Multi-partition gate orchestration.

use std::sync::Arc;
use std::time::Instant;

use covgate_core::obs::emit_gate_finished;
use covgate_core::{DiffExtractor, DiffSource, GateResult, PartitionVerdict, Result};
use futures::future::join_all;
use tracing::info;

use crate::config::GateConfig;
use crate::partition::PartitionRunner;
use crate::runner::CoverageRegenerator;

/// Runs every configured partition and folds the verdicts into one result.
///
/// Verdicts keep configuration order whether partitions run sequentially
/// or concurrently. The gate passes only when every partition passes; a
/// hard error in any partition aborts the gate.
#[derive(Clone)]
pub struct GateOrchestrator {
    config: GateConfig,
    runner: PartitionRunner,
}

impl GateOrchestrator {
    pub fn new(config: GateConfig) -> Self {
        let extractor = DiffExtractor::new(&config.repo_root, config.diff_failure_policy());
        Self {
            runner: PartitionRunner::new(extractor),
            config,
        }
    }

    /// Use pre-computed diff text instead of running git.
    pub fn with_diff_source(mut self, source: DiffSource) -> Self {
        self.runner = self.runner.with_diff_source(source);
        self
    }

    pub fn with_regenerator(mut self, regenerator: Arc<dyn CoverageRegenerator>) -> Self {
        self.runner = self.runner.with_regenerator(regenerator);
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<GateResult> {
        self.config.validate()?;
        let start = Instant::now();
        info!(
            partitions = self.config.partitions.len(),
            parallel = self.config.parallel,
            "starting coverage gate"
        );

        let verdicts = if self.config.parallel {
            self.run_parallel().await?
        } else {
            self.run_sequential().await?
        };

        let result = GateResult::from_verdicts(verdicts);
        emit_gate_finished(&result, start.elapsed().as_millis() as u64);
        Ok(result)
    }

    async fn run_sequential(&self) -> Result<Vec<PartitionVerdict>> {
        let mut verdicts = Vec::with_capacity(self.config.partitions.len());
        for partition in &self.config.partitions {
            verdicts.push(self.runner.run(partition).await?);
        }
        Ok(verdicts)
    }

    async fn run_parallel(&self) -> Result<Vec<PartitionVerdict>> {
        let runs = self
            .config
            .partitions
            .iter()
            .map(|partition| self.runner.run(partition));
        join_all(runs).await.into_iter().collect()
    }
}
