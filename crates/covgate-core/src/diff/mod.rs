//! Changed-line extraction from version-control diffs.
//!
//! The diff against the base ref is obtained through an ordered list of
//! [`DiffStrategy`] values. Each failed strategy is recorded as a
//! [`StrategyAttempt`] so that, if every strategy fails, the error (or the
//! warning, under [`DiffFailurePolicy::TreatAsEmpty`]) lists exactly what was
//! tried.

pub mod parser;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{ChangedLineSet, CovgateError, Result};
use crate::git::{is_git_repo, run_git};
use crate::paths::PathRules;

pub use parser::{parse_unified_diff, HunkHeader};

/// One way of obtaining the diff for a base ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStrategy {
    /// `git diff origin/<base>...HEAD`
    RemoteTracking,
    /// `git diff <base>...HEAD`
    LocalRef,
    /// `git diff --cached`
    Staged,
}

impl DiffStrategy {
    /// Default fallback order.
    pub const CHAIN: [DiffStrategy; 3] = [Self::RemoteTracking, Self::LocalRef, Self::Staged];

    pub fn name(&self) -> &'static str {
        match self {
            DiffStrategy::RemoteTracking => "remote",
            DiffStrategy::LocalRef => "local",
            DiffStrategy::Staged => "staged",
        }
    }

    /// Arguments passed to `git`.
    pub fn git_args(&self, base: &str) -> Vec<String> {
        // Prefixes are pinned so user diff config cannot change the `+++ b/` form.
        let mut args: Vec<String> = [
            "diff",
            "-U0",
            "--no-color",
            "--no-ext-diff",
            "--src-prefix=a/",
            "--dst-prefix=b/",
        ]
        .iter()
            .map(|s| s.to_string())
            .collect();
        match self {
            DiffStrategy::RemoteTracking => {
                let remote = if base.starts_with("origin/") {
                    base.to_string()
                } else {
                    format!("origin/{base}")
                };
                args.push(format!("{remote}...HEAD"));
            }
            DiffStrategy::LocalRef => args.push(format!("{base}...HEAD")),
            DiffStrategy::Staged => args.push("--cached".to_string()),
        }
        args
    }
}

impl fmt::Display for DiffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed strategy and why it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: DiffStrategy,
    pub command: String,
    pub outcome: String,
}

/// What to do when no strategy yields a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffFailurePolicy {
    /// Abort the gate with [`CovgateError::DiffUnavailable`].
    Error,
    /// Log a warning and continue with no changed lines.
    #[serde(alias = "empty")]
    TreatAsEmpty,
}

impl DiffFailurePolicy {
    /// `Error` under CI (the `CI` variable is set and not `false`/`0`),
    /// `TreatAsEmpty` otherwise.
    pub fn from_env() -> Self {
        Self::for_ci_value(std::env::var("CI").ok().as_deref())
    }

    pub fn for_ci_value(ci: Option<&str>) -> Self {
        match ci.map(str::trim) {
            Some(v) if !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false") => {
                DiffFailurePolicy::Error
            }
            _ => DiffFailurePolicy::TreatAsEmpty,
        }
    }
}

impl FromStr for DiffFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(DiffFailurePolicy::Error),
            "empty" | "treat_as_empty" | "treat-as-empty" => Ok(DiffFailurePolicy::TreatAsEmpty),
            other => Err(format!("unknown diff failure policy: {other} (expected error|empty)")),
        }
    }
}

/// Where diff text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffSource {
    /// Run git in the repository using the strategy chain.
    Git,
    /// Use pre-computed diff text (e.g. from `--diff-file`).
    Text(String),
}

/// Extracts a [`ChangedLineSet`] for a base ref.
#[derive(Debug, Clone)]
pub struct DiffExtractor {
    repo_root: PathBuf,
    strategies: Vec<DiffStrategy>,
    policy: DiffFailurePolicy,
    source: DiffSource,
}

impl DiffExtractor {
    pub fn new(repo_root: impl Into<PathBuf>, policy: DiffFailurePolicy) -> Self {
        Self {
            repo_root: repo_root.into(),
            strategies: DiffStrategy::CHAIN.to_vec(),
            policy,
            source: DiffSource::Git,
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<DiffStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_source(mut self, source: DiffSource) -> Self {
        self.source = source;
        self
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn policy(&self) -> DiffFailurePolicy {
        self.policy
    }

    /// Changed lines relevant to `rules` between `base` and the working change.
    pub fn extract_changed_lines(&self, base: &str, rules: &PathRules) -> Result<ChangedLineSet> {
        let text = match &self.source {
            DiffSource::Text(text) => text.clone(),
            DiffSource::Git => match self.diff_text(base)? {
                Some(text) => text,
                None => return Ok(ChangedLineSet::new()),
            },
        };
        Ok(parse_unified_diff(&text, rules))
    }

    /// Raw diff text from the first strategy that succeeds, or `None` when
    /// every strategy failed and the policy tolerates it.
    pub fn diff_text(&self, base: &str) -> Result<Option<String>> {
        if !is_git_repo(&self.repo_root) {
            return Err(CovgateError::NotAGitRepo(self.repo_root.clone()));
        }

        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            let args = strategy.git_args(base);
            let command = format!("git {}", args.join(" "));
            match run_git(&self.repo_root, &args) {
                Ok(text) => {
                    debug!(strategy = %strategy, bytes = text.len(), "diff obtained");
                    return Ok(Some(text));
                }
                Err(e) => {
                    debug!(strategy = %strategy, error = %e, "diff strategy failed");
                    attempts.push(StrategyAttempt {
                        strategy: *strategy,
                        command,
                        outcome: e.to_string(),
                    });
                }
            }
        }

        let err = CovgateError::DiffUnavailable {
            base: base.to_string(),
            attempts,
        };
        match self.policy {
            DiffFailurePolicy::Error => Err(err),
            DiffFailurePolicy::TreatAsEmpty => {
                warn!(error = %err, "treating change as empty");
                Ok(None)
            }
        }
    }
}
