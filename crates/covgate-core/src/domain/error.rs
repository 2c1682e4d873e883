//! Domain-level error taxonomy for covgate.

use std::path::PathBuf;

use crate::diff::StrategyAttempt;

/// Exit code for a gate that ran to completion and found every partition at
/// or above its threshold.
pub const EXIT_PASS: i32 = 0;

/// Exit code for a gate where at least one partition fell below threshold.
pub const EXIT_COVERAGE_FAILED: i32 = 1;

/// Exit code for misconfiguration and other hard errors.
pub const EXIT_HARD_ERROR: i32 = 2;

/// covgate domain errors.
#[derive(Debug, thiserror::Error)]
pub enum CovgateError {
    #[error("not a git repository: {0} (run covgate from inside the repository checkout)")]
    NotAGitRepo(PathBuf),

    #[error("could not obtain a diff for base '{base}'; tried: {}", format_attempts(.attempts))]
    DiffUnavailable {
        base: String,
        attempts: Vec<StrategyAttempt>,
    },

    #[error("coverage report not found at {}; generate it with `{hint}`", .path.display())]
    ReportMissing { path: PathBuf, hint: String },

    #[error("coverage report {} could not be parsed: {reason}", .path.display())]
    ReportUnreadable { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("git error: {0}")]
    GitError(String),

    #[error("test command failed: {0}")]
    CommandFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CovgateError {
    /// Process exit code for this error. Every error is a hard error; coverage
    /// shortfalls are verdicts, not errors.
    pub fn exit_code(&self) -> i32 {
        EXIT_HARD_ERROR
    }
}

fn format_attempts(attempts: &[StrategyAttempt]) -> String {
    if attempts.is_empty() {
        return "no strategies".to_string();
    }
    attempts
        .iter()
        .map(|a| format!("[{}] `{}` -> {}", a.strategy, a.command, a.outcome))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for covgate domain operations.
pub type Result<T> = std::result::Result<T, CovgateError>;
