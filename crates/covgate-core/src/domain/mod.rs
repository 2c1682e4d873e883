//! Domain models for covgate.
//!
//! Canonical definitions for the entities that flow through a gate run:
//! - `ChangedLineSet`: lines touched by the change, per file
//! - `LineExecutionMap`: instrumented lines and whether they ran, per file
//! - `FileCoverageDetail` / `PartitionVerdict` / `GateResult`: derived verdicts

pub mod changed;
pub mod coverage;
pub mod error;
pub mod verdict;

pub use changed::ChangedLineSet;
pub use coverage::{FileLineStats, LineExecutionMap};
pub use error::{CovgateError, Result, EXIT_COVERAGE_FAILED, EXIT_HARD_ERROR, EXIT_PASS};
pub use verdict::{coverage_percent, FileCoverageDetail, GateResult, PartitionVerdict};
