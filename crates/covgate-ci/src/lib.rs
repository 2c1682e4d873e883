//! covgate CI - partition runner and gate orchestration
//!
//! Provides the layer between configuration and the core calculator:
//! - Loads `covgate.toml` gate configuration
//! - Optionally runs each partition's test command to (re)generate its report
//! - Folds per-partition verdicts into one gate result

pub mod command;
pub mod config;
pub mod gate;
pub mod partition;
pub mod runner;

// Re-export key types
pub use command::TestCommand;
pub use config::{GateConfig, PartitionConfig, Regenerate};
pub use gate::GateOrchestrator;
pub use partition::PartitionRunner;
pub use runner::{CommandResult, CoverageRegenerator, ProcessRegenerator, TestCommandRunner};
