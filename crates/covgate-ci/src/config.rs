//! Gate and partition configuration.
//!
//! Configuration is an immutable value handed to each component; nothing
//! reads settings from globals. A `covgate.toml` looks like:
//!
//! ```toml
//! on_diff_failure = "error"
//!
//! [[partition]]
//! name = "backend"
//! format = "coverage_py"
//! report = "backend/coverage.json"
//! workdir = "backend"
//! include = ["backend"]
//! strip_prefixes = ["backend"]
//!
//! [[partition]]
//! name = "frontend"
//! format = "lcov"
//! report = "frontend/coverage/lcov.info"
//! threshold = 90.0
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use covgate_core::{CovgateError, DiffFailurePolicy, PathRules, ReportFormat, Result};
use serde::{Deserialize, Serialize};

use crate::command::TestCommand;

pub const DEFAULT_BASE_REF: &str = "main";
pub const DEFAULT_THRESHOLD: f64 = 80.0;
/// Zero: the invoking CI system owns timeouts unless a partition sets one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 0;

fn default_base_ref() -> String {
    DEFAULT_BASE_REF.to_string()
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_repo_root() -> PathBuf {
    PathBuf::from(".")
}

/// When to run the partition's test command before reading its report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regenerate {
    /// Read the existing report; a missing report is a hard error.
    #[default]
    Never,
    /// Run the test command only when the report does not exist.
    IfMissing,
    /// Always run the test command first.
    Always,
}

/// One independently tested slice of the codebase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionConfig {
    pub name: String,

    pub format: ReportFormat,

    /// Report path, relative to the repository root unless absolute.
    /// Defaults to the format's conventional location.
    #[serde(default)]
    pub report: Option<PathBuf>,

    #[serde(default = "default_base_ref", alias = "base")]
    pub base_ref: String,

    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default)]
    pub regenerate: Regenerate,

    /// Overrides the format's default test command.
    #[serde(default)]
    pub test_command: Option<Vec<String>>,

    /// Directory the test command runs in, relative to the repository root.
    #[serde(default)]
    pub workdir: Option<PathBuf>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extensions left empty take the format's defaults; `["*"]` allows any.
    #[serde(flatten)]
    pub paths: PathRules,
}

impl PartitionConfig {
    pub fn new(name: impl Into<String>, format: ReportFormat) -> Self {
        Self {
            name: name.into(),
            format,
            report: None,
            base_ref: default_base_ref(),
            threshold: DEFAULT_THRESHOLD,
            regenerate: Regenerate::Never,
            test_command: None,
            workdir: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            paths: PathRules::default(),
        }
    }

    pub fn with_report(mut self, report: impl Into<PathBuf>) -> Self {
        self.report = Some(report.into());
        self
    }

    pub fn with_base_ref(mut self, base: impl Into<String>) -> Self {
        self.base_ref = base.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_regenerate(mut self, regenerate: Regenerate) -> Self {
        self.regenerate = regenerate;
        self
    }

    pub fn with_test_command(mut self, argv: Vec<String>) -> Self {
        self.test_command = Some(argv);
        self
    }

    pub fn with_paths(mut self, paths: PathRules) -> Self {
        self.paths = paths;
        self
    }

    /// Path rules with format defaults applied.
    pub fn path_rules(&self) -> PathRules {
        let mut rules = self.paths.clone();
        if rules.extensions.is_empty() {
            rules.extensions = self.format.default_extensions();
        } else if rules.extensions.iter().any(|e| e == "*") {
            rules.extensions.clear();
        }
        rules
    }

    pub fn report_path(&self, repo_root: &Path) -> PathBuf {
        let report = self
            .report
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.format.default_report_path()));
        if report.is_absolute() {
            report
        } else {
            repo_root.join(report)
        }
    }

    pub fn test_command(&self, repo_root: &Path) -> TestCommand {
        let workdir = match &self.workdir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => repo_root.join(dir),
            None => repo_root.to_path_buf(),
        };
        match &self.test_command {
            Some(argv) => TestCommand::custom(argv.clone(), workdir, self.timeout_secs),
            None => TestCommand::from_format(self.format, workdir, self.timeout_secs),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CovgateError::InvalidConfig(
                "partition name must not be empty".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.threshold) {
            return Err(CovgateError::InvalidConfig(format!(
                "partition '{}': threshold {} is outside [0, 100]",
                self.name, self.threshold
            )));
        }
        if self.base_ref.trim().is_empty() {
            return Err(CovgateError::InvalidConfig(format!(
                "partition '{}': base ref must not be empty",
                self.name
            )));
        }
        if let Some(argv) = &self.test_command {
            if argv.is_empty() || argv[0].trim().is_empty() {
                return Err(CovgateError::InvalidConfig(format!(
                    "partition '{}': test_command must not be empty",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Whole-gate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_repo_root")]
    pub repo_root: PathBuf,

    /// Unset means [`DiffFailurePolicy::from_env`].
    #[serde(default)]
    pub on_diff_failure: Option<DiffFailurePolicy>,

    /// Run partitions concurrently.
    #[serde(default)]
    pub parallel: bool,

    #[serde(default, rename = "partition")]
    pub partitions: Vec<PartitionConfig>,
}

impl GateConfig {
    pub fn new(repo_root: impl Into<PathBuf>, partitions: Vec<PartitionConfig>) -> Self {
        Self {
            repo_root: repo_root.into(),
            on_diff_failure: None,
            parallel: false,
            partitions,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CovgateError::InvalidConfig(e.to_string()))
    }

    /// Load a TOML file. A relative `repo_root` is resolved against the
    /// file's directory.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CovgateError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&text).map_err(|e| match e {
            CovgateError::InvalidConfig(msg) => {
                CovgateError::InvalidConfig(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
        if config.repo_root.is_relative() {
            if let Some(dir) = path.parent() {
                config.repo_root = dir.join(&config.repo_root);
            }
        }
        Ok(config)
    }

    pub fn diff_failure_policy(&self) -> DiffFailurePolicy {
        self.on_diff_failure
            .unwrap_or_else(DiffFailurePolicy::from_env)
    }

    pub fn validate(&self) -> Result<()> {
        if self.partitions.is_empty() {
            return Err(CovgateError::InvalidConfig(
                "at least one partition must be configured".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for partition in &self.partitions {
            partition.validate()?;
            if !seen.insert(partition.name.as_str()) {
                return Err(CovgateError::InvalidConfig(format!(
                    "duplicate partition name '{}'",
                    partition.name
                )));
            }
        }
        Ok(())
    }
}
