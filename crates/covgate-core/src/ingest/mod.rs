//! Coverage report ingestion.
//!
//! Every supported report format implements [`ReportIngester`] and produces
//! the same [`LineExecutionMap`], so the calculator never needs to know which
//! tool produced the report.

pub mod coverage_py;
pub mod istanbul;
pub mod lcov;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{CovgateError, LineExecutionMap, Result};
use crate::paths::PathRules;

pub use coverage_py::CoveragePyIngester;
pub use istanbul::IstanbulIngester;
pub use lcov::LcovIngester;

/// Parser for one coverage report format.
pub trait ReportIngester: Send + Sync {
    fn format(&self) -> ReportFormat;

    /// Parse report text. Paths are normalized through `rules`.
    fn parse_str(&self, text: &str, rules: &PathRules) -> Result<LineExecutionMap>;

    /// Read and parse a report file.
    ///
    /// A missing file is an error naming the command that regenerates it;
    /// it never yields an empty map.
    fn parse_report(&self, path: &Path, rules: &PathRules) -> Result<LineExecutionMap> {
        if !path.is_file() {
            return Err(CovgateError::ReportMissing {
                path: path.to_path_buf(),
                hint: self.format().regenerate_hint(),
            });
        }

        let text = std::fs::read_to_string(path)?;
        let map = self.parse_str(&text, rules).map_err(|e| match e {
            CovgateError::Serialization(e) => CovgateError::ReportUnreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
            other => other,
        })?;

        info!(
            format = %self.format(),
            report = %path.display(),
            files = map.file_count(),
            "coverage report ingested"
        );
        Ok(map)
    }
}

/// Supported coverage report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// LCOV tracefile (`SF:` / `DA:` / `end_of_record`).
    Lcov,
    /// coverage.py JSON report (`coverage json`).
    #[serde(alias = "coverage-py", alias = "coveragepy")]
    CoveragePy,
    /// Istanbul/nyc `coverage-final.json`.
    Istanbul,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 3] = [Self::Lcov, Self::CoveragePy, Self::Istanbul];

    pub fn name(&self) -> &'static str {
        match self {
            ReportFormat::Lcov => "lcov",
            ReportFormat::CoveragePy => "coverage_py",
            ReportFormat::Istanbul => "istanbul",
        }
    }

    pub fn ingester(&self) -> Box<dyn ReportIngester> {
        match self {
            ReportFormat::Lcov => Box::new(LcovIngester),
            ReportFormat::CoveragePy => Box::new(CoveragePyIngester),
            ReportFormat::Istanbul => Box::new(IstanbulIngester),
        }
    }

    pub fn default_report_path(&self) -> &'static str {
        match self {
            ReportFormat::Lcov => "lcov.info",
            ReportFormat::CoveragePy => "coverage.json",
            ReportFormat::Istanbul => "coverage/coverage-final.json",
        }
    }

    /// Command that produces the default report.
    pub fn default_test_command(&self) -> Vec<String> {
        let argv: &[&str] = match self {
            ReportFormat::Lcov => &["cargo", "llvm-cov", "--lcov", "--output-path", "lcov.info"],
            ReportFormat::CoveragePy => &["pytest", "--cov", "--cov-report=json"],
            ReportFormat::Istanbul => &["npx", "jest", "--coverage", "--coverageReporters=json"],
        };
        argv.iter().map(|s| s.to_string()).collect()
    }

    pub fn default_extensions(&self) -> Vec<String> {
        let exts: &[&str] = match self {
            ReportFormat::Lcov => &[
                "rs", "c", "cc", "cpp", "h", "hpp", "js", "jsx", "ts", "tsx", "mjs", "cjs",
            ],
            ReportFormat::CoveragePy => &["py"],
            ReportFormat::Istanbul => &["js", "jsx", "ts", "tsx", "mjs", "cjs", "vue", "svelte"],
        };
        exts.iter().map(|s| s.to_string()).collect()
    }

    /// Shell-ready form of [`Self::default_test_command`] for error messages.
    pub fn regenerate_hint(&self) -> String {
        self.default_test_command().join(" ")
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "lcov" => Ok(ReportFormat::Lcov),
            "coverage_py" | "coveragepy" | "python" => Ok(ReportFormat::CoveragePy),
            "istanbul" | "nyc" | "jest" => Ok(ReportFormat::Istanbul),
            other => Err(format!(
                "unknown report format: {other} (expected lcov|coverage_py|istanbul)"
            )),
        }
    }
}
