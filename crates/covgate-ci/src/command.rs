//! Test commands that (re)generate a partition's coverage report.

use std::path::PathBuf;

use covgate_core::ReportFormat;
use serde::{Deserialize, Serialize};

/// A test command to run in a working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCommand {
    /// Program followed by its arguments.
    pub argv: Vec<String>,

    pub workdir: PathBuf,

    /// Zero disables the timeout.
    pub timeout_secs: u64,

    /// Report format this command produces, when it is a format default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ReportFormat>,
}

impl TestCommand {
    /// The conventional coverage command for `format`.
    pub fn from_format(format: ReportFormat, workdir: PathBuf, timeout_secs: u64) -> Self {
        Self {
            argv: format.default_test_command(),
            workdir,
            timeout_secs,
            format: Some(format),
        }
    }

    pub fn custom(argv: Vec<String>, workdir: PathBuf, timeout_secs: u64) -> Self {
        Self {
            argv,
            workdir,
            timeout_secs,
            format: None,
        }
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Shell-like rendering for logs and error hints.
    pub fn display(&self) -> String {
        self.argv
            .iter()
            .map(|arg| {
                if arg.is_empty() || arg.contains(char::is_whitespace) {
                    format!("'{arg}'")
                } else {
                    arg.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
