//! Test command execution.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use covgate_core::{CovgateError, Result};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::TestCommand;

/// Lines of stderr echoed when a test command fails.
const STDERR_TAIL_LINES: usize = 20;

/// Result of running a test command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Rendered command line.
    pub command: String,

    /// Exit code; -1 when the process was killed by a signal.
    pub exit_code: i32,

    pub stdout: String,

    pub stderr: String,

    pub duration_ms: u64,

    pub success: bool,
}

impl CommandResult {
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// Last `n` lines of stderr.
    pub fn stderr_tail(&self, n: usize) -> String {
        let lines: Vec<&str> = self.stderr.lines().collect();
        lines[lines.len().saturating_sub(n)..].join("\n")
    }
}

/// Runs test commands as child processes.
pub struct TestCommandRunner;

impl TestCommandRunner {
    /// Run `command` to completion.
    ///
    /// The child is killed if the timeout elapses or the returned future is
    /// dropped, so Ctrl-C on the gate does not leave test runs behind.
    pub async fn execute(command: &TestCommand) -> Result<CommandResult> {
        let start = Instant::now();
        let rendered = command.display();

        let (exe, args) = command.argv.split_first().ok_or_else(|| {
            CovgateError::CommandFailed("test command is empty".to_string())
        })?;

        info!(command = %rendered, workdir = %command.workdir.display(), "running test command");

        let child = Command::new(exe)
            .args(args)
            .current_dir(&command.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CovgateError::CommandFailed(format!("cannot start `{rendered}`: {e}")))?;

        let output = if command.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(command.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| {
                CovgateError::CommandFailed(format!(
                    "`{rendered}` timed out after {} seconds",
                    command.timeout_secs
                ))
            })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let result = CommandResult {
            command: rendered,
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
            success: output.status.success(),
        };

        debug!(stdout = %result.stdout, "test command stdout");
        if result.passed() {
            info!(command = %result.command, duration_ms, "test command finished");
        } else {
            warn!(
                command = %result.command,
                exit_code = result.exit_code,
                duration_ms,
                stderr = %result.stderr_tail(STDERR_TAIL_LINES),
                "test command exited non-zero"
            );
        }
        Ok(result)
    }
}

/// Produces a fresh coverage report for a partition.
#[async_trait]
pub trait CoverageRegenerator: Send + Sync {
    async fn regenerate(&self, command: &TestCommand) -> Result<CommandResult>;
}

/// Regenerates reports by running the test command as a child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRegenerator;

#[async_trait]
impl CoverageRegenerator for ProcessRegenerator {
    async fn regenerate(&self, command: &TestCommand) -> Result<CommandResult> {
        TestCommandRunner::execute(command).await
    }
}
