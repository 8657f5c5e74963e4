//! Shell command execution
//!
//! Runs `sh -c <command>` in a working directory with extra environment and a
//! timeout. Command transforms, command reactions and command goals all run
//! through here; the builder spawns its own long-running process.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{DeliveryError, Result};

/// Default timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;

/// A shell command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    /// The command line, run with `sh -c`
    pub command: String,
    /// Environment variables to set
    pub env: Vec<(String, String)>,
    /// Timeout in milliseconds
    pub timeout_ms: u64,
}

impl ShellCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            env: Vec::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Add an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the timeout in milliseconds
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Build the tokio command without running it
    pub fn to_command(&self, dir: &Path) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.command);
        cmd.current_dir(dir);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run to completion, capturing output
    pub async fn run(&self, dir: &Path) -> Result<ProcessOutput> {
        let mut cmd = self.to_command(dir);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

        let child = cmd.spawn()?;

        let timeout = tokio::time::Duration::from_millis(self.timeout_ms);
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DeliveryError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("'{}' timed out after {}ms", self.command, self.timeout_ms),
                )));
            }
        };

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// One-line explanation of a failed run
    pub fn failure_summary(&self, command: &str) -> String {
        let exit = match self.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("'{}' failed with {}", command, exit)
        } else {
            format!("'{}' failed with {}: {}", command, exit, stderr)
        }
    }
}
