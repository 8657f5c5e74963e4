//! Transforms and reactions that shell out
//!
//! Both need a working copy on disk; in-memory copies are rejected.

use std::path::Path;

use async_trait::async_trait;

use crate::error::{DeliveryError, Result};
use crate::process::{DEFAULT_TIMEOUT_MS, ShellCommand};
use crate::registry::reaction::{CodeReaction, CodeReactionInvocation};
use crate::registry::transform::{Transform, TransformInvocation, TransformResult};
use crate::workspace::WorkingCopy;

/// Environment variable carrying the changed files to a reaction, one per line
pub const FILES_CHANGED_ENV: &str = "SHIPWRIGHT_FILES_CHANGED";

/// Prefix for parameter environment variables (`SHIPWRIGHT_PARAM_BIRD=ibis`)
pub const PARAM_ENV_PREFIX: &str = "SHIPWRIGHT_PARAM_";

fn on_disk<'a>(wc: &'a dyn WorkingCopy, what: &str) -> Result<&'a Path> {
    wc.base_dir().ok_or_else(|| {
        DeliveryError::WorkingCopy(format!(
            "{} needs a working copy on disk for {}",
            what,
            wc.repo_ref().slug()
        ))
    })
}

fn param_env_key(key: &str) -> String {
    let key: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("{}{}", PARAM_ENV_PREFIX, key)
}

/// Runs shell commands in the working copy in order.
///
/// A non-zero exit stops the sequence and fails the transform. Whether the
/// transform edited anything is decided by comparing change fingerprints
/// taken before and after the commands.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    commands: Vec<String>,
    timeout_ms: u64,
}

impl CommandTransform {
    pub fn new(commands: Vec<String>) -> Self {
        Self {
            commands,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }
}

#[async_trait]
impl Transform for CommandTransform {
    async fn transform(&self, wc: &mut dyn WorkingCopy, invocation: &TransformInvocation<'_>) -> Result<TransformResult> {
        let dir = on_disk(wc, "command transform")?.to_path_buf();
        let before = wc.change_fingerprint().await?;

        for command in &self.commands {
            let mut shell = ShellCommand::new(command).timeout_ms(self.timeout_ms);
            for key in invocation.parameters.keys() {
                if let Some(value) = invocation.parameter(key) {
                    shell = shell.env(param_env_key(key), value);
                }
            }
            log::debug!("Running '{}' in {}", command, dir.display());
            let output = shell.run(&dir).await?;
            if !output.success() {
                return Ok(TransformResult::failed(output.failure_summary(command)));
            }
        }

        let after = wc.change_fingerprint().await?;
        Ok(if before != after {
            TransformResult::edited()
        } else {
            TransformResult::unchanged()
        })
    }
}

/// Runs one shell command with the changed files in its environment
#[derive(Debug, Clone)]
pub struct CommandReaction {
    command: String,
    timeout_ms: u64,
}

impl CommandReaction {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }
}

#[async_trait]
impl CodeReaction for CommandReaction {
    async fn react(&self, invocation: &CodeReactionInvocation<'_>) -> Result<()> {
        let dir = on_disk(invocation.working_copy, "command reaction")?;
        let output = ShellCommand::new(&self.command)
            .timeout_ms(self.timeout_ms)
            .env(FILES_CHANGED_ENV, invocation.files_changed.join("\n"))
            .env("SHIPWRIGHT_SHA", &invocation.repo.sha)
            .env("SHIPWRIGHT_REPO", invocation.repo.slug())
            .run(dir)
            .await?;
        if !output.success() {
            return Err(DeliveryError::Transform(output.failure_summary(&self.command)));
        }
        Ok(())
    }
}
