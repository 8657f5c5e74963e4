//! Command goals such as deploy and verify

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{DeliveryError, Result};
use crate::goal::executor::{ExecutionResult, GoalExecutor, GoalInvocation};
use crate::process::ShellCommand;
use crate::workspace::WorkingCopyProvider;

/// Runs a shell command in a clone of the commit; exit status decides the goal
pub struct CommandExecutor {
    provider: Arc<dyn WorkingCopyProvider>,
    command: ShellCommand,
}

impl CommandExecutor {
    pub fn new(provider: Arc<dyn WorkingCopyProvider>, command: ShellCommand) -> Self {
        Self { provider, command }
    }
}

#[async_trait]
impl GoalExecutor for CommandExecutor {
    fn name(&self) -> &str {
        &self.command.command
    }

    async fn execute(&self, invocation: &GoalInvocation<'_>) -> Result<ExecutionResult> {
        let repo = invocation.repo_ref();
        let wc = self
            .provider
            .clone_copy(&invocation.context.credentials, &repo)
            .await?;
        let dir = wc.base_dir().ok_or_else(|| {
            DeliveryError::WorkingCopy(format!("'{}' needs a clone on disk", self.command.command))
        })?;

        let output = self
            .command
            .clone()
            .env("SHIPWRIGHT_SHA", &repo.sha)
            .env("SHIPWRIGHT_REPO", repo.slug())
            .env("SHIPWRIGHT_BRANCH", &invocation.push.branch)
            .run(dir)
            .await?;

        if !output.success() {
            return Err(DeliveryError::Command(output.failure_summary(&self.command.command)));
        }
        Ok(ExecutionResult::done())
    }
}
