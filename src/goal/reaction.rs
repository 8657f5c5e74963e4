//! Code reaction goal: run every registered reaction concurrently

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::error::Result;
use crate::goal::executor::{ExecutionResult, GoalExecutor, GoalInvocation};
use crate::registry::{CodeReactionInvocation, CodeReactionRegistry};
use crate::workspace::WorkingCopyProvider;

pub struct CodeReactionExecutor {
    provider: Arc<dyn WorkingCopyProvider>,
    reactions: Arc<CodeReactionRegistry>,
}

impl CodeReactionExecutor {
    pub fn new(provider: Arc<dyn WorkingCopyProvider>, reactions: Arc<CodeReactionRegistry>) -> Self {
        Self { provider, reactions }
    }
}

#[async_trait]
impl GoalExecutor for CodeReactionExecutor {
    fn name(&self) -> &str {
        "code_reaction"
    }

    /// All reactions share one read-only clone. The first failure fails the
    /// goal, but only after every reaction has finished.
    async fn execute(&self, invocation: &GoalInvocation<'_>) -> Result<ExecutionResult> {
        if self.reactions.is_empty() {
            return Ok(ExecutionResult::no_work("no code reactions registered"));
        }

        let repo = invocation.repo_ref();
        let wc = self
            .provider
            .clone_copy(&invocation.context.credentials, &repo)
            .await?;

        let files_changed = match &invocation.push.before {
            Some(before) => wc.files_changed_since(before).await?,
            None => Vec::new(),
        };
        log::info!(
            "[{}] running {} code reactions over {} changed files",
            invocation.context.correlation_id,
            self.reactions.len(),
            files_changed.len()
        );

        let reaction_invocation = CodeReactionInvocation {
            repo: &repo,
            push: invocation.push,
            working_copy: wc.as_ref(),
            files_changed: &files_changed,
            context: invocation.context,
        };

        let runs = self.reactions.registrations().iter().map(|registration| {
            let reaction_invocation = &reaction_invocation;
            async move {
                let result = registration.reaction().react(reaction_invocation).await;
                if let Err(e) = &result {
                    log::error!("Code reaction {} failed: {}", registration.name(), e);
                }
                result
            }
        });
        join_all(runs).await.into_iter().collect::<Result<Vec<()>>>()?;

        Ok(ExecutionResult::done())
    }
}
