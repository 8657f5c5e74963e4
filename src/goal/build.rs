//! Build goal: start a build and wait for it to finish

use std::sync::Arc;

use async_trait::async_trait;

use crate::build::Builder;
use crate::error::{DeliveryError, Result};
use crate::goal::executor::{ExecutionResult, GoalExecutor, GoalInvocation};

pub struct BuildExecutor {
    builder: Arc<Builder>,
}

impl BuildExecutor {
    pub fn new(builder: Arc<Builder>) -> Self {
        Self { builder }
    }
}

#[async_trait]
impl GoalExecutor for BuildExecutor {
    fn name(&self) -> &str {
        "build"
    }

    async fn execute(&self, invocation: &GoalInvocation<'_>) -> Result<ExecutionResult> {
        let repo = invocation.repo_ref();
        let running = self
            .builder
            .build(&invocation.context.credentials, &repo, &invocation.context.team_id)
            .await?;
        let outcome = running.wait().await?;

        if !outcome.succeeded() {
            return Err(DeliveryError::Build(outcome.message));
        }
        Ok(ExecutionResult::Done {
            description: None,
            target_url: outcome.artifact_url,
        })
    }
}
