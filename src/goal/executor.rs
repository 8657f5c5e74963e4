//! The executor seam between the state machine and the work a goal does

use async_trait::async_trait;

use crate::domain::{Goal, InvocationContext, Push, RepoRef, Status};
use crate::error::Result;

/// What an executor did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Work completed. `description` overrides the goal's completed description.
    Done {
        description: Option<String>,
        target_url: Option<String>,
    },
    /// Nothing applied to this push
    NoWork { reason: String },
}

impl ExecutionResult {
    pub fn done() -> Self {
        ExecutionResult::Done {
            description: None,
            target_url: None,
        }
    }

    pub fn no_work(reason: impl Into<String>) -> Self {
        ExecutionResult::NoWork { reason: reason.into() }
    }
}

/// Input to one goal execution
#[derive(Debug, Clone, Copy)]
pub struct GoalInvocation<'a> {
    pub goal: &'a Goal,
    /// The pending status that triggered this execution
    pub status: &'a Status,
    pub push: &'a Push,
    pub context: &'a InvocationContext,
}

impl GoalInvocation<'_> {
    /// The repository at the commit the status was written on
    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(&self.push.owner, &self.push.repo, &self.status.commit_sha).with_branch(&self.push.branch)
    }
}

/// Performs the work of a goal. Errors are turned into terminal statuses by
/// the state machine; executors never write the goal's own status.
#[async_trait]
pub trait GoalExecutor: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn execute(&self, invocation: &GoalInvocation<'_>) -> Result<ExecutionResult>;
}
