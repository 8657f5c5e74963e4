//! Autofix goal: apply registered transforms and push the result

use std::sync::Arc;

use async_trait::async_trait;

use crate::autofix::TransformExecutor;
use crate::error::Result;
use crate::goal::executor::{ExecutionResult, GoalExecutor, GoalInvocation};
use crate::id::short_sha;
use crate::registry::TransformRegistry;
use crate::workspace::WorkingCopyProvider;

pub struct AutofixExecutor {
    provider: Arc<dyn WorkingCopyProvider>,
    registry: Arc<TransformRegistry>,
    executor: TransformExecutor,
}

impl AutofixExecutor {
    pub fn new(provider: Arc<dyn WorkingCopyProvider>, registry: Arc<TransformRegistry>) -> Self {
        Self {
            provider,
            registry,
            executor: TransformExecutor::new(),
        }
    }

    /// Use an executor carrying parameter overrides
    pub fn with_executor(mut self, executor: TransformExecutor) -> Self {
        self.executor = executor;
        self
    }
}

#[async_trait]
impl GoalExecutor for AutofixExecutor {
    fn name(&self) -> &str {
        "autofix"
    }

    async fn execute(&self, invocation: &GoalInvocation<'_>) -> Result<ExecutionResult> {
        if self.registry.is_empty() {
            return Ok(ExecutionResult::no_work("no autofixes registered"));
        }

        let repo = invocation.repo_ref();
        let mut wc = self
            .provider
            .clone_copy(&invocation.context.credentials, &repo)
            .await?;

        let relevant = self
            .executor
            .relevant(self.registry.registrations(), invocation.push, wc.as_ref(), invocation.context)
            .await?;
        log::info!(
            "[{}] {} of {} autofixes apply to {}",
            invocation.context.correlation_id,
            relevant.len(),
            self.registry.len(),
            repo.sha
        );
        if relevant.is_empty() {
            return Ok(ExecutionResult::no_work("no applicable autofixes"));
        }

        let outcome = self
            .executor
            .apply(&relevant, wc.as_mut(), invocation.push, invocation.context)
            .await?;
        match outcome.commit_sha {
            Some(sha) => Ok(ExecutionResult::Done {
                description: Some(format!(
                    "{} ({} applied in {})",
                    invocation.goal.completed_description(),
                    outcome.applied.join(", "),
                    short_sha(&sha)
                )),
                target_url: None,
            }),
            None => Ok(ExecutionResult::no_work("no autofix changed the code")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autofix::marker_for;
    use crate::domain::{Credentials, Goal, InvocationContext, Push, RepoRef, Status};
    use crate::error::DeliveryError;
    use crate::pushtest::{Always, HasFile};
    use crate::registry::{Transform, TransformInvocation, TransformRegistration, TransformResult};
    use crate::workspace::{InMemoryProvider, InMemoryWorkingCopy, WorkingCopy};

    struct AddThing;

    #[async_trait]
    impl Transform for AddThing {
        async fn transform(&self, wc: &mut dyn WorkingCopy, _inv: &TransformInvocation<'_>) -> Result<TransformResult> {
            wc.write_file("thing", "1").await?;
            Ok(TransformResult::edited())
        }
    }

    fn provider() -> InMemoryProvider {
        let repo = RepoRef::new("acme", "widget", "head").with_branch("main");
        InMemoryProvider::new(InMemoryWorkingCopy::new(repo, &[("src/Thing.ts", "x")]))
    }

    async fn run(provider: &InMemoryProvider, registry: TransformRegistry, push: &Push) -> Result<ExecutionResult> {
        let goal = Goal::new("autofix", "Autofix");
        let status = Status::pending("head", "autofix");
        let ctx = InvocationContext::new("T1", Credentials::token(""));
        let invocation = GoalInvocation {
            goal: &goal,
            status: &status,
            push,
            context: &ctx,
        };
        AutofixExecutor::new(Arc::new(provider.clone()), Arc::new(registry))
            .execute(&invocation)
            .await
    }

    fn push() -> Push {
        Push::new("acme", "widget", "main", "head").with_commit("head", "change")
    }

    #[tokio::test]
    async fn test_empty_registry_does_not_clone() {
        let provider = provider();
        let result = run(&provider, TransformRegistry::new(), &push()).await.unwrap();
        assert!(matches!(result, ExecutionResult::NoWork { .. }));
        assert_eq!(provider.clone_count(), 0);
    }

    #[tokio::test]
    async fn test_edit_is_committed_and_pushed() {
        let provider = provider();
        let registry = TransformRegistry::new()
            .with(TransformRegistration::new("AddThing", Arc::new(Always), Arc::new(AddThing)))
            .unwrap();
        let result = run(&provider, registry, &push()).await.unwrap();

        assert!(matches!(result, ExecutionResult::Done { .. }));
        let wc = provider.last_clone().unwrap();
        assert_eq!(wc.commits().len(), 1);
        assert!(wc.commits()[0].message.contains(&marker_for("AddThing")));
        assert_eq!(wc.pushed().len(), 1);
    }

    #[tokio::test]
    async fn test_push_test_excludes_transform() {
        let provider = provider();
        let registry = TransformRegistry::new()
            .with(TransformRegistration::new(
                "AddThing",
                Arc::new(HasFile::new("**/*.java").unwrap()),
                Arc::new(AddThing),
            ))
            .unwrap();
        let result = run(&provider, registry, &push()).await.unwrap();
        assert!(matches!(result, ExecutionResult::NoWork { .. }));
        assert!(provider.last_clone().unwrap().commits().is_empty());
    }

    #[tokio::test]
    async fn test_already_applied_is_not_reapplied() {
        let provider = provider();
        let registry = TransformRegistry::new()
            .with(TransformRegistration::new("AddThing", Arc::new(Always), Arc::new(AddThing)))
            .unwrap();
        let replay = Push::new("acme", "widget", "main", "head")
            .with_commit("head", format!("Autofixes\n\n{} applied AddThing", marker_for("AddThing")));
        let result = run(&provider, registry, &replay).await.unwrap();
        assert!(matches!(result, ExecutionResult::NoWork { .. }));
        assert!(provider.last_clone().unwrap().commits().is_empty());
    }

    #[tokio::test]
    async fn test_clone_failure_is_working_copy_error() {
        let repo = RepoRef::new("acme", "widget", "head");
        let provider = InMemoryProvider::unreachable(InMemoryWorkingCopy::new(repo, &[]));
        let registry = TransformRegistry::new()
            .with(TransformRegistration::new("AddThing", Arc::new(Always), Arc::new(AddThing)))
            .unwrap();
        let err = run(&provider, registry, &push()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::WorkingCopy(_)));
    }
}
