//! The goal status state machine
//!
//! Claims the pending status of one goal, runs the goal's executor and writes
//! exactly one terminal status. This is the single recovery boundary: every
//! error raised below it becomes a terminal status plus a returned error.

use std::sync::Arc;

use crate::domain::{Goal, GoalOutcome, IdlePolicy, InvocationContext, Status, StatusEvent, StatusState};
use crate::error::Result;
use crate::goal::executor::{ExecutionResult, GoalExecutor, GoalInvocation};
use crate::status::StatusReporter;

pub struct GoalStatusMachine {
    goal: Goal,
    executor: Arc<dyn GoalExecutor>,
    reporter: Arc<dyn StatusReporter>,
}

impl GoalStatusMachine {
    pub fn new(goal: Goal, executor: Arc<dyn GoalExecutor>, reporter: Arc<dyn StatusReporter>) -> Self {
        Self {
            goal,
            executor,
            reporter,
        }
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    /// Handle a status-changed event.
    ///
    /// Events for another context, or for this context in a non-pending state,
    /// are ignored without any write or clone.
    pub async fn handle(&self, event: &StatusEvent, context: &InvocationContext) -> Result<GoalOutcome> {
        let status = &event.status;
        if status.context != self.goal.context() {
            log::debug!("{} ignoring status for context {}", self.goal.context(), status.context);
            return Ok(GoalOutcome::Ignored {
                reason: format!("status is for context '{}'", status.context),
            });
        }
        if !status.is_pending() {
            log::warn!(
                "{} ignoring {} status on {}: only pending statuses are claimed",
                self.goal.context(),
                status.state,
                status.commit_sha
            );
            return Ok(GoalOutcome::Ignored {
                reason: format!("status is {}, not pending", status.state),
            });
        }

        let invocation = GoalInvocation {
            goal: &self.goal,
            status,
            push: &event.push,
            context,
        };
        log::info!(
            "[{}] running {} on {} at {}",
            context.correlation_id,
            self.executor.name(),
            event.push.repo_ref().slug(),
            status.commit_sha
        );

        match self.executor.execute(&invocation).await {
            Ok(ExecutionResult::Done {
                description,
                target_url,
            }) => {
                let description = description.unwrap_or_else(|| self.goal.completed_description().to_string());
                self.complete(&invocation, StatusState::Success, description, target_url).await
            }
            Ok(ExecutionResult::NoWork { reason }) => match self.goal.idle_policy() {
                IdlePolicy::ReportSuccess => {
                    log::info!("{}: {}; reporting success", self.goal.context(), reason);
                    let description = self.goal.completed_description().to_string();
                    self.complete(&invocation, StatusState::Success, description, None).await
                }
                IdlePolicy::Silent => {
                    log::info!("{}: {}; leaving status to be completed elsewhere", self.goal.context(), reason);
                    Ok(GoalOutcome::Unreported { reason })
                }
            },
            Err(e) => {
                let state = e.terminal_state();
                log::error!("[{}] {} failed: {}", context.correlation_id, self.goal.context(), e);
                let description = format!("{} failed: {}", self.goal.context(), e);
                if let Err(write_err) = self.complete(&invocation, state, description, None).await {
                    log::error!(
                        "Could not record {} for {} on {}; status stays pending: {}",
                        state,
                        self.goal.context(),
                        status.commit_sha,
                        write_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn complete(
        &self,
        invocation: &GoalInvocation<'_>,
        state: StatusState,
        description: String,
        target_url: Option<String>,
    ) -> Result<GoalOutcome> {
        let repo = invocation.repo_ref();
        let mut status = Status::new(&repo.sha, self.goal.context(), state, description);
        if let Some(url) = &target_url {
            status = status.with_target_url(url);
        }

        self.reporter
            .update_status(&repo, &status, &invocation.context.credentials)
            .await?;
        log::info!("{} on {} -> {}", self.goal.context(), repo.sha, state);
        Ok(GoalOutcome::Completed { state, target_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Credentials, Push};
    use crate::error::DeliveryError;
    use crate::status::RecordingStatusReporter;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        result: fn() -> Result<ExecutionResult>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(result: fn() -> Result<ExecutionResult>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GoalExecutor for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn execute(&self, _invocation: &GoalInvocation<'_>) -> Result<ExecutionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn event(context: &str, state: StatusState) -> StatusEvent {
        let push = Push::new("acme", "widget", "main", "head").with_commit("head", "change");
        StatusEvent::new(Status::new("head", context, state, ""), push)
    }

    fn ctx() -> InvocationContext {
        InvocationContext::new("T1", Credentials::token(""))
    }

    fn machine(goal: Goal, executor: Arc<Scripted>, reporter: &RecordingStatusReporter) -> GoalStatusMachine {
        GoalStatusMachine::new(goal, executor, Arc::new(reporter.clone()))
    }

    fn autofix_goal() -> Goal {
        Goal::new("autofix", "Autofix").with_completed_description("Autofixed")
    }

    #[tokio::test]
    async fn test_foreign_context_ignored_without_side_effects() {
        let reporter = RecordingStatusReporter::new();
        let executor = Scripted::new(|| Ok(ExecutionResult::done()));
        let m = machine(autofix_goal(), executor.clone(), &reporter);

        let outcome = m.handle(&event("build", StatusState::Pending), &ctx()).await.unwrap();
        assert!(outcome.is_ignored());
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(reporter.attempts(), 0);
    }

    #[tokio::test]
    async fn test_non_pending_ignored_without_side_effects() {
        let reporter = RecordingStatusReporter::new();
        let executor = Scripted::new(|| Ok(ExecutionResult::done()));
        let m = machine(autofix_goal(), executor.clone(), &reporter);

        for state in [StatusState::Success, StatusState::Failure, StatusState::Error] {
            let outcome = m.handle(&event("autofix", state), &ctx()).await.unwrap();
            assert!(outcome.is_ignored());
        }
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(reporter.attempts(), 0);
    }

    #[tokio::test]
    async fn test_done_writes_one_success_with_completed_description() {
        let reporter = RecordingStatusReporter::new();
        let m = machine(autofix_goal(), Scripted::new(|| Ok(ExecutionResult::done())), &reporter);

        let outcome = m.handle(&event("autofix", StatusState::Pending), &ctx()).await.unwrap();
        assert_eq!(outcome.state(), Some(StatusState::Success));
        let written = reporter.statuses();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].context, "autofix");
        assert_eq!(written[0].description, "Autofixed");
        assert_eq!(written[0].commit_sha, "head");
    }

    #[tokio::test]
    async fn test_done_carries_target_url() {
        let reporter = RecordingStatusReporter::new();
        let executor = Scripted::new(|| {
            Ok(ExecutionResult::Done {
                description: Some("Built".to_string()),
                target_url: Some("file:///tmp/widget.jar".to_string()),
            })
        });
        let m = machine(Goal::new("build", "Build"), executor, &reporter);

        let outcome = m.handle(&event("build", StatusState::Pending), &ctx()).await.unwrap();
        assert_eq!(
            outcome,
            GoalOutcome::Completed {
                state: StatusState::Success,
                target_url: Some("file:///tmp/widget.jar".to_string())
            }
        );
        let status = reporter.latest("head", "build").unwrap();
        assert_eq!(status.description, "Built");
        assert_eq!(status.target_url.as_deref(), Some("file:///tmp/widget.jar"));
    }

    #[tokio::test]
    async fn test_no_work_reports_success_by_default() {
        let reporter = RecordingStatusReporter::new();
        let m = machine(autofix_goal(), Scripted::new(|| Ok(ExecutionResult::no_work("none"))), &reporter);
        let outcome = m.handle(&event("autofix", StatusState::Pending), &ctx()).await.unwrap();
        assert_eq!(outcome.state(), Some(StatusState::Success));
        assert_eq!(reporter.len(), 1);
    }

    #[tokio::test]
    async fn test_no_work_silent_policy_writes_nothing() {
        let reporter = RecordingStatusReporter::new();
        let goal = Goal::new("reactions", "React").with_idle_policy(IdlePolicy::Silent);
        let m = machine(goal, Scripted::new(|| Ok(ExecutionResult::no_work("no reactions"))), &reporter);
        let outcome = m.handle(&event("reactions", StatusState::Pending), &ctx()).await.unwrap();
        assert_eq!(
            outcome,
            GoalOutcome::Unreported {
                reason: "no reactions".to_string()
            }
        );
        assert_eq!(reporter.attempts(), 0);
    }

    #[tokio::test]
    async fn test_transform_error_reports_failure_and_surfaces_error() {
        let reporter = RecordingStatusReporter::new();
        let executor = Scripted::new(|| Err(DeliveryError::Transform("AddThing: boom".to_string())));
        let m = machine(autofix_goal(), executor, &reporter);

        let err = m.handle(&event("autofix", StatusState::Pending), &ctx()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Transform(_)));
        let status = reporter.latest("head", "autofix").unwrap();
        assert_eq!(status.state, StatusState::Failure);
        assert!(status.description.starts_with("autofix failed:"));
        assert!(status.description.contains("boom"));
        assert_eq!(reporter.len(), 1);
    }

    #[tokio::test]
    async fn test_infrastructure_error_reports_error_state() {
        let reporter = RecordingStatusReporter::new();
        let executor = Scripted::new(|| Err(DeliveryError::WorkingCopy("clone refused".to_string())));
        let m = machine(autofix_goal(), executor, &reporter);

        assert!(m.handle(&event("autofix", StatusState::Pending), &ctx()).await.is_err());
        assert_eq!(reporter.latest("head", "autofix").unwrap().state, StatusState::Error);
    }

    #[tokio::test]
    async fn test_failed_terminal_write_is_returned() {
        let reporter = RecordingStatusReporter::new().failing_on(StatusState::Success);
        let m = machine(autofix_goal(), Scripted::new(|| Ok(ExecutionResult::done())), &reporter);

        let err = m.handle(&event("autofix", StatusState::Pending), &ctx()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Status(_)));
        assert_eq!(reporter.attempts(), 1);
        assert!(reporter.is_empty());
    }

    #[tokio::test]
    async fn test_executor_error_survives_failed_write() {
        let reporter = RecordingStatusReporter::new().failing_on(StatusState::Failure);
        let executor = Scripted::new(|| Err(DeliveryError::Transform("boom".to_string())));
        let m = machine(autofix_goal(), executor, &reporter);

        let err = m.handle(&event("autofix", StatusState::Pending), &ctx()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Transform(_)));
        assert_eq!(reporter.attempts(), 1);
    }
}
