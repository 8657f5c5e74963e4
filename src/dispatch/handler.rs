//! Event handlers

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{GoalOutcome, InboundEvent, InvocationContext};
use crate::error::Result;
use crate::goal::GoalStatusMachine;

/// What a handler did with one event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerReport {
    /// Set by goal handlers
    pub outcome: Option<GoalOutcome>,
    /// Events to feed back into the dispatcher
    pub follow_ups: Vec<InboundEvent>,
    /// Failures that did not stop the handler from producing the rest
    pub errors: Vec<String>,
}

impl HandlerReport {
    pub fn outcome(outcome: GoalOutcome) -> Self {
        Self {
            outcome: Some(outcome),
            ..Self::default()
        }
    }

    pub fn follow_ups(events: Vec<InboundEvent>) -> Self {
        Self {
            follow_ups: events,
            ..Self::default()
        }
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, event: &InboundEvent, context: &InvocationContext) -> Result<HandlerReport>;
}

/// Feeds status-changed events to one goal's state machine
pub struct GoalHandler {
    machine: Arc<GoalStatusMachine>,
}

impl GoalHandler {
    pub fn new(machine: Arc<GoalStatusMachine>) -> Self {
        Self { machine }
    }
}

#[async_trait]
impl EventHandler for GoalHandler {
    fn name(&self) -> &str {
        self.machine.goal().context()
    }

    async fn handle(&self, event: &InboundEvent, context: &InvocationContext) -> Result<HandlerReport> {
        match event {
            InboundEvent::StatusChanged(status_event) => {
                let outcome = self.machine.handle(status_event, context).await?;
                Ok(HandlerReport::outcome(outcome))
            }
            InboundEvent::Push(_) => Ok(HandlerReport::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Credentials, Goal, Push, Status, StatusEvent, StatusState};
    use crate::goal::{ExecutionResult, GoalExecutor, GoalInvocation};
    use crate::status::RecordingStatusReporter;

    struct Finished;

    #[async_trait]
    impl GoalExecutor for Finished {
        fn name(&self) -> &str {
            "finished"
        }

        async fn execute(&self, _invocation: &GoalInvocation<'_>) -> Result<ExecutionResult> {
            Ok(ExecutionResult::done())
        }
    }

    fn handler(statuses: &RecordingStatusReporter) -> GoalHandler {
        let machine = GoalStatusMachine::new(
            Goal::new("verify", "Verify"),
            Arc::new(Finished),
            Arc::new(statuses.clone()),
        );
        GoalHandler::new(Arc::new(machine))
    }

    #[tokio::test]
    async fn test_goal_handler_runs_machine() {
        let statuses = RecordingStatusReporter::new();
        let handler = handler(&statuses);
        assert_eq!(handler.name(), "verify");

        let push = Push::new("acme", "widget", "main", "abc");
        let event = InboundEvent::StatusChanged(StatusEvent::new(Status::pending("abc", "verify"), push));
        let ctx = InvocationContext::new("T1", Credentials::token(""));
        let report = handler.handle(&event, &ctx).await.unwrap();

        assert_eq!(report.outcome.and_then(|o| o.state()), Some(StatusState::Success));
        assert!(report.follow_ups.is_empty());
        assert_eq!(statuses.len(), 1);
    }

    #[tokio::test]
    async fn test_goal_handler_ignores_push() {
        let statuses = RecordingStatusReporter::new();
        let ctx = InvocationContext::new("T1", Credentials::token(""));
        let event = InboundEvent::Push(Push::new("acme", "widget", "main", "abc"));
        let report = handler(&statuses).handle(&event, &ctx).await.unwrap();
        assert_eq!(report, HandlerReport::default());
        assert!(statuses.is_empty());
    }
}
