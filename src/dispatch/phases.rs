//! Phase setup on push
//!
//! Picks the phases that apply to a push and plans every goal in them by
//! writing a pending status. The pending statuses come back as follow-up
//! events, which is what starts the goal state machines.

use std::sync::Arc;

use async_trait::async_trait;

use crate::dispatch::handler::{EventHandler, HandlerReport};
use crate::domain::{InboundEvent, InvocationContext, Phases, Push, Status, StatusEvent, StatusState};
use crate::error::Result;
use crate::pushtest::{PushTest, PushTestInvocation};
use crate::status::StatusReporter;
use crate::workspace::WorkingCopyProvider;

/// Phases guarded by the push test that selects them
pub struct PhaseRule {
    push_test: Arc<dyn PushTest>,
    phases: Phases,
}

impl PhaseRule {
    pub fn new(push_test: Arc<dyn PushTest>, phases: Phases) -> Self {
        Self { push_test, phases }
    }

    pub fn phases(&self) -> &Phases {
        &self.phases
    }

    pub fn push_test(&self) -> &Arc<dyn PushTest> {
        &self.push_test
    }
}

pub struct PhaseSetter {
    provider: Arc<dyn WorkingCopyProvider>,
    reporter: Arc<dyn StatusReporter>,
    rules: Vec<PhaseRule>,
}

impl PhaseSetter {
    pub fn new(provider: Arc<dyn WorkingCopyProvider>, reporter: Arc<dyn StatusReporter>) -> Self {
        Self {
            provider,
            reporter,
            rules: Vec::new(),
        }
    }

    /// Rules are tried in the order they are added
    pub fn with_rule(mut self, rule: PhaseRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[PhaseRule] {
        &self.rules
    }

    /// The first phases whose push test matches
    pub async fn select(&self, push: &Push, context: &InvocationContext) -> Result<Option<&Phases>> {
        if self.rules.is_empty() {
            return Ok(None);
        }
        let wc = self.provider.clone_copy(&context.credentials, &push.repo_ref()).await?;
        let invocation = PushTestInvocation::new(push, wc.as_ref(), context);
        for rule in &self.rules {
            if rule.push_test.test(&invocation).await? {
                log::debug!("[{}] push test {} matched", context.correlation_id, rule.push_test.name());
                return Ok(Some(&rule.phases));
            }
        }
        Ok(None)
    }

    /// Write a pending status for every goal and return the matching events.
    ///
    /// A goal whose pending write fails is left out of the plan and the rest
    /// still go ahead, so every pending status written gets its event. If no
    /// goal could be planned the first write error is returned.
    pub async fn plan(&self, push: &Push, context: &InvocationContext) -> Result<Plan> {
        let Some(phases) = self.select(push, context).await? else {
            log::info!(
                "[{}] no phases apply to {} at {}",
                context.correlation_id,
                push.repo_ref().slug(),
                push.head_sha()
            );
            return Ok(Plan::default());
        };

        log::info!(
            "[{}] planning {} ({} goals) for {} at {}",
            context.correlation_id,
            phases.name,
            phases.len(),
            push.repo_ref().slug(),
            push.head_sha()
        );
        let repo = push.repo_ref();
        let mut plan = Plan::default();
        let mut first_error = None;
        for goal in &phases.goals {
            let status = Status::new(
                push.head_sha(),
                goal.context(),
                StatusState::Pending,
                format!("Planned: {}", goal.description()),
            );
            match self.reporter.update_status(&repo, &status, &context.credentials).await {
                Ok(()) => plan
                    .events
                    .push(InboundEvent::StatusChanged(StatusEvent::new(status, push.clone()))),
                Err(e) => {
                    log::error!(
                        "[{}] could not plan {} at {}: {}",
                        context.correlation_id,
                        goal.context(),
                        push.head_sha(),
                        e
                    );
                    plan.failures.push(format!("{}: {}", goal.context(), e));
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if plan.events.is_empty() => Err(e),
            _ => Ok(plan),
        }
    }
}

/// Goals planned for one push
#[derive(Debug, Default)]
pub struct Plan {
    /// One pending status event per goal whose pending write landed
    pub events: Vec<InboundEvent>,
    /// "<context>: <error>" for each goal that could not be planned
    pub failures: Vec<String>,
}

#[async_trait]
impl EventHandler for PhaseSetter {
    fn name(&self) -> &str {
        "phase-setter"
    }

    async fn handle(&self, event: &InboundEvent, context: &InvocationContext) -> Result<HandlerReport> {
        match event {
            InboundEvent::Push(push) => {
                let plan = self.plan(push, context).await?;
                Ok(HandlerReport::follow_ups(plan.events).with_errors(plan.failures))
            }
            InboundEvent::StatusChanged(_) => Ok(HandlerReport::default()),
        }
    }
}
