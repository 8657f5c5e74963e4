//! Dispatcher - explicit event-type registry and the loop that drains it.
//!
//! The dispatcher:
//! 1. Receives inbound events from an mpsc channel
//! 2. Spawns one task per event, running that event kind's handlers in
//!    registration order
//! 3. Feeds follow-up events returned by handlers back into the task set
//! 4. Stops once the channel is closed and every task has drained

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::dispatch::handler::{EventHandler, HandlerReport};
use crate::domain::{Credentials, EventKind, GoalOutcome, InboundEvent, InvocationContext, StatusState};
use crate::error::{DeliveryError, Result};

/// Per-handler result for one event
#[derive(Debug)]
pub struct HandlerRun {
    pub handler: String,
    pub result: Result<HandlerReport>,
}

/// Everything the handlers did with one event
#[derive(Debug)]
pub struct EventReport {
    pub kind: EventKind,
    pub correlation_id: String,
    pub runs: Vec<HandlerRun>,
}

impl EventReport {
    fn follow_ups(&mut self) -> Vec<InboundEvent> {
        self.runs
            .iter_mut()
            .filter_map(|run| run.result.as_mut().ok())
            .flat_map(|report| std::mem::take(&mut report.follow_ups))
            .collect()
    }
}

/// Totals reported when the dispatcher loop finishes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Events received from the channel
    pub received: usize,
    /// Events produced by handlers
    pub follow_ups: usize,
    /// Events with no registered handler
    pub unhandled: usize,
    pub ignored: usize,
    pub succeeded: usize,
    /// Goals completed with failure or error
    pub failed: usize,
    pub unreported: usize,
    /// Handler errors, as "<handler>: <error>"
    pub errors: Vec<String>,
}

impl DispatchSummary {
    fn record(&mut self, report: &EventReport) {
        if report.runs.is_empty() {
            self.unhandled += 1;
        }
        for run in &report.runs {
            if let Ok(handler_report) = &run.result {
                for error in &handler_report.errors {
                    self.errors.push(format!("{}: {}", run.handler, error));
                }
            }
            match &run.result {
                Ok(HandlerReport { outcome: Some(outcome), .. }) => match outcome {
                    GoalOutcome::Ignored { .. } => self.ignored += 1,
                    GoalOutcome::Unreported { .. } => self.unreported += 1,
                    GoalOutcome::Completed { state, .. } => {
                        if *state == StatusState::Success {
                            self.succeeded += 1;
                        } else {
                            self.failed += 1;
                        }
                    }
                },
                Ok(_) => {}
                Err(e) => self.errors.push(format!("{}: {}", run.handler, e)),
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.failed == 0
    }
}

impl fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events ({} follow-ups): {} succeeded, {} failed, {} ignored, {} unreported, {} errors",
            self.received + self.follow_ups,
            self.follow_ups,
            self.succeeded,
            self.failed,
            self.ignored,
            self.unreported,
            self.errors.len()
        )
    }
}

/// Maps event kinds to ordered handler lists
pub struct Dispatcher {
    handlers: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
    team_id: String,
    credentials: Credentials,
}

impl Dispatcher {
    pub fn new(team_id: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            handlers: HashMap::new(),
            team_id: team_id.into(),
            credentials,
        }
    }

    /// Append a handler for an event kind
    pub fn register(&mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Result<()> {
        let handlers = self.handlers.entry(kind).or_default();
        if handlers.iter().any(|h| h.name() == handler.name()) {
            return Err(DeliveryError::Registry(format!(
                "handler '{}' already registered for {}",
                handler.name(),
                kind
            )));
        }
        handlers.push(handler);
        Ok(())
    }

    pub fn handler_names(&self, kind: EventKind) -> Vec<&str> {
        self.handlers
            .get(&kind)
            .map(|hs| hs.iter().map(|h| h.name()).collect())
            .unwrap_or_default()
    }

    /// Run every handler registered for the event's kind, in order.
    ///
    /// A failing handler does not stop the ones after it.
    pub async fn dispatch(&self, event: &InboundEvent) -> EventReport {
        let kind = event.kind();
        let context = InvocationContext::new(self.team_id.clone(), self.credentials.clone());
        let handlers = self.handlers.get(&kind).cloned().unwrap_or_default();

        tracing::info!(
            event = %kind,
            correlation_id = %context.correlation_id,
            sha = %event.push().head_sha(),
            handlers = handlers.len(),
            "Dispatching event"
        );

        let mut runs = Vec::with_capacity(handlers.len());
        for handler in handlers {
            let result = handler.handle(event, &context).await;
            match &result {
                Ok(report) => tracing::debug!(
                    event = %kind,
                    correlation_id = %context.correlation_id,
                    handler = %handler.name(),
                    outcome = ?report.outcome,
                    follow_ups = report.follow_ups.len(),
                    "Handler finished"
                ),
                Err(e) => tracing::error!(
                    event = %kind,
                    correlation_id = %context.correlation_id,
                    handler = %handler.name(),
                    error = %e,
                    "Handler failed"
                ),
            }
            runs.push(HandlerRun {
                handler: handler.name().to_string(),
                result,
            });
        }

        EventReport {
            kind,
            correlation_id: context.correlation_id,
            runs,
        }
    }

    /// Drain the channel, dispatching each event on its own task.
    ///
    /// Returns once the sender side is closed and every event, including
    /// follow-ups produced along the way, has been handled.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<InboundEvent>) -> DispatchSummary {
        let mut tasks: JoinSet<EventReport> = JoinSet::new();
        let mut summary = DispatchSummary::default();
        let mut open = true;

        loop {
            tokio::select! {
                received = rx.recv(), if open => match received {
                    Some(event) => {
                        summary.received += 1;
                        self.spawn(&mut tasks, event);
                    }
                    None => {
                        tracing::debug!(in_flight = tasks.len(), "Event channel closed");
                        open = false;
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => match joined {
                    Ok(mut report) => {
                        summary.record(&report);
                        for follow_up in report.follow_ups() {
                            summary.follow_ups += 1;
                            self.spawn(&mut tasks, follow_up);
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Dispatch task panicked");
                        summary.errors.push(format!("dispatch task: {}", e));
                    }
                },
                else => break,
            }
        }

        tracing::info!(
            received = summary.received,
            follow_ups = summary.follow_ups,
            succeeded = summary.succeeded,
            failed = summary.failed,
            errors = summary.errors.len(),
            "Dispatcher drained"
        );
        summary
    }

    fn spawn(self: &Arc<Self>, tasks: &mut JoinSet<EventReport>, event: InboundEvent) {
        let dispatcher = Arc::clone(self);
        tasks.spawn(async move { dispatcher.dispatch(&event).await });
    }
}
