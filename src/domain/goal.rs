//! Goals and the phases they compose.

use serde::{Deserialize, Serialize};

/// What a goal reports when its executor found nothing to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdlePolicy {
    /// Report `success` with the goal's completed description
    #[default]
    ReportSuccess,
    /// Write no status; the goal is completed by something else
    Silent,
}

/// A named phase in a delivery pipeline, keyed by its status context.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    context: String,
    description: String,
    completed_description: String,
    #[serde(default)]
    idle_policy: IdlePolicy,
}

impl Goal {
    pub fn new(context: impl Into<String>, description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            context: context.into(),
            completed_description: format!("{} complete", description),
            description,
            idle_policy: IdlePolicy::default(),
        }
    }

    pub fn with_completed_description(mut self, completed: impl Into<String>) -> Self {
        self.completed_description = completed.into();
        self
    }

    pub fn with_idle_policy(mut self, policy: IdlePolicy) -> Self {
        self.idle_policy = policy;
        self
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn completed_description(&self) -> &str {
        &self.completed_description
    }

    pub fn idle_policy(&self) -> IdlePolicy {
        self.idle_policy
    }
}

/// An ordered sequence of goals planned together for a push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phases {
    pub name: String,
    pub goals: Vec<Goal>,
}

impl Phases {
    pub fn new(name: impl Into<String>, goals: Vec<Goal>) -> Self {
        Self {
            name: name.into(),
            goals,
        }
    }

    /// Ordering position of the goal with this context
    pub fn position(&self, context: &str) -> Option<usize> {
        self.goals.iter().position(|g| g.context() == context)
    }

    pub fn contexts(&self) -> Vec<&str> {
        self.goals.iter().map(|g| g.context()).collect()
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }
}
