//! Goal invocation outcome types.

use crate::domain::status::StatusState;

/// Outcome of handling one status event for a goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalOutcome {
    /// The event was not the pending status of this goal; nothing was done
    Ignored { reason: String },
    /// Exactly one terminal status was written
    Completed {
        state: StatusState,
        target_url: Option<String>,
    },
    /// The executor had nothing to do and the goal's idle policy is silent
    Unreported { reason: String },
}

impl GoalOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, GoalOutcome::Ignored { .. })
    }

    /// The terminal state written, if any
    pub fn state(&self) -> Option<StatusState> {
        match self {
            GoalOutcome::Completed { state, .. } => Some(*state),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_outcome_variants() {
        let ignored = GoalOutcome::Ignored { reason: "stale".into() };
        assert!(ignored.is_ignored());
        assert_eq!(ignored.state(), None);

        let done = GoalOutcome::Completed {
            state: StatusState::Success,
            target_url: None,
        };
        assert!(!done.is_ignored());
        assert_eq!(done.state(), Some(StatusState::Success));
    }

    #[test]
    fn test_goal_outcome_clone() {
        let outcome = GoalOutcome::Unreported { reason: "no reactions".into() };
        assert_eq!(outcome.clone(), outcome);
    }
}
