//! Commit status records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of an external status record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Pending,
    Success,
    Error,
    Failure,
}

impl StatusState {
    /// Returns true for success, error and failure
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusState::Pending)
    }

    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusState::Pending => "pending",
            StatusState::Success => "success",
            StatusState::Error => "error",
            StatusState::Failure => "failure",
        }
    }
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical status per (commit, context)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub commit_sha: String,
    pub context: String,
    pub state: StatusState,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
}

impl Status {
    pub fn new(
        commit_sha: impl Into<String>,
        context: impl Into<String>,
        state: StatusState,
        description: impl Into<String>,
    ) -> Self {
        Self {
            commit_sha: commit_sha.into(),
            context: context.into(),
            state,
            description: description.into(),
            target_url: None,
        }
    }

    /// A pending status, the state goals are claimed from
    pub fn pending(commit_sha: impl Into<String>, context: impl Into<String>) -> Self {
        Self::new(commit_sha, context, StatusState::Pending, "")
    }

    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = Some(url.into());
        self
    }

    pub fn is_pending(&self) -> bool {
        self.state == StatusState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!StatusState::Pending.is_terminal());
        assert!(StatusState::Success.is_terminal());
        assert!(StatusState::Error.is_terminal());
        assert!(StatusState::Failure.is_terminal());
    }

    #[test]
    fn test_state_wire_names() {
        assert_eq!(serde_json::to_string(&StatusState::Failure).unwrap(), "\"failure\"");
        let state: StatusState = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(state, StatusState::Pending);
        assert_eq!(StatusState::Error.to_string(), "error");
    }

    #[test]
    fn test_status_builders() {
        let status = Status::pending("abc123", "build");
        assert!(status.is_pending());
        assert!(status.description.is_empty());
        assert!(status.target_url.is_none());

        let done = Status::new("abc123", "build", StatusState::Success, "Built")
            .with_target_url("https://artifacts.example/abc123.jar");
        assert_eq!(done.target_url.as_deref(), Some("https://artifacts.example/abc123.jar"));
    }

    #[test]
    fn test_status_deserialize_without_optional_fields() {
        let status: Status =
            serde_json::from_str(r#"{"commit_sha":"abc","context":"autofix","state":"pending"}"#).unwrap();
        assert_eq!(status.context, "autofix");
        assert!(status.target_url.is_none());
    }
}
