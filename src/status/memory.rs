//! In-memory status reporter
//!
//! Records every status write instead of sending it anywhere. Used by the
//! local runner when no token is configured, and by tests.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::{Credentials, RepoRef, Status, StatusState};
use crate::error::{DeliveryError, Result};
use crate::status::reporter::StatusReporter;

#[derive(Debug, Default)]
struct Recorded {
    statuses: Vec<(RepoRef, Status)>,
    fail_states: Vec<StatusState>,
    fail_attempts: Vec<usize>,
    attempts: usize,
}

/// Status reporter that keeps writes in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingStatusReporter {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingStatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write of `state` fail, simulating an unreachable endpoint
    pub fn failing_on(self, state: StatusState) -> Self {
        self.lock().fail_states.push(state);
        self
    }

    /// Make the `n`th write attempt (1-based) fail
    pub fn failing_on_attempt(self, n: usize) -> Self {
        self.lock().fail_attempts.push(n);
        self
    }

    /// Stop failing writes
    pub fn heal(&self) {
        let mut recorded = self.lock();
        recorded.fail_states.clear();
        recorded.fail_attempts.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// All successful writes in order
    pub fn statuses(&self) -> Vec<Status> {
        self.lock().statuses.iter().map(|(_, s)| s.clone()).collect()
    }

    /// Successful writes for one context, in order
    pub fn for_context(&self, context: &str) -> Vec<Status> {
        self.statuses().into_iter().filter(|s| s.context == context).collect()
    }

    /// Latest state written for (commit, context)
    pub fn latest(&self, commit_sha: &str, context: &str) -> Option<Status> {
        self.lock()
            .statuses
            .iter()
            .rev()
            .find(|(_, s)| s.commit_sha == commit_sha && s.context == context)
            .map(|(_, s)| s.clone())
    }

    /// Number of writes attempted, including failed ones
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    pub fn len(&self) -> usize {
        self.lock().statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StatusReporter for RecordingStatusReporter {
    async fn update_status(&self, repo: &RepoRef, status: &Status, _credentials: &Credentials) -> Result<()> {
        let mut recorded = self.lock();
        recorded.attempts += 1;
        let attempt = recorded.attempts;
        if recorded.fail_states.contains(&status.state) || recorded.fail_attempts.contains(&attempt) {
            return Err(DeliveryError::Status(format!(
                "simulated failure writing {} for {}",
                status.state, status.context
            )));
        }
        log::info!(
            "[{}@{}] {} -> {} {}",
            repo.slug(),
            status.commit_sha,
            status.context,
            status.state,
            status.description
        );
        recorded.statuses.push((repo.clone(), status.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoRef {
        RepoRef::new("acme", "widget", "abc")
    }

    #[tokio::test]
    async fn test_records_writes_in_order() {
        let reporter = RecordingStatusReporter::new();
        let creds = Credentials::token("t");
        reporter
            .update_status(&repo(), &Status::pending("abc", "build"), &creds)
            .await
            .unwrap();
        reporter
            .update_status(&repo(), &Status::new("abc", "build", StatusState::Success, "Built"), &creds)
            .await
            .unwrap();

        assert_eq!(reporter.len(), 2);
        assert_eq!(reporter.for_context("build")[1].state, StatusState::Success);
        assert_eq!(reporter.latest("abc", "build").unwrap().state, StatusState::Success);
        assert!(reporter.latest("abc", "deploy").is_none());
    }

    #[tokio::test]
    async fn test_failing_on_state() {
        let reporter = RecordingStatusReporter::new().failing_on(StatusState::Success);
        let creds = Credentials::token("t");
        let result = reporter
            .update_status(&repo(), &Status::new("abc", "build", StatusState::Success, ""), &creds)
            .await;
        assert!(matches!(result, Err(DeliveryError::Status(_))));
        assert!(reporter.is_empty());
        assert_eq!(reporter.attempts(), 1);

        reporter.heal();
        reporter
            .update_status(&repo(), &Status::new("abc", "build", StatusState::Success, ""), &creds)
            .await
            .unwrap();
        assert_eq!(reporter.len(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_records() {
        let reporter = RecordingStatusReporter::new();
        let clone = reporter.clone();
        clone
            .update_status(&repo(), &Status::pending("abc", "autofix"), &Credentials::token("t"))
            .await
            .unwrap();
        assert_eq!(reporter.len(), 1);
    }
}
