//! Bounded retry around status writes.
//!
//! Wrap a reporter in this when a lost terminal status is worse than a
//! duplicate write. Status writes are idempotent on the GitHub side (the last
//! write for a context wins) so retrying is safe.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Credentials, RepoRef, Status};
use crate::error::Result;
use crate::status::reporter::StatusReporter;

/// Retries a failed status write up to `retries` extra times
pub struct RetryingStatusReporter<R> {
    inner: R,
    retries: u32,
    backoff: Duration,
}

impl<R: StatusReporter> RetryingStatusReporter<R> {
    pub fn new(inner: R, retries: u32) -> Self {
        Self {
            inner,
            retries,
            backoff: Duration::from_millis(500),
        }
    }

    /// Set the base backoff; attempt `n` waits `n * backoff`
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl<R: StatusReporter> StatusReporter for RetryingStatusReporter<R> {
    async fn update_status(&self, repo: &RepoRef, status: &Status, credentials: &Credentials) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.inner.update_status(repo, status, credentials).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    log::warn!(
                        "Status write {} for {} failed (attempt {}/{}): {}",
                        status.state,
                        status.context,
                        attempt,
                        self.retries + 1,
                        e
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
