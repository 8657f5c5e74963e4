//! Core status reporter trait

use async_trait::async_trait;

use crate::domain::{Credentials, RepoRef, Status};
use crate::error::Result;

/// Writes the status record for a (commit, context) pair.
///
/// Each call is an independent network write; implementations do not retry.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn update_status(&self, repo: &RepoRef, status: &Status, credentials: &Credentials) -> Result<()>;
}
