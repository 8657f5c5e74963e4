//! Core working copy interfaces

use std::path::Path;

use async_trait::async_trait;

use crate::domain::{Credentials, RepoRef};
use crate::error::Result;

/// Head sha and cleanliness of a working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitStatus {
    pub sha: String,
    pub is_clean: bool,
}

/// An exclusively owned, mutable, revertible clone of a repository at a commit.
///
/// Read operations take `&self` so push tests and code reactions can share a
/// copy; anything that changes files or history takes `&mut self`.
#[async_trait]
pub trait WorkingCopy: Send + Sync {
    /// Repository and commit this copy was cloned from
    fn repo_ref(&self) -> &RepoRef;

    /// Directory on disk, if the copy lives on disk
    fn base_dir(&self) -> Option<&Path>;

    /// All tracked and untracked (non-ignored) files, relative, `/` separated
    async fn list_files(&self) -> Result<Vec<String>>;

    /// File content, `None` if the file does not exist
    async fn read_file(&self, path: &str) -> Result<Option<String>>;

    async fn write_file(&mut self, path: &str, content: &str) -> Result<()>;

    async fn git_status(&self) -> Result<GitStatus>;

    /// Digest of every uncommitted change.
    ///
    /// Two equal fingerprints taken around an operation mean it left the
    /// files untouched.
    async fn change_fingerprint(&self) -> Result<String>;

    /// Discard every uncommitted change
    async fn revert(&mut self) -> Result<()>;

    /// Commit all changes; returns the new head sha
    async fn commit(&mut self, message: &str) -> Result<String>;

    /// Push the current branch to its origin
    async fn push(&mut self) -> Result<()>;

    /// Paths that differ between `sha` and the current head
    async fn files_changed_since(&self, sha: &str) -> Result<Vec<String>>;

    async fn has_file(&self, path: &str) -> Result<bool> {
        Ok(self.read_file(path).await?.is_some())
    }
}

/// Produces working copies
#[async_trait]
pub trait WorkingCopyProvider: Send + Sync {
    async fn clone_copy(&self, credentials: &Credentials, repo: &RepoRef) -> Result<Box<dyn WorkingCopy>>;
}
