//! Push, commit and repository identity.

use serde::{Deserialize, Serialize};

/// Identifies a repository and, optionally, a commit and branch in it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            sha: sha.into(),
            branch: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// `owner/repo`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// A single commit as seen in a push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    #[serde(default)]
    pub message: String,
}

impl Commit {
    pub fn new(sha: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sha: sha.into(),
            message: message.into(),
        }
    }
}

/// An ordered set of commits advancing a branch from `before` to `after`.
///
/// Commits are ordered oldest first; the last one is the commit goals act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Push {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Sha the branch pointed at before the push; absent for the first push
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    pub after: String,
    #[serde(default)]
    pub commits: Vec<Commit>,
}

impl Push {
    /// A push of `branch` to `after` with no listed commits
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
            before: None,
            after: after.into(),
            commits: Vec::new(),
        }
    }

    pub fn with_before(mut self, before: impl Into<String>) -> Self {
        self.before = Some(before.into());
        self
    }

    /// Append a commit; the last appended commit becomes the head
    pub fn with_commit(mut self, sha: impl Into<String>, message: impl Into<String>) -> Self {
        self.commits.push(Commit::new(sha, message));
        self
    }

    /// The most recent commit, falling back to `after` when no commits were listed
    pub fn head_sha(&self) -> &str {
        self.commits.last().map(|c| c.sha.as_str()).unwrap_or(&self.after)
    }

    /// Repository reference at the head commit on the pushed branch
    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(&self.owner, &self.repo, self.head_sha()).with_branch(&self.branch)
    }

    /// Commit messages in push order
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.commits.iter().map(|c| c.message.as_str())
    }
}
