//! In-memory working copies.
//!
//! Files are a map from relative path to content. Every copy handed out by
//! `InMemoryProvider` is also retained by the provider so callers can inspect
//! commits, pushes and reverts after the copy has been moved into an executor.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::{Commit, Credentials, RepoRef};
use crate::error::{DeliveryError, Result};
use crate::workspace::traits::{GitStatus, WorkingCopy, WorkingCopyProvider};

type Files = BTreeMap<String, String>;

#[derive(Debug, Default)]
struct CopyState {
    files: Files,
    /// Snapshot at each known sha, oldest first; the last entry is HEAD
    history: Vec<(String, Files)>,
    commits: Vec<Commit>,
    pushed: Vec<String>,
    reverts: usize,
    fail_push: bool,
}

impl CopyState {
    fn head(&self) -> (&str, &Files) {
        match self.history.last() {
            Some((sha, files)) => (sha.as_str(), files),
            None => ("", &self.files),
        }
    }
}

/// A working copy held entirely in memory
#[derive(Debug, Clone)]
pub struct InMemoryWorkingCopy {
    repo: RepoRef,
    state: Arc<Mutex<CopyState>>,
}

impl InMemoryWorkingCopy {
    /// A copy whose HEAD is `repo.sha` with the given files
    pub fn new(repo: RepoRef, files: &[(&str, &str)]) -> Self {
        let files: Files = files.iter().map(|(p, c)| (p.to_string(), c.to_string())).collect();
        let state = CopyState {
            history: vec![(repo.sha.clone(), files.clone())],
            files,
            ..Default::default()
        };
        Self {
            repo,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Record an earlier commit so `files_changed_since` can diff against it
    pub fn with_previous(self, sha: &str, files: &[(&str, &str)]) -> Self {
        let snapshot: Files = files.iter().map(|(p, c)| (p.to_string(), c.to_string())).collect();
        self.lock().history.insert(0, (sha.to_string(), snapshot));
        self
    }

    /// Make `push` fail, simulating a rejected push
    pub fn failing_push(self) -> Self {
        self.lock().fail_push = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, CopyState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Commits made on this copy, oldest first
    pub fn commits(&self) -> Vec<Commit> {
        self.lock().commits.clone()
    }

    /// Shas pushed from this copy
    pub fn pushed(&self) -> Vec<String> {
        self.lock().pushed.clone()
    }

    pub fn revert_count(&self) -> usize {
        self.lock().reverts
    }

    /// Current (possibly uncommitted) content of a file
    pub fn content(&self, path: &str) -> Option<String> {
        self.lock().files.get(path).cloned()
    }

    /// Create an independent copy with the same files and history
    fn fork(&self) -> Self {
        let state = self.lock();
        let forked = CopyState {
            files: state.files.clone(),
            history: state.history.clone(),
            fail_push: state.fail_push,
            ..Default::default()
        };
        Self {
            repo: self.repo.clone(),
            state: Arc::new(Mutex::new(forked)),
        }
    }
}

fn digest(prefix: &[&str], files: &Files) -> Sha256 {
    let mut hasher = Sha256::new();
    for part in prefix {
        hasher.update(part.as_bytes());
    }
    for (path, content) in files {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update(content.as_bytes());
        hasher.update([0u8]);
    }
    hasher
}

fn fake_sha(parent: &str, message: &str, files: &Files) -> String {
    hex::encode(&digest(&[parent, message], files).finalize()[..20])
}

#[async_trait]
impl WorkingCopy for InMemoryWorkingCopy {
    fn repo_ref(&self) -> &RepoRef {
        &self.repo
    }

    fn base_dir(&self) -> Option<&Path> {
        None
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        Ok(self.lock().files.keys().cloned().collect())
    }

    async fn read_file(&self, path: &str) -> Result<Option<String>> {
        Ok(self.lock().files.get(path).cloned())
    }

    async fn write_file(&mut self, path: &str, content: &str) -> Result<()> {
        self.lock().files.insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn git_status(&self) -> Result<GitStatus> {
        let state = self.lock();
        let (sha, head) = state.head();
        Ok(GitStatus {
            sha: sha.to_string(),
            is_clean: head == &state.files,
        })
    }

    async fn change_fingerprint(&self) -> Result<String> {
        let state = self.lock();
        Ok(hex::encode(digest(&[], &state.files).finalize()))
    }

    async fn revert(&mut self) -> Result<()> {
        let mut state = self.lock();
        let head = state.head().1.clone();
        state.files = head;
        state.reverts += 1;
        Ok(())
    }

    async fn commit(&mut self, message: &str) -> Result<String> {
        let mut state = self.lock();
        let parent = state.head().0.to_string();
        let sha = fake_sha(&parent, message, &state.files);
        let snapshot = state.files.clone();
        state.history.push((sha.clone(), snapshot));
        state.commits.push(Commit::new(&sha, message));
        Ok(sha)
    }

    async fn push(&mut self) -> Result<()> {
        let mut state = self.lock();
        if state.fail_push {
            return Err(DeliveryError::WorkingCopy(format!("push to {} rejected", self.repo.slug())));
        }
        let head = state.head().0.to_string();
        state.pushed.push(head);
        Ok(())
    }

    async fn files_changed_since(&self, sha: &str) -> Result<Vec<String>> {
        let state = self.lock();
        let (_, base) = state
            .history
            .iter()
            .find(|(s, _)| s == sha)
            .ok_or_else(|| DeliveryError::WorkingCopy(format!("unknown revision {}", sha)))?;
        let (_, head) = state.head();

        let mut changed: Vec<String> = head
            .iter()
            .filter(|(path, content)| base.get(*path) != Some(*content))
            .map(|(path, _)| path.clone())
            .collect();
        changed.extend(base.keys().filter(|p| !head.contains_key(*p)).cloned());
        changed.sort();
        Ok(changed)
    }
}

/// Hands out forks of a template working copy and remembers each one
#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    template: InMemoryWorkingCopy,
    clones: Arc<Mutex<Vec<InMemoryWorkingCopy>>>,
    fail_clone: bool,
}

impl InMemoryProvider {
    pub fn new(template: InMemoryWorkingCopy) -> Self {
        Self {
            template,
            clones: Arc::new(Mutex::new(Vec::new())),
            fail_clone: false,
        }
    }

    /// A provider whose clones always fail
    pub fn unreachable(template: InMemoryWorkingCopy) -> Self {
        Self {
            fail_clone: true,
            ..Self::new(template)
        }
    }

    /// Every copy handed out so far
    pub fn clones(&self) -> Vec<InMemoryWorkingCopy> {
        self.clones.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clone_count(&self) -> usize {
        self.clones().len()
    }

    /// The most recent copy handed out
    pub fn last_clone(&self) -> Option<InMemoryWorkingCopy> {
        self.clones().last().cloned()
    }
}

#[async_trait]
impl WorkingCopyProvider for InMemoryProvider {
    async fn clone_copy(&self, _credentials: &Credentials, repo: &RepoRef) -> Result<Box<dyn WorkingCopy>> {
        if self.fail_clone {
            return Err(DeliveryError::WorkingCopy(format!("Failed to clone {}", repo.slug())));
        }
        let mut copy = self.template.fork();
        copy.repo = repo.clone();
        self.clones.lock().unwrap_or_else(|e| e.into_inner()).push(copy.clone());
        Ok(Box::new(copy))
    }
}
