//! Working copies backed by the git CLI.
//!
//! Each clone lives in its own temporary directory and is deleted when the
//! working copy is dropped.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tokio::process::Command;

use crate::domain::{Credentials, RepoRef};
use crate::error::{DeliveryError, Result};
use crate::id::generate_clone_name;
use crate::workspace::traits::{GitStatus, WorkingCopy, WorkingCopyProvider};

/// Identity used for commits made by transforms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitAuthor {
    pub name: String,
    pub email: String,
}

impl Default for GitAuthor {
    fn default() -> Self {
        Self {
            name: "Shipwright".to_string(),
            email: "bot@shipwright.invalid".to_string(),
        }
    }
}

/// Run git in `dir`, returning trimmed stdout
async fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| DeliveryError::WorkingCopy(format!("Failed to execute git: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let verb = args.first().copied().unwrap_or("git");
        return Err(DeliveryError::WorkingCopy(format!("git {} failed: {}", verb, stderr.trim())));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Clones repositories with the git CLI
#[derive(Debug, Clone)]
pub struct GitWorkingCopyProvider {
    /// Base URL or directory repositories are cloned from
    remote_base: String,
    /// Directory clones are created under; system temp dir when unset
    clone_root: Option<PathBuf>,
    author: GitAuthor,
}

impl GitWorkingCopyProvider {
    /// Create a provider cloning from `{remote_base}/{owner}/{repo}`.
    pub fn new(remote_base: impl Into<String>) -> Self {
        Self {
            remote_base: remote_base.into(),
            clone_root: None,
            author: GitAuthor::default(),
        }
    }

    pub fn with_clone_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.clone_root = Some(root.into());
        self
    }

    pub fn with_author(mut self, author: GitAuthor) -> Self {
        self.author = author;
        self
    }

    /// Clone URL with the token embedded for http(s) remotes
    fn clone_url(&self, credentials: &Credentials, repo: &RepoRef) -> String {
        let base = self.remote_base.trim_end_matches('/');
        let url = format!("{}/{}/{}", base, repo.owner, repo.repo);
        if credentials.is_empty() {
            return url;
        }
        match url.split_once("://") {
            Some((scheme, rest)) if scheme.starts_with("http") => {
                format!("{}://x-access-token:{}@{}", scheme, credentials.secret(), rest)
            }
            _ => url,
        }
    }

    fn create_dir(&self, repo: &RepoRef) -> Result<TempDir> {
        let prefix = generate_clone_name(&repo.owner, &repo.repo, &repo.sha);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match &self.clone_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        };
        dir.map_err(|e| DeliveryError::WorkingCopy(format!("Failed to create clone directory: {}", e)))
    }
}

#[async_trait]
impl WorkingCopyProvider for GitWorkingCopyProvider {
    async fn clone_copy(&self, credentials: &Credentials, repo: &RepoRef) -> Result<Box<dyn WorkingCopy>> {
        let dir = self.create_dir(repo)?;
        let path = dir.path().join(&repo.repo);
        let url = self.clone_url(credentials, repo);
        log::info!("Cloning {} at {} into {}", repo.slug(), repo.sha, path.display());

        let target = path.to_string_lossy().to_string();
        git(dir.path(), &["clone", "--quiet", "--no-checkout", &url, &target])
            .await
            .map_err(|e| DeliveryError::WorkingCopy(format!("Failed to clone {}: {}", repo.slug(), e)))?;

        match &repo.branch {
            Some(branch) => git(&path, &["checkout", "--quiet", "-B", branch, &repo.sha]).await?,
            None => git(&path, &["checkout", "--quiet", "--detach", &repo.sha]).await?,
        };

        Ok(Box::new(GitWorkingCopy {
            _dir: dir,
            path,
            repo: repo.clone(),
            author: self.author.clone(),
        }))
    }
}

/// A git clone in a temporary directory
#[derive(Debug)]
pub struct GitWorkingCopy {
    _dir: TempDir,
    path: PathBuf,
    repo: RepoRef,
    author: GitAuthor,
}

impl GitWorkingCopy {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl WorkingCopy for GitWorkingCopy {
    fn repo_ref(&self) -> &RepoRef {
        &self.repo
    }

    fn base_dir(&self) -> Option<&Path> {
        Some(&self.path)
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        let output = git(&self.path, &["ls-files", "--cached", "--others", "--exclude-standard"]).await?;
        Ok(lines(&output))
    }

    async fn read_file(&self, path: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path.join(path)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file(&mut self, path: &str, content: &str) -> Result<()> {
        let full = self.path.join(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(full, content).await?;
        Ok(())
    }

    async fn git_status(&self) -> Result<GitStatus> {
        let sha = git(&self.path, &["rev-parse", "HEAD"]).await?;
        let porcelain = git(&self.path, &["status", "--porcelain"]).await?;
        Ok(GitStatus {
            sha,
            is_clean: porcelain.is_empty(),
        })
    }

    async fn change_fingerprint(&self) -> Result<String> {
        let porcelain = git(&self.path, &["status", "--porcelain", "--untracked-files=all"]).await?;
        let diff = git(&self.path, &["diff", "HEAD"]).await?;
        let mut hasher = Sha256::new();
        hasher.update(porcelain.as_bytes());
        hasher.update(diff.as_bytes());
        for line in lines(&porcelain).iter().filter(|l| l.starts_with("??")) {
            if let Some(content) = self.read_file(line[2..].trim()).await? {
                hasher.update(content.as_bytes());
            }
        }
        Ok(hex::encode(hasher.finalize()))
    }

    async fn revert(&mut self) -> Result<()> {
        git(&self.path, &["reset", "--quiet", "--hard", "HEAD"]).await?;
        git(&self.path, &["clean", "--quiet", "-fd"]).await?;
        Ok(())
    }

    async fn commit(&mut self, message: &str) -> Result<String> {
        git(&self.path, &["add", "-A"]).await?;
        let name = format!("user.name={}", self.author.name);
        let email = format!("user.email={}", self.author.email);
        git(&self.path, &["-c", &name, "-c", &email, "commit", "--quiet", "-m", message]).await?;
        git(&self.path, &["rev-parse", "HEAD"]).await
    }

    async fn push(&mut self) -> Result<()> {
        let branch = self
            .repo
            .branch
            .clone()
            .ok_or_else(|| DeliveryError::WorkingCopy(format!("No branch to push for {}", self.repo.slug())))?;
        let refspec = format!("HEAD:refs/heads/{}", branch);
        log::info!("Pushing {} to {}", self.repo.slug(), branch);
        git(&self.path, &["push", "--quiet", "origin", &refspec]).await?;
        Ok(())
    }

    async fn files_changed_since(&self, sha: &str) -> Result<Vec<String>> {
        let output = git(&self.path, &["diff", "--name-only", sha, "HEAD"]).await?;
        Ok(lines(&output))
    }
}
