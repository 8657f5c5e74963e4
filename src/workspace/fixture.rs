//! Git repositories for tests

use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;

use tempfile::TempDir;

use crate::domain::{Credentials, RepoRef};
use crate::workspace::git::GitWorkingCopyProvider;
use crate::workspace::traits::{WorkingCopy, WorkingCopyProvider};

pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = StdCommand::new("git").args(args).current_dir(dir).output().unwrap();
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A bare remote at `{temp}/remotes/acme/widget` with two commits on main.
///
/// The first commit adds `README.md`; the second adds `src/lib.ts`.
pub struct GitFixture {
    pub temp: TempDir,
    pub base: String,
    pub first: String,
    pub second: String,
}

impl GitFixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let work = temp.path().join("work");
        std::fs::create_dir(&work).unwrap();
        run_git(&work, &["init", "--quiet"]);
        run_git(&work, &["checkout", "--quiet", "-b", "main"]);
        run_git(&work, &["config", "user.email", "test@test.com"]);
        run_git(&work, &["config", "user.name", "Test"]);

        std::fs::write(work.join("README.md"), "# Widget").unwrap();
        run_git(&work, &["add", "."]);
        run_git(&work, &["commit", "--quiet", "-m", "Initial commit"]);
        let first = run_git(&work, &["rev-parse", "HEAD"]);

        std::fs::create_dir_all(work.join("src")).unwrap();
        std::fs::write(work.join("src/lib.ts"), "export const x = 1;").unwrap();
        run_git(&work, &["add", "."]);
        run_git(&work, &["commit", "--quiet", "-m", "Add lib"]);
        let second = run_git(&work, &["rev-parse", "HEAD"]);

        let remotes = temp.path().join("remotes").join("acme");
        std::fs::create_dir_all(&remotes).unwrap();
        let bare = remotes.join("widget");
        run_git(
            temp.path(),
            &["clone", "--quiet", "--bare", work.to_str().unwrap(), bare.to_str().unwrap()],
        );

        let base = temp.path().join("remotes").to_string_lossy().to_string();
        Self { temp, base, first, second }
    }

    pub fn provider(&self) -> GitWorkingCopyProvider {
        GitWorkingCopyProvider::new(&self.base).with_clone_root(self.temp.path().join("clones"))
    }

    /// The bare remote repository
    pub fn remote(&self) -> PathBuf {
        Path::new(&self.base).join("acme").join("widget")
    }

    pub fn repo_at(&self, sha: &str) -> RepoRef {
        RepoRef::new("acme", "widget", sha).with_branch("main")
    }

    /// Clone the head commit on main
    pub async fn clone_head(&self) -> Box<dyn WorkingCopy> {
        self.provider()
            .clone_copy(&Credentials::token(""), &self.repo_at(&self.second))
            .await
            .unwrap()
    }
}
