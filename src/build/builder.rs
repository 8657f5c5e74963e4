//! Running a build command against a fresh clone
//!
//! `Builder::build` returns as soon as the process is running. Completion is
//! observed through the `RunningBuild` handle; the lifecycle reporter sees
//! `STARTED` and then exactly one `FINALIZED` transition.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use glob::MatchOptions;
use tokio::process::Child;
use tokio::task::JoinHandle;

use crate::build::artifact::{AppInfo, ArtifactStore};
use crate::build::lifecycle::{BuildLifecycleReporter, BuildPhase, BuildStatus, LogLifecycleReporter};
use crate::domain::{Credentials, RepoRef, Status, StatusState};
use crate::error::{DeliveryError, Result};
use crate::process::ShellCommand;
use crate::status::StatusReporter;
use crate::workspace::{WorkingCopy, WorkingCopyProvider};

/// Status context of the artifact record written after a stored build
pub const ARTIFACT_CONTEXT: &str = "artifact";

/// Default build timeout in milliseconds
pub const DEFAULT_BUILD_TIMEOUT_MS: u64 = 600_000;

/// What to run and what it produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub command: String,
    /// Glob, relative to the clone, locating the deployable output
    pub artifact_glob: Option<String>,
    pub timeout_ms: u64,
}

impl BuildSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            artifact_glob: None,
            timeout_ms: DEFAULT_BUILD_TIMEOUT_MS,
        }
    }

    pub fn with_artifact_glob(mut self, glob: impl Into<String>) -> Self {
        self.artifact_glob = Some(glob.into());
        self
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }
}

/// How a build ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// `Success` or `Failure`
    pub status: BuildStatus,
    /// `None` when the process was killed, timed out or never produced a code
    pub exit_code: Option<i32>,
    /// URL of the stored artifact, when one was located and stored
    pub artifact_url: Option<String>,
    pub message: String,
}

impl BuildOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == BuildStatus::Success
    }
}

/// A build whose process is running
#[derive(Debug)]
pub struct RunningBuild {
    repo: RepoRef,
    team: String,
    handle: JoinHandle<BuildOutcome>,
}

impl RunningBuild {
    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    /// Wait for the process to exit and its terminal transition to be reported
    pub async fn wait(self) -> Result<BuildOutcome> {
        self.handle
            .await
            .map_err(|e| DeliveryError::Build(format!("Build task for {} aborted: {}", self.repo.sha, e)))
    }
}

/// Starts builds and reports their lifecycle
pub struct Builder {
    spec: BuildSpec,
    provider: Arc<dyn WorkingCopyProvider>,
    artifacts: Arc<dyn ArtifactStore>,
    reporter: Arc<dyn StatusReporter>,
    lifecycle: Arc<dyn BuildLifecycleReporter>,
}

impl Builder {
    pub fn new(
        spec: BuildSpec,
        provider: Arc<dyn WorkingCopyProvider>,
        artifacts: Arc<dyn ArtifactStore>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            spec,
            provider,
            artifacts,
            reporter,
            lifecycle: Arc::new(LogLifecycleReporter),
        }
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn BuildLifecycleReporter>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn spec(&self) -> &BuildSpec {
        &self.spec
    }

    /// Clone `repo` and start the build command in it.
    ///
    /// A failed clone is returned without any lifecycle report since nothing
    /// started. A spawn failure reports `FAILURE` and is returned as a build
    /// error.
    pub async fn build(&self, credentials: &Credentials, repo: &RepoRef, team: &str) -> Result<RunningBuild> {
        let wc = self.provider.clone_copy(credentials, repo).await?;
        let dir = wc
            .base_dir()
            .map(Path::to_path_buf)
            .ok_or_else(|| DeliveryError::WorkingCopy(format!("Build of {} needs a clone on disk", repo.slug())))?;

        let run = BuildRun {
            repo: repo.clone(),
            team: team.to_string(),
            credentials: credentials.clone(),
            spec: self.spec.clone(),
            artifacts: self.artifacts.clone(),
            reporter: self.reporter.clone(),
            lifecycle: self.lifecycle.clone(),
        };

        let mut cmd = ShellCommand::new(&self.spec.command).to_command(&dir);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                run.notify(BuildStatus::Failure, BuildPhase::Finalized).await;
                return Err(DeliveryError::Build(format!("Failed to spawn '{}': {}", self.spec.command, e)));
            }
        };

        log::info!("Started build of {} at {}: {}", repo.slug(), repo.sha, self.spec.command);
        run.notify(BuildStatus::Started, BuildPhase::Started).await;

        let handle = tokio::spawn(run.finish(child, wc, dir));
        Ok(RunningBuild {
            repo: repo.clone(),
            team: team.to_string(),
            handle,
        })
    }
}

/// State moved into the task awaiting process exit
struct BuildRun {
    repo: RepoRef,
    team: String,
    credentials: Credentials,
    spec: BuildSpec,
    artifacts: Arc<dyn ArtifactStore>,
    reporter: Arc<dyn StatusReporter>,
    lifecycle: Arc<dyn BuildLifecycleReporter>,
}

impl BuildRun {
    async fn notify(&self, status: BuildStatus, phase: BuildPhase) {
        if let Err(e) = self.lifecycle.report(&self.repo, &self.team, status, phase).await {
            log::warn!("Failed to report {}/{} for {}: {}", status, phase, self.repo.sha, e);
        }
    }

    /// Await exit, report the terminal transition, then handle the artifact.
    ///
    /// The working copy is held until the artifact has been stored.
    async fn finish(self, child: Child, _wc: Box<dyn WorkingCopy>, dir: PathBuf) -> BuildOutcome {
        let timeout = tokio::time::Duration::from_millis(self.spec.timeout_ms);
        let (exit_code, message) = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let code = output.status.code();
                let message = match code {
                    Some(0) => "Build succeeded".to_string(),
                    Some(code) => {
                        let stderr = String::from_utf8_lossy(&output.stderr);
                        format!("exit code {}: {}", code, last_line(&stderr))
                    }
                    None => "terminated by signal".to_string(),
                };
                (code, message)
            }
            Ok(Err(e)) => (None, format!("process error: {}", e)),
            Err(_) => (None, format!("timed out after {}ms", self.spec.timeout_ms)),
        };

        if exit_code != Some(0) {
            log::error!("Build of {} at {} failed: {}", self.repo.slug(), self.repo.sha, message);
            self.notify(BuildStatus::Failure, BuildPhase::Finalized).await;
            return BuildOutcome {
                status: BuildStatus::Failure,
                exit_code,
                artifact_url: None,
                message,
            };
        }

        self.notify(BuildStatus::Success, BuildPhase::Finalized).await;

        let artifact_url = match self.store_artifact(&dir).await {
            Ok(url) => url,
            Err(e) => {
                log::error!("Artifact handling for {} failed: {}", self.repo.sha, e);
                None
            }
        };

        BuildOutcome {
            status: BuildStatus::Success,
            exit_code,
            artifact_url,
            message,
        }
    }

    /// Locate the artifact, store it and record its URL on the artifact context
    async fn store_artifact(&self, dir: &Path) -> Result<Option<String>> {
        let Some(pattern) = &self.spec.artifact_glob else {
            return Ok(None);
        };
        let Some(file) = locate_artifact(dir, pattern)? else {
            log::warn!("No artifact matching {} after build of {}", pattern, self.repo.sha);
            return Ok(None);
        };

        let url = self.artifacts.store_file(&AppInfo::from_repo(&self.repo), &file).await?;
        let status = Status::new(&self.repo.sha, ARTIFACT_CONTEXT, StatusState::Success, "Artifact stored")
            .with_target_url(&url);
        // The artifact is stored either way; its URL still belongs on the build status
        if let Err(e) = self.reporter.update_status(&self.repo, &status, &self.credentials).await {
            log::error!("Failed to write {} status for {}: {}", ARTIFACT_CONTEXT, self.repo.sha, e);
        }
        Ok(Some(url))
    }
}

/// First file under `dir` matching `pattern`, in path order
fn locate_artifact(dir: &Path, pattern: &str) -> Result<Option<PathBuf>> {
    let full = format!("{}/{}", glob::Pattern::escape(&dir.to_string_lossy()), pattern);
    let options = MatchOptions {
        require_literal_separator: true,
        ..MatchOptions::new()
    };
    let paths = glob::glob_with(&full, options)
        .map_err(|e| DeliveryError::Artifact(format!("invalid artifact glob '{}': {}", pattern, e)))?;
    Ok(paths.filter_map(|entry| entry.ok()).find(|path| path.is_file()))
}

fn last_line(text: &str) -> &str {
    text.lines().rev().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}
