//! Build lifecycle notifications
//!
//! A build reports `STARTED` once its process is running, then exactly one of
//! `SUCCESS` or `FAILURE` with phase `FINALIZED`.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::RepoRef;
use crate::error::{DeliveryError, Result};
use crate::id::short_sha;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    Started,
    Success,
    Failure,
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildStatus::Started => "STARTED",
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failure => "FAILURE",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildPhase {
    Started,
    Finalized,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildPhase::Started => write!(f, "STARTED"),
            BuildPhase::Finalized => write!(f, "FINALIZED"),
        }
    }
}

/// Receives lifecycle transitions of running builds
#[async_trait]
pub trait BuildLifecycleReporter: Send + Sync {
    async fn report(&self, repo: &RepoRef, team: &str, status: BuildStatus, phase: BuildPhase) -> Result<()>;
}

/// Writes lifecycle transitions to the log only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLifecycleReporter;

#[async_trait]
impl BuildLifecycleReporter for LogLifecycleReporter {
    async fn report(&self, repo: &RepoRef, team: &str, status: BuildStatus, phase: BuildPhase) -> Result<()> {
        log::info!("Build {} of {} for team {}: {}/{}", repo.sha, repo.slug(), team, status, phase);
        Ok(())
    }
}

/// Posts lifecycle transitions as JSON to a webhook.
///
/// A `{team}` placeholder in the URL is replaced with the build's team.
#[derive(Debug, Clone)]
pub struct WebhookLifecycleReporter {
    client: Client,
    url: String,
    web_base: String,
}

impl WebhookLifecycleReporter {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DeliveryError::Build(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            web_base: "https://github.com".to_string(),
        })
    }

    /// Base of the browsable repository URLs put in the payload
    pub fn with_web_base(mut self, base: impl Into<String>) -> Self {
        self.web_base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn url_for(&self, team: &str) -> String {
        self.url.replace("{team}", team)
    }

    fn payload(&self, repo: &RepoRef, status: BuildStatus, phase: BuildPhase) -> serde_json::Value {
        let repo_url = format!("{}/{}/{}", self.web_base, repo.owner, repo.repo);
        json!({
            "name": format!("Build {}", repo.sha),
            "build": {
                "number": format!("Build {}...", short_sha(&repo.sha)),
                "scm": {
                    "commit": repo.sha,
                    "url": repo_url,
                    "branch": repo.branch.clone().unwrap_or_default(),
                },
                "phase": phase,
                "status": status,
                "full_url": format!("{}/commit/{}", repo_url, repo.sha),
            },
            "timestamp": Utc::now().to_rfc3339(),
        })
    }
}

#[async_trait]
impl BuildLifecycleReporter for WebhookLifecycleReporter {
    async fn report(&self, repo: &RepoRef, team: &str, status: BuildStatus, phase: BuildPhase) -> Result<()> {
        let response = self
            .client
            .post(self.url_for(team))
            .json(&self.payload(repo, status, phase))
            .send()
            .await
            .map_err(|e| DeliveryError::Build(format!("Lifecycle webhook failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(DeliveryError::Build(format!(
                "Lifecycle webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// One recorded lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub sha: String,
    pub team: String,
    pub status: BuildStatus,
    pub phase: BuildPhase,
}

/// Keeps every transition in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingLifecycleReporter {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl RecordingLifecycleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// `(status, phase)` pairs in report order
    pub fn sequence(&self) -> Vec<(BuildStatus, BuildPhase)> {
        self.events().into_iter().map(|e| (e.status, e.phase)).collect()
    }
}

#[async_trait]
impl BuildLifecycleReporter for RecordingLifecycleReporter {
    async fn report(&self, repo: &RepoRef, team: &str, status: BuildStatus, phase: BuildPhase) -> Result<()> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(LifecycleEvent {
            sha: repo.sha.clone(),
            team: team.to_string(),
            status,
            phase,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoRef {
        RepoRef::new("acme", "widget", "0123456789abcdef").with_branch("main")
    }

    #[test]
    fn test_payload_shape() {
        let reporter = WebhookLifecycleReporter::new("https://hooks.example.com/teams/{team}").unwrap();
        let payload = reporter.payload(&repo(), BuildStatus::Success, BuildPhase::Finalized);
        assert_eq!(payload["name"], "Build 0123456789abcdef");
        assert_eq!(payload["build"]["number"], "Build 0123456...");
        assert_eq!(payload["build"]["status"], "SUCCESS");
        assert_eq!(payload["build"]["phase"], "FINALIZED");
        assert_eq!(payload["build"]["scm"]["url"], "https://github.com/acme/widget");
        assert_eq!(payload["build"]["scm"]["branch"], "main");
        assert!(payload["timestamp"].as_str().unwrap().contains('T'));
        assert_eq!(
            payload["build"]["full_url"],
            "https://github.com/acme/widget/commit/0123456789abcdef"
        );
    }

    #[test]
    fn test_url_team_placeholder() {
        let reporter = WebhookLifecycleReporter::new("https://hooks.example.com/teams/{team}").unwrap();
        assert_eq!(reporter.url_for("T42"), "https://hooks.example.com/teams/T42");
    }

    #[test]
    fn test_web_base_trimmed() {
        let reporter = WebhookLifecycleReporter::new("http://x")
            .unwrap()
            .with_web_base("https://git.example.com/");
        let payload = reporter.payload(&repo(), BuildStatus::Started, BuildPhase::Started);
        assert_eq!(payload["build"]["scm"]["url"], "https://git.example.com/acme/widget");
    }

    #[tokio::test]
    async fn test_recording_sequence() {
        let recorder = RecordingLifecycleReporter::new();
        recorder.report(&repo(), "T1", BuildStatus::Started, BuildPhase::Started).await.unwrap();
        recorder.report(&repo(), "T1", BuildStatus::Failure, BuildPhase::Finalized).await.unwrap();
        assert_eq!(
            recorder.sequence(),
            vec![
                (BuildStatus::Started, BuildPhase::Started),
                (BuildStatus::Failure, BuildPhase::Finalized)
            ]
        );
        assert_eq!(recorder.events()[0].team, "T1");
    }
}
