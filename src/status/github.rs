//! GitHub commit status API implementation
//!
//! Implements the StatusReporter trait against
//! `POST /repos/{owner}/{repo}/statuses/{sha}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::domain::{Credentials, RepoRef, Status};
use crate::error::{DeliveryError, Result};
use crate::status::reporter::StatusReporter;

/// GitHub API base URL
const GITHUB_API_URL: &str = "https://api.github.com";

/// GitHub rejects descriptions longer than this
const MAX_DESCRIPTION_CHARS: usize = 140;

const USER_AGENT: &str = concat!("shipwright/", env!("CARGO_PKG_VERSION"));

/// Configuration for the GitHub status reporter
#[derive(Debug, Clone)]
pub struct GitHubStatusConfig {
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for GitHubStatusConfig {
    fn default() -> Self {
        Self {
            api_base: GITHUB_API_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GitHubStatusConfig {
    /// Create a config pointing at a different API base (GitHub Enterprise)
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Default::default()
        }
    }
}

/// GitHub commit status client
pub struct GitHubStatusReporter {
    client: Client,
    config: GitHubStatusConfig,
}

impl GitHubStatusReporter {
    pub fn new(config: GitHubStatusConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DeliveryError::Status(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Statuses endpoint for the commit
    fn statuses_url(&self, repo: &RepoRef, sha: &str) -> String {
        format!(
            "{}/repos/{}/{}/statuses/{}",
            self.config.api_base.trim_end_matches('/'),
            repo.owner,
            repo.repo,
            sha
        )
    }

    fn build_body(status: &Status) -> Value {
        let description: String = status.description.chars().take(MAX_DESCRIPTION_CHARS).collect();
        let mut body = json!({
            "state": status.state.as_str(),
            "context": status.context,
            "description": description,
        });

        if let Some(url) = &status.target_url {
            body["target_url"] = json!(url);
        }

        body
    }
}

#[async_trait]
impl StatusReporter for GitHubStatusReporter {
    async fn update_status(&self, repo: &RepoRef, status: &Status, credentials: &Credentials) -> Result<()> {
        let url = self.statuses_url(repo, &status.commit_sha);
        log::debug!("POST {} state={} context={}", url, status.state, status.context);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", credentials.secret()))
            .header("Accept", "application/vnd.github+json")
            .json(&Self::build_body(status))
            .send()
            .await
            .map_err(|e| DeliveryError::Status(format!("Request failed: {}", e)))?;

        let code = response.status();
        if !code.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DeliveryError::Status(format!(
                "GitHub returned {} for {} on {}: {}",
                code,
                status.context,
                repo.slug(),
                error_body
            )));
        }

        Ok(())
    }
}
