//! Configuration for Shipwright
//!
//! Loaded from, in order: an explicit `--config` path,
//! `~/.config/shipwright/shipwright.yml`, `./shipwright.yml`, then defaults.
//!
//! ```yaml
//! github:
//!   status_retries: 2
//! goals:
//!   - context: autofix
//!     description: Autofix
//!     kind: autofix
//!   - context: deploy
//!     description: Deploy
//!     kind:
//!       command:
//!         command: ./scripts/deploy.sh
//! phases:
//!   - name: node
//!     push_test:
//!       has_file: package.json
//!     goals: [autofix, deploy]
//! autofixes:
//!   - name: eslint
//!     commands: ["npx eslint --fix ."]
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::build::DEFAULT_BUILD_TIMEOUT_MS;
use crate::domain::{Goal, IdlePolicy};
use crate::pushtest::PushTestSpec;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub github: GitHubConfig,
    pub workspace: WorkspaceConfig,
    pub build: BuildConfig,
    pub goals: Vec<GoalConfig>,
    pub phases: Vec<PhaseConfig>,
    pub autofixes: Vec<AutofixConfig>,
    pub code_reactions: Vec<CodeReactionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_base: String,
    /// Clone URLs are `<remote_base>/<owner>/<repo>`
    pub remote_base: String,
    /// Environment variable holding the API token
    pub token_env: String,
    /// Extra attempts for a failed status write
    pub status_retries: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            remote_base: "https://github.com".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            status_retries: 0,
        }
    }
}

impl GitHubConfig {
    /// The token from `token_env`, if set and non-empty
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Where disposable clones are created; the system temp dir when unset
    pub clone_root: Option<PathBuf>,
    pub author_name: String,
    pub author_email: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            clone_root: None,
            author_name: "Shipwright".to_string(),
            author_email: "bot@shipwright.invalid".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub command: Option<String>,
    pub artifact_glob: Option<String>,
    pub timeout_ms: u64,
    pub artifact_dir: PathBuf,
    pub lifecycle_webhook: Option<String>,
    /// Team id passed to every invocation
    pub team: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: None,
            artifact_glob: None,
            timeout_ms: DEFAULT_BUILD_TIMEOUT_MS,
            artifact_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("shipwright")
                .join("artifacts"),
            lifecycle_webhook: None,
            team: "local".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    Autofix,
    CodeReaction,
    Build,
    Command {
        command: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
}

impl GoalKind {
    /// Code reactions with nothing registered leave their status alone;
    /// every other kind reports success when idle
    pub fn default_idle_policy(&self) -> IdlePolicy {
        match self {
            GoalKind::CodeReaction => IdlePolicy::Silent,
            _ => IdlePolicy::ReportSuccess,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GoalKind::Autofix => "autofix",
            GoalKind::CodeReaction => "code_reaction",
            GoalKind::Build => "build",
            GoalKind::Command { .. } => "command",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalConfig {
    pub context: String,
    pub description: String,
    #[serde(default)]
    pub completed_description: Option<String>,
    /// Falls back to the kind's default when omitted
    #[serde(default)]
    pub idle_policy: Option<IdlePolicy>,
    pub kind: GoalKind,
}

impl GoalConfig {
    pub fn idle_policy(&self) -> IdlePolicy {
        self.idle_policy.unwrap_or_else(|| self.kind.default_idle_policy())
    }

    pub fn to_goal(&self) -> Goal {
        let goal = Goal::new(&self.context, &self.description).with_idle_policy(self.idle_policy());
        match &self.completed_description {
            Some(completed) => goal.with_completed_description(completed),
            None => goal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseConfig {
    pub name: String,
    #[serde(default)]
    pub push_test: PushTestSpec,
    /// Goal contexts, in order
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderConfig {
    pub text: String,
    #[serde(default)]
    pub glob: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutofixConfig {
    pub name: String,
    #[serde(default)]
    pub push_test: PushTestSpec,
    /// Shell commands run in the working copy
    #[serde(default)]
    pub commands: Vec<String>,
    /// Built-in license header fix instead of commands
    #[serde(default)]
    pub header: Option<HeaderConfig>,
    /// Parameter defaults, exported to commands as `SHIPWRIGHT_PARAM_<KEY>`
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeReactionConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config = Self::from_yaml(&content)?;
        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross references between goals, phases and autofixes
    pub fn validate(&self) -> Result<()> {
        let mut contexts = HashSet::new();
        for goal in &self.goals {
            if !contexts.insert(goal.context.as_str()) {
                eyre::bail!("goal context '{}' is defined twice", goal.context);
            }
            if goal.kind == GoalKind::Build && self.build.command.is_none() {
                eyre::bail!("goal '{}' is a build goal but build.command is not set", goal.context);
            }
        }
        for phase in &self.phases {
            for context in &phase.goals {
                if !contexts.contains(context.as_str()) {
                    eyre::bail!("phases '{}' references unknown goal '{}'", phase.name, context);
                }
            }
        }
        for autofix in &self.autofixes {
            match (autofix.commands.is_empty(), &autofix.header) {
                (true, None) => eyre::bail!("autofix '{}' needs commands or a header", autofix.name),
                (false, Some(_)) => eyre::bail!("autofix '{}' has both commands and a header", autofix.name),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn goal(&self, context: &str) -> Option<&GoalConfig> {
        self.goals.iter().find(|g| g.context == context)
    }
}
