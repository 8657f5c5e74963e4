//! Software delivery machine - everything wired together from configuration
//!
//! `DeliveryMachine` owns the registries, one state machine per configured
//! goal and the dispatcher that routes inbound events to them. Collaborators
//! that talk to the outside world (status reporter, working-copy provider)
//! are passed in so local runs and tests can swap in the in-memory ones.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::build::{
    BuildLifecycleReporter, BuildSpec, Builder, LocalArtifactStore, LogLifecycleReporter, WebhookLifecycleReporter,
};
use crate::config::{AutofixConfig, Config, GoalKind};
use crate::dispatch::{DispatchSummary, Dispatcher, GoalHandler, PhaseRule, PhaseSetter};
use crate::domain::{Credentials, EventKind, Goal, InboundEvent, Phases};
use crate::error::{DeliveryError, Result};
use crate::goal::{AutofixExecutor, BuildExecutor, CodeReactionExecutor, CommandExecutor, GoalExecutor, GoalStatusMachine};
use crate::process::ShellCommand;
use crate::registry::{
    CodeReactionRegistration, CodeReactionRegistry, CommandReaction, CommandTransform, HeaderTransform, ParameterSpec,
    TransformRegistration, TransformRegistry,
};
use crate::status::{GitHubStatusConfig, GitHubStatusReporter, RecordingStatusReporter, RetryingStatusReporter, StatusReporter};
use crate::workspace::{GitAuthor, GitWorkingCopyProvider, WorkingCopyProvider};

/// Status reporter for the configured GitHub endpoint.
///
/// Without a token, status writes are only recorded and logged.
pub fn status_reporter(config: &Config, token: Option<&str>) -> Result<Arc<dyn StatusReporter>> {
    if token.is_none() {
        log::warn!("No token in ${}; statuses will be logged, not written", config.github.token_env);
        return Ok(Arc::new(RecordingStatusReporter::new()));
    }
    let github = GitHubStatusReporter::new(GitHubStatusConfig::with_api_base(&config.github.api_base))?;
    if config.github.status_retries > 0 {
        return Ok(Arc::new(RetryingStatusReporter::new(github, config.github.status_retries)));
    }
    Ok(Arc::new(github))
}

pub fn working_copy_provider(config: &Config) -> Arc<dyn WorkingCopyProvider> {
    let author = GitAuthor {
        name: config.workspace.author_name.clone(),
        email: config.workspace.author_email.clone(),
    };
    let mut provider = GitWorkingCopyProvider::new(&config.github.remote_base).with_author(author);
    if let Some(root) = &config.workspace.clone_root {
        provider = provider.with_clone_root(root.clone());
    }
    Arc::new(provider)
}

fn transform_registration(autofix: &AutofixConfig) -> Result<TransformRegistration> {
    let push_test = autofix.push_test.compile()?;
    let mut registration = match &autofix.header {
        Some(header) => {
            let mut registration = TransformRegistration::new(&autofix.name, push_test, Arc::new(HeaderTransform));
            for (key, spec) in HeaderTransform::parameters(header.glob.as_deref(), Some(header.text.as_str())) {
                registration = registration.with_parameter(key, spec);
            }
            registration
        }
        None => {
            let mut transform = CommandTransform::new(autofix.commands.clone());
            if let Some(ms) = autofix.timeout_ms {
                transform = transform.with_timeout_ms(ms);
            }
            TransformRegistration::new(&autofix.name, push_test, Arc::new(transform))
        }
    };
    for (key, value) in &autofix.parameters {
        registration = registration.with_parameter(key, ParameterSpec::with_default(value.clone()));
    }
    Ok(registration)
}

pub fn transform_registry(config: &Config) -> Result<TransformRegistry> {
    let mut registry = TransformRegistry::new();
    for autofix in &config.autofixes {
        registry.register(transform_registration(autofix)?)?;
    }
    Ok(registry)
}

pub fn code_reaction_registry(config: &Config) -> Result<CodeReactionRegistry> {
    let mut registry = CodeReactionRegistry::new();
    for reaction in &config.code_reactions {
        let mut command = CommandReaction::new(&reaction.command);
        if let Some(ms) = reaction.timeout_ms {
            command = command.with_timeout_ms(ms);
        }
        registry.register(CodeReactionRegistration::new(&reaction.name, Arc::new(command)))?;
    }
    Ok(registry)
}

/// The configured delivery machine
pub struct DeliveryMachine {
    dispatcher: Dispatcher,
    goals: Vec<Goal>,
    phases: Vec<Phases>,
    transforms: Arc<TransformRegistry>,
    reactions: Arc<CodeReactionRegistry>,
}

impl DeliveryMachine {
    pub fn from_config(
        config: &Config,
        provider: Arc<dyn WorkingCopyProvider>,
        reporter: Arc<dyn StatusReporter>,
        credentials: Credentials,
    ) -> Result<Self> {
        let transforms = Arc::new(transform_registry(config)?);
        let reactions = Arc::new(code_reaction_registry(config)?);
        let builder = Self::builder(config, &provider, &reporter)?;

        let mut dispatcher = Dispatcher::new(&config.build.team, credentials);

        let mut setter = PhaseSetter::new(Arc::clone(&provider), Arc::clone(&reporter));
        let mut phases = Vec::with_capacity(config.phases.len());
        for phase in &config.phases {
            let goals = phase
                .goals
                .iter()
                .map(|context| {
                    config.goal(context).map(|g| g.to_goal()).ok_or_else(|| {
                        DeliveryError::Registry(format!("phases '{}' references unknown goal '{}'", phase.name, context))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let planned = Phases::new(&phase.name, goals);
            phases.push(planned.clone());
            setter = setter.with_rule(PhaseRule::new(phase.push_test.compile()?, planned));
        }
        dispatcher.register(EventKind::Push, Arc::new(setter))?;

        let mut goals = Vec::with_capacity(config.goals.len());
        for goal_config in &config.goals {
            let executor: Arc<dyn GoalExecutor> = match &goal_config.kind {
                GoalKind::Autofix => Arc::new(AutofixExecutor::new(Arc::clone(&provider), Arc::clone(&transforms))),
                GoalKind::CodeReaction => {
                    Arc::new(CodeReactionExecutor::new(Arc::clone(&provider), Arc::clone(&reactions)))
                }
                GoalKind::Build => {
                    let builder = builder.clone().ok_or_else(|| {
                        DeliveryError::Registry(format!("goal '{}' needs build.command", goal_config.context))
                    })?;
                    Arc::new(BuildExecutor::new(builder))
                }
                GoalKind::Command { command, timeout_ms } => {
                    let mut command = ShellCommand::new(command);
                    if let Some(ms) = timeout_ms {
                        command = command.timeout_ms(*ms);
                    }
                    Arc::new(CommandExecutor::new(Arc::clone(&provider), command))
                }
            };
            let goal = goal_config.to_goal();
            let machine = GoalStatusMachine::new(goal.clone(), executor, Arc::clone(&reporter));
            dispatcher.register(EventKind::StatusChanged, Arc::new(GoalHandler::new(Arc::new(machine))))?;
            goals.push(goal);
        }

        log::info!(
            "Delivery machine ready: {} goals, {} phases, {} autofixes, {} code reactions",
            goals.len(),
            phases.len(),
            transforms.len(),
            reactions.len()
        );
        Ok(Self {
            dispatcher,
            goals,
            phases,
            transforms,
            reactions,
        })
    }

    fn builder(
        config: &Config,
        provider: &Arc<dyn WorkingCopyProvider>,
        reporter: &Arc<dyn StatusReporter>,
    ) -> Result<Option<Arc<Builder>>> {
        let Some(command) = &config.build.command else {
            return Ok(None);
        };
        let mut spec = BuildSpec::new(command).with_timeout_ms(config.build.timeout_ms);
        if let Some(glob) = &config.build.artifact_glob {
            spec = spec.with_artifact_glob(glob);
        }
        let lifecycle: Arc<dyn BuildLifecycleReporter> = match &config.build.lifecycle_webhook {
            Some(url) => Arc::new(WebhookLifecycleReporter::new(url)?),
            None => Arc::new(LogLifecycleReporter),
        };
        let builder = Builder::new(
            spec,
            Arc::clone(provider),
            Arc::new(LocalArtifactStore::new(config.build.artifact_dir.clone())),
            Arc::clone(reporter),
        )
        .with_lifecycle(lifecycle);
        Ok(Some(Arc::new(builder)))
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn phases(&self) -> &[Phases] {
        &self.phases
    }

    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    pub fn reactions(&self) -> &CodeReactionRegistry {
        &self.reactions
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Dispatch events from `rx` until it closes and all work drains
    pub async fn run(self, rx: mpsc::Receiver<InboundEvent>) -> DispatchSummary {
        Arc::new(self.dispatcher).run(rx).await
    }
}
