//! Applying a batch of transforms to one working copy

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::autofix::idempotency::{commit_message, filter_applied};
use crate::domain::{InvocationContext, Push};
use crate::error::{DeliveryError, Result};
use crate::pushtest::PushTestInvocation;
use crate::registry::{Parameters, TransformInvocation, TransformRegistration};
use crate::workspace::WorkingCopy;

/// Result of applying a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Number of transforms that edited the working copy
    pub edited_count: usize,
    /// Names of the transforms that edited, in application order
    pub applied: Vec<String>,
    /// Sha of the pushed commit, if one was made
    pub commit_sha: Option<String>,
}

impl ApplyOutcome {
    pub fn committed(&self) -> bool {
        self.commit_sha.is_some()
    }
}

/// Applies transforms in order, then commits and pushes once
#[derive(Debug, Clone, Default)]
pub struct TransformExecutor {
    /// Caller-supplied parameter overrides keyed by registration name
    overrides: BTreeMap<String, Parameters>,
}

impl TransformExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(mut self, registration: impl Into<String>, parameters: Parameters) -> Self {
        self.overrides.insert(registration.into(), parameters);
        self
    }

    /// Registrations not yet applied on this push whose push test passes.
    ///
    /// Push tests run in registration order after the marker filter.
    pub async fn relevant(
        &self,
        registrations: &[Arc<TransformRegistration>],
        push: &Push,
        wc: &dyn WorkingCopy,
        context: &InvocationContext,
    ) -> Result<Vec<Arc<TransformRegistration>>> {
        let candidates = filter_applied(registrations, push);
        let invocation = PushTestInvocation::new(push, wc, context);
        let mut relevant = Vec::with_capacity(candidates.len());
        for registration in candidates {
            if registration.push_test().test(&invocation).await? {
                relevant.push(registration);
            } else {
                log::debug!(
                    "{} not applicable: push test {} failed",
                    registration.name(),
                    registration.push_test().name()
                );
            }
        }
        Ok(relevant)
    }

    /// Apply `registrations` to `wc` in order.
    ///
    /// Any failure reverts the working copy before the error is returned, so
    /// edits from earlier transforms in the batch are never committed. When at
    /// least one transform edited, the batch becomes a single commit carrying
    /// every applied marker, pushed to the originating branch.
    pub async fn apply(
        &self,
        registrations: &[Arc<TransformRegistration>],
        wc: &mut dyn WorkingCopy,
        push: &Push,
        context: &InvocationContext,
    ) -> Result<ApplyOutcome> {
        let mut outcome = ApplyOutcome::default();

        for registration in registrations {
            match self.apply_one(registration, wc, push, context).await {
                Ok(true) => {
                    outcome.edited_count += 1;
                    outcome.applied.push(registration.name().to_string());
                }
                Ok(false) => {}
                Err(e) => {
                    log::error!("{} failed, reverting batch: {}", registration.name(), e);
                    if let Err(revert_err) = wc.revert().await {
                        log::error!("Revert after failed batch also failed: {}", revert_err);
                    }
                    return Err(e);
                }
            }
        }

        if outcome.edited_count == 0 {
            log::info!("No transform edited {}; nothing to commit", wc.repo_ref().slug());
            return Ok(outcome);
        }

        if wc.git_status().await?.is_clean {
            log::warn!("{:?} reported edits but the working copy is clean", outcome.applied);
            return Ok(outcome);
        }

        let message = commit_message(&outcome.applied);
        let sha = wc.commit(&message).await?;
        wc.push().await?;
        log::info!(
            "Pushed {} with {} autofix(es): {}",
            sha,
            outcome.edited_count,
            outcome.applied.join(", ")
        );
        outcome.commit_sha = Some(sha);
        Ok(outcome)
    }

    async fn apply_one(
        &self,
        registration: &TransformRegistration,
        wc: &mut dyn WorkingCopy,
        push: &Push,
        context: &InvocationContext,
    ) -> Result<bool> {
        let empty = Parameters::new();
        let overrides = self.overrides.get(registration.name()).unwrap_or(&empty);
        let parameters = registration.bind_parameters(overrides)?;
        let invocation = TransformInvocation::new(push, context, &parameters);

        log::debug!("Applying {} to {}", registration.name(), wc.repo_ref().slug());
        let result = registration.transform().transform(wc, &invocation).await?;
        if !result.success {
            return Err(DeliveryError::Transform(format!(
                "{}: {}",
                registration.name(),
                result.message.unwrap_or_else(|| "reported failure".to_string())
            )));
        }
        Ok(result.edited)
    }
}
