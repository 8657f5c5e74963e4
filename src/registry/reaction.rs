//! Code reactions - observers of pushed changes that never edit the repo

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Credentials, InvocationContext, Push, RepoRef};
use crate::error::{DeliveryError, Result};
use crate::workspace::WorkingCopy;

/// Input to one code reaction
#[derive(Clone, Copy)]
pub struct CodeReactionInvocation<'a> {
    pub repo: &'a RepoRef,
    pub push: &'a Push,
    pub working_copy: &'a dyn WorkingCopy,
    /// Paths changed between the push's `before` and head; empty for a first push
    pub files_changed: &'a [String],
    pub context: &'a InvocationContext,
}

impl CodeReactionInvocation<'_> {
    pub fn credentials(&self) -> &Credentials {
        &self.context.credentials
    }
}

impl fmt::Debug for CodeReactionInvocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeReactionInvocation")
            .field("repo", self.repo)
            .field("files_changed", &self.files_changed)
            .field("correlation_id", &self.context.correlation_id)
            .finish()
    }
}

#[async_trait]
pub trait CodeReaction: Send + Sync {
    async fn react(&self, invocation: &CodeReactionInvocation<'_>) -> Result<()>;
}

/// A named code reaction
#[derive(Clone)]
pub struct CodeReactionRegistration {
    name: String,
    reaction: Arc<dyn CodeReaction>,
}

impl CodeReactionRegistration {
    pub fn new(name: impl Into<String>, reaction: Arc<dyn CodeReaction>) -> Self {
        Self {
            name: name.into(),
            reaction,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reaction(&self) -> &Arc<dyn CodeReaction> {
        &self.reaction
    }
}

impl fmt::Debug for CodeReactionRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeReactionRegistration").field("name", &self.name).finish()
    }
}

/// Code reactions with unique names, in registration order
#[derive(Debug, Clone, Default)]
pub struct CodeReactionRegistry {
    registrations: Vec<CodeReactionRegistration>,
}

impl CodeReactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, registration: CodeReactionRegistration) -> Result<()> {
        if self.registrations.iter().any(|r| r.name() == registration.name()) {
            return Err(DeliveryError::Registry(format!(
                "code reaction '{}' is already registered",
                registration.name()
            )));
        }
        self.registrations.push(registration);
        Ok(())
    }

    pub fn with(mut self, registration: CodeReactionRegistration) -> Result<Self> {
        self.register(registration)?;
        Ok(self)
    }

    pub fn registrations(&self) -> &[CodeReactionRegistration] {
        &self.registrations
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quiet;

    #[async_trait]
    impl CodeReaction for Quiet {
        async fn react(&self, _invocation: &CodeReactionInvocation<'_>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let mut registry = CodeReactionRegistry::new();
        registry.register(CodeReactionRegistration::new("notify", Arc::new(Quiet))).unwrap();
        let err = registry
            .register(CodeReactionRegistration::new("notify", Arc::new(Quiet)))
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Registry(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_order() {
        let registry = CodeReactionRegistry::new()
            .with(CodeReactionRegistration::new("first", Arc::new(Quiet)))
            .unwrap()
            .with(CodeReactionRegistration::new("second", Arc::new(Quiet)))
            .unwrap();
        let names: Vec<&str> = registry.registrations().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
