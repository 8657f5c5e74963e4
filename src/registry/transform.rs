//! Transform registrations and the ordered registry holding them

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::autofix::marker_for;
use crate::domain::{InvocationContext, Push};
use crate::error::{DeliveryError, Result};
use crate::pushtest::PushTest;
use crate::workspace::WorkingCopy;

/// Bound parameter values handed to a transform
pub type Parameters = BTreeMap<String, Value>;

/// What a transform reports after running against a working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    /// Whether the transform changed any files
    pub edited: bool,
    /// Whether the transform considers its run successful
    pub success: bool,
    /// Optional explanation, used when `success` is false
    pub message: Option<String>,
}

impl TransformResult {
    pub fn edited() -> Self {
        Self {
            edited: true,
            success: true,
            message: None,
        }
    }

    pub fn unchanged() -> Self {
        Self {
            edited: false,
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            edited: false,
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Everything a transform may look at besides the working copy
#[derive(Debug, Clone, Copy)]
pub struct TransformInvocation<'a> {
    pub push: &'a Push,
    pub context: &'a InvocationContext,
    pub parameters: &'a Parameters,
}

impl<'a> TransformInvocation<'a> {
    pub fn new(push: &'a Push, context: &'a InvocationContext, parameters: &'a Parameters) -> Self {
        Self {
            push,
            context,
            parameters,
        }
    }

    /// A parameter rendered as text; strings are returned without quotes
    pub fn parameter(&self, key: &str) -> Option<String> {
        self.parameters.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// A function that edits a working copy.
///
/// Returning `Err` or a result with `success: false` fails the whole batch.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn transform(&self, wc: &mut dyn WorkingCopy, invocation: &TransformInvocation<'_>) -> Result<TransformResult>;
}

/// Declared parameter of a registration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
}

impl ParameterSpec {
    pub fn with_default(value: impl Into<Value>) -> Self {
        Self {
            default: Some(value.into()),
            required: false,
        }
    }

    pub fn required() -> Self {
        Self {
            default: None,
            required: true,
        }
    }
}

/// A named transform guarded by a push test
#[derive(Clone)]
pub struct TransformRegistration {
    name: String,
    push_test: Arc<dyn PushTest>,
    parameters: BTreeMap<String, ParameterSpec>,
    transform: Arc<dyn Transform>,
}

impl TransformRegistration {
    pub fn new(name: impl Into<String>, push_test: Arc<dyn PushTest>, transform: Arc<dyn Transform>) -> Self {
        Self {
            name: name.into(),
            push_test,
            parameters: BTreeMap::new(),
            transform,
        }
    }

    /// Declare a parameter
    pub fn with_parameter(mut self, key: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters.insert(key.into(), spec);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push_test(&self) -> &Arc<dyn PushTest> {
        &self.push_test
    }

    pub fn transform(&self) -> &Arc<dyn Transform> {
        &self.transform
    }

    pub fn parameters(&self) -> &BTreeMap<String, ParameterSpec> {
        &self.parameters
    }

    /// Declared defaults overlaid with `overrides`.
    ///
    /// Overrides for undeclared keys pass through unchanged. A required
    /// parameter with neither default nor override is an error.
    pub fn bind_parameters(&self, overrides: &Parameters) -> Result<Parameters> {
        let mut bound = Parameters::new();
        for (key, spec) in &self.parameters {
            match overrides.get(key).or(spec.default.as_ref()) {
                Some(value) => {
                    bound.insert(key.clone(), value.clone());
                }
                None if spec.required => {
                    return Err(DeliveryError::Parameter(format!(
                        "{} requires parameter '{}'",
                        self.name, key
                    )));
                }
                None => {}
            }
        }
        for (key, value) in overrides {
            bound.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Ok(bound)
    }
}

impl fmt::Debug for TransformRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistration")
            .field("name", &self.name)
            .field("push_test", &self.push_test.name())
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Ordered set of transform registrations with unique names.
///
/// Built once at startup; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TransformRegistry {
    registrations: Vec<Arc<TransformRegistration>>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a registration.
    ///
    /// Rejects a name whose marker equals, contains or is contained in the
    /// marker of one already registered; either would let one transform's
    /// commit hide another from the idempotency filter.
    pub fn register(&mut self, registration: TransformRegistration) -> Result<()> {
        if self.get(registration.name()).is_some() {
            return Err(DeliveryError::Registry(format!(
                "transform '{}' is already registered",
                registration.name()
            )));
        }
        let marker = marker_for(registration.name());
        if let Some(existing) = self.registrations.iter().find(|r| {
            let other = marker_for(r.name());
            other.contains(&marker) || marker.contains(&other)
        }) {
            return Err(DeliveryError::Registry(format!(
                "transform '{}' has marker {} which collides with '{}'",
                registration.name(),
                marker,
                existing.name()
            )));
        }
        log::debug!("Registered transform {}", registration.name());
        self.registrations.push(Arc::new(registration));
        Ok(())
    }

    /// Builder form of `register`
    pub fn with(mut self, registration: TransformRegistration) -> Result<Self> {
        self.register(registration)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TransformRegistration>> {
        self.registrations.iter().find(|r| r.name() == name)
    }

    /// Registrations in registration order
    pub fn registrations(&self) -> &[Arc<TransformRegistration>] {
        &self.registrations
    }

    pub fn names(&self) -> Vec<&str> {
        self.registrations.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
