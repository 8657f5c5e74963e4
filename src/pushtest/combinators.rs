//! Boolean composition of push tests

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::pushtest::traits::{PushTest, PushTestInvocation};

fn joined_name(tests: &[Arc<dyn PushTest>], sep: &str) -> String {
    let names: Vec<&str> = tests.iter().map(|t| t.name()).collect();
    format!("({})", names.join(sep))
}

/// Passes when every test passes; stops at the first failure
pub struct AllOf {
    tests: Vec<Arc<dyn PushTest>>,
    name: String,
}

impl AllOf {
    pub fn new(tests: Vec<Arc<dyn PushTest>>) -> Self {
        let name = joined_name(&tests, " && ");
        Self { tests, name }
    }
}

#[async_trait]
impl PushTest for AllOf {
    fn name(&self) -> &str {
        &self.name
    }

    async fn test(&self, invocation: &PushTestInvocation<'_>) -> Result<bool> {
        for test in &self.tests {
            if !test.test(invocation).await? {
                log::debug!("{} failed at {}", self.name, test.name());
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Passes when any test passes; stops at the first success
pub struct AnyOf {
    tests: Vec<Arc<dyn PushTest>>,
    name: String,
}

impl AnyOf {
    pub fn new(tests: Vec<Arc<dyn PushTest>>) -> Self {
        let name = joined_name(&tests, " || ");
        Self { tests, name }
    }
}

#[async_trait]
impl PushTest for AnyOf {
    fn name(&self) -> &str {
        &self.name
    }

    async fn test(&self, invocation: &PushTestInvocation<'_>) -> Result<bool> {
        for test in &self.tests {
            if test.test(invocation).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Negates a test
pub struct Not {
    test: Arc<dyn PushTest>,
    name: String,
}

impl Not {
    pub fn new(test: Arc<dyn PushTest>) -> Self {
        let name = format!("!{}", test.name());
        Self { test, name }
    }
}

#[async_trait]
impl PushTest for Not {
    fn name(&self) -> &str {
        &self.name
    }

    async fn test(&self, invocation: &PushTestInvocation<'_>) -> Result<bool> {
        Ok(!self.test.test(invocation).await?)
    }
}

pub fn all_of(tests: Vec<Arc<dyn PushTest>>) -> Arc<dyn PushTest> {
    Arc::new(AllOf::new(tests))
}

pub fn any_of(tests: Vec<Arc<dyn PushTest>>) -> Arc<dyn PushTest> {
    Arc::new(AnyOf::new(tests))
}

pub fn not(test: Arc<dyn PushTest>) -> Arc<dyn PushTest> {
    Arc::new(Not::new(test))
}
