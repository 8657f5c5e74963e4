//! Built-in push tests

use std::sync::Arc;

use async_trait::async_trait;
use glob::Pattern;

use crate::domain::Push;
use crate::error::{DeliveryError, Result};
use crate::pushtest::traits::{PushTest, PushTestInvocation};
use crate::workspace::{compile_glob, files_matching};

/// Always passes
pub struct Always;

#[async_trait]
impl PushTest for Always {
    fn name(&self) -> &str {
        "always"
    }

    async fn test(&self, _invocation: &PushTestInvocation<'_>) -> Result<bool> {
        Ok(true)
    }
}

/// Never passes
pub struct Never;

#[async_trait]
impl PushTest for Never {
    fn name(&self) -> &str {
        "never"
    }

    async fn test(&self, _invocation: &PushTestInvocation<'_>) -> Result<bool> {
        Ok(false)
    }
}

/// Passes when any file in the working copy matches a glob
pub struct HasFile {
    pattern: Pattern,
    name: String,
}

impl HasFile {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: compile_glob(pattern, DeliveryError::PushTest)?,
            name: format!("has_file({})", pattern),
        })
    }
}

#[async_trait]
impl PushTest for HasFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn test(&self, invocation: &PushTestInvocation<'_>) -> Result<bool> {
        Ok(!files_matching(invocation.working_copy, &self.pattern).await?.is_empty())
    }
}

/// Passes when any file matching a glob contains some text
pub struct FileContains {
    pattern: Pattern,
    text: String,
    name: String,
}

impl FileContains {
    pub fn new(pattern: &str, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        Ok(Self {
            pattern: compile_glob(pattern, DeliveryError::PushTest)?,
            name: format!("file_contains({}, {:?})", pattern, text),
            text,
        })
    }
}

#[async_trait]
impl PushTest for FileContains {
    fn name(&self) -> &str {
        &self.name
    }

    async fn test(&self, invocation: &PushTestInvocation<'_>) -> Result<bool> {
        let wc = invocation.working_copy;
        for path in files_matching(wc, &self.pattern).await? {
            if let Some(content) = wc.read_file(&path).await?
                && content.contains(&self.text)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Passes when the push is to the named branch
pub struct OnBranch {
    branch: String,
    name: String,
}

impl OnBranch {
    pub fn new(branch: impl Into<String>) -> Self {
        let branch = branch.into();
        Self {
            name: format!("branch({})", branch),
            branch,
        }
    }
}

#[async_trait]
impl PushTest for OnBranch {
    fn name(&self) -> &str {
        &self.name
    }

    async fn test(&self, invocation: &PushTestInvocation<'_>) -> Result<bool> {
        Ok(invocation.push.branch == self.branch)
    }
}

type PushFn = dyn Fn(&Push) -> bool + Send + Sync;

/// A push test over push metadata only
pub struct PushPredicate {
    name: String,
    f: Box<PushFn>,
}

#[async_trait]
impl PushTest for PushPredicate {
    fn name(&self) -> &str {
        &self.name
    }

    async fn test(&self, invocation: &PushTestInvocation<'_>) -> Result<bool> {
        Ok((self.f)(invocation.push))
    }
}

/// Build a named push test from a closure over the push
pub fn predicate<F>(name: impl Into<String>, f: F) -> Arc<dyn PushTest>
where
    F: Fn(&Push) -> bool + Send + Sync + 'static,
{
    Arc::new(PushPredicate {
        name: name.into(),
        f: Box::new(f),
    })
}
