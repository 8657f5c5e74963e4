//! Core push test interfaces

use async_trait::async_trait;

use crate::domain::{InvocationContext, Push};
use crate::error::Result;
use crate::workspace::WorkingCopy;

/// Everything a push test may look at
pub struct PushTestInvocation<'a> {
    pub push: &'a Push,
    pub working_copy: &'a dyn WorkingCopy,
    pub context: &'a InvocationContext,
}

impl<'a> PushTestInvocation<'a> {
    pub fn new(push: &'a Push, working_copy: &'a dyn WorkingCopy, context: &'a InvocationContext) -> Self {
        Self {
            push,
            working_copy,
            context,
        }
    }
}

/// A named predicate over a push and its working copy
#[async_trait]
pub trait PushTest: Send + Sync {
    /// Name shown in logs
    fn name(&self) -> &str;

    async fn test(&self, invocation: &PushTestInvocation<'_>) -> Result<bool>;
}
