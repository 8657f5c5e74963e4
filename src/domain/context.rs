//! Per-invocation context.
//!
//! Every goal invocation receives one immutable `InvocationContext` built by
//! the caller. Nothing is injected behind its back.

use std::fmt;

use crate::id::generate_correlation_id;

/// Token credentials used for clone, push and status writes
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn token(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn secret(&self) -> &str {
        &self.token
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("token", &"<redacted>").finish()
    }
}

/// Immutable identity and credentials for one invocation
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub correlation_id: String,
    pub team_id: String,
    pub credentials: Credentials,
}

impl InvocationContext {
    pub fn new(team_id: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            correlation_id: generate_correlation_id(),
            team_id: team_id.into(),
            credentials,
        }
    }
}
