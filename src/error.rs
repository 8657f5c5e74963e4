//! Error types for Shipwright
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::domain::StatusState;

/// All error types that can occur while executing a goal
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Clone, revert, commit or push against a working copy failed
    #[error("Working copy error: {0}")]
    WorkingCopy(String),

    /// A transform threw or reported an unsuccessful run
    #[error("Transform failed: {0}")]
    Transform(String),

    /// A push test could not be evaluated
    #[error("Push test error: {0}")]
    PushTest(String),

    /// Invalid registration (duplicate name, unknown goal, ...)
    #[error("Registry error: {0}")]
    Registry(String),

    /// Parameter binding for a transform failed
    #[error("Parameter error: {0}")]
    Parameter(String),

    /// Writing a commit status failed
    #[error("Status error: {0}")]
    Status(String),

    /// Build process exited non-zero or could not be spawned
    #[error("Build failed: {0}")]
    Build(String),

    /// A deploy or verify command exited non-zero
    #[error("Command failed: {0}")]
    Command(String),

    /// Storing a build artifact failed
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Event dispatch failed
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeliveryError {
    /// The terminal status state a goal reports when it fails with this error.
    ///
    /// Transform, build and command failures are the fault of the code under
    /// delivery and map to `failure`; everything else is infrastructure and
    /// maps to `error`.
    pub fn terminal_state(&self) -> StatusState {
        match self {
            DeliveryError::Transform(_) | DeliveryError::Build(_) | DeliveryError::Command(_) => {
                StatusState::Failure
            }
            _ => StatusState::Error,
        }
    }
}

/// Result type alias for Shipwright operations
pub type Result<T> = std::result::Result<T, DeliveryError>;
