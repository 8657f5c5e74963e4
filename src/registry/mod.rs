//! Transform and code reaction registrations
//!
//! Registries are populated once at startup and shared read-only by every
//! invocation afterwards.

pub mod command;
pub mod header;
pub mod reaction;
pub mod transform;

pub use command::{CommandReaction, CommandTransform, FILES_CHANGED_ENV};
pub use header::HeaderTransform;
pub use reaction::{CodeReaction, CodeReactionInvocation, CodeReactionRegistration, CodeReactionRegistry};
pub use transform::{
    ParameterSpec, Parameters, Transform, TransformInvocation, TransformRegistration, TransformRegistry,
    TransformResult,
};
