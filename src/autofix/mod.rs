//! Autofixes - transforms that edit a pushed commit and push the result
//!
//! Each applied transform leaves a marker in the commit message. Later pushes
//! carrying that commit skip the transform, which is how a fix is applied at
//! most once without any lock.

pub mod executor;
pub mod idempotency;

pub use executor::{ApplyOutcome, TransformExecutor};
pub use idempotency::{GENERATED_MARKER, already_applied, commit_message, filter_applied, marker_for};
