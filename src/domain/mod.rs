//! Domain types for Shipwright
//!
//! This module contains all core domain types:
//! - Goal / Phases: named delivery phases and their ordering
//! - Status: the external status record for a (commit, context) pair
//! - Push / Commit / RepoRef: what was pushed and where
//! - InvocationContext: immutable per-invocation credentials and identity
//! - StatusEvent / InboundEvent: typed payloads arriving from the event source
//! - GoalOutcome: what a goal invocation did

pub mod context;
pub mod event;
pub mod goal;
pub mod outcome;
pub mod push;
pub mod status;

pub use context::{Credentials, InvocationContext};
pub use event::{EventKind, InboundEvent, StatusEvent};
pub use goal::{Goal, IdlePolicy, Phases};
pub use outcome::GoalOutcome;
pub use push::{Commit, Push, RepoRef};
pub use status::{Status, StatusState};
