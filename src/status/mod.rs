//! Status reporting - writing commit status records to the tracking system
//!
//! This module provides:
//! - StatusReporter trait for the external status-write call
//! - GitHubStatusReporter for the GitHub commit status API
//! - RecordingStatusReporter, an in-memory reporter for local runs and tests
//! - RetryingStatusReporter, an opt-in bounded retry decorator
//!
//! A failed terminal status write leaves the record showing `pending` while the
//! work has actually finished. Nothing here retries unless the caller wraps the
//! reporter in `RetryingStatusReporter`.

pub mod github;
pub mod memory;
pub mod reporter;
pub mod retry;

pub use github::{GitHubStatusConfig, GitHubStatusReporter};
pub use memory::RecordingStatusReporter;
pub use reporter::StatusReporter;
pub use retry::RetryingStatusReporter;
