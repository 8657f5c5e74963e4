//! Builds - an external process run against a clone of the pushed commit
//!
//! Lifecycle: `NOT_STARTED -> STARTED -> {SUCCESS, FAILURE}`. On success the
//! produced artifact, if any, is stored and its URL recorded on the
//! `artifact` status context.

pub mod artifact;
pub mod builder;
pub mod lifecycle;

pub use artifact::{AppInfo, ArtifactStore, LocalArtifactStore};
pub use builder::{ARTIFACT_CONTEXT, BuildOutcome, BuildSpec, Builder, DEFAULT_BUILD_TIMEOUT_MS, RunningBuild};
pub use lifecycle::{
    BuildLifecycleReporter, BuildPhase, BuildStatus, LifecycleEvent, LogLifecycleReporter, RecordingLifecycleReporter,
    WebhookLifecycleReporter,
};
