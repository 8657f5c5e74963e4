//! Working copies - disposable local materializations of a repository
//!
//! Every invocation clones its own working copy; no working copy is shared
//! across concurrent invocations.

#[cfg(test)]
pub(crate) mod fixture;
mod git;
mod memory;
mod select;
mod traits;

pub use git::{GitAuthor, GitWorkingCopy, GitWorkingCopyProvider};
pub use memory::{InMemoryProvider, InMemoryWorkingCopy};
pub use select::{compile_glob, files_matching, glob_matches};
pub use traits::{GitStatus, WorkingCopy, WorkingCopyProvider};
