//! Push tests - predicates deciding whether a push is relevant
//!
//! Push tests are named, read-only with respect to the working copy, and
//! compose with `all_of`, `any_of` and `not`. Composition short-circuits so an
//! expensive file scan is skipped once the outcome is known.

pub mod builtin;
pub mod combinators;
pub mod spec;
pub mod traits;

pub use builtin::{Always, FileContains, HasFile, Never, OnBranch, PushPredicate, predicate};
pub use combinators::{AllOf, AnyOf, Not, all_of, any_of, not};
pub use spec::PushTestSpec;
pub use traits::{PushTest, PushTestInvocation};
