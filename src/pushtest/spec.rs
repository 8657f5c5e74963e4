//! Declarative push tests, as written in the config file
//!
//! ```yaml
//! push_test:
//!   all:
//!     - has_file: "**/*.ts"
//!     - not:
//!         branch: gh-pages
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pushtest::builtin::{Always, FileContains, HasFile, Never, OnBranch};
use crate::pushtest::combinators::{all_of, any_of, not};
use crate::pushtest::traits::PushTest;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushTestSpec {
    #[default]
    Always,
    Never,
    HasFile(String),
    FileContains { pattern: String, text: String },
    Branch(String),
    All(Vec<PushTestSpec>),
    Any(Vec<PushTestSpec>),
    Not(Box<PushTestSpec>),
}

impl PushTestSpec {
    /// Build the push test this spec describes
    pub fn compile(&self) -> Result<Arc<dyn PushTest>> {
        Ok(match self {
            PushTestSpec::Always => Arc::new(Always),
            PushTestSpec::Never => Arc::new(Never),
            PushTestSpec::HasFile(pattern) => Arc::new(HasFile::new(pattern)?),
            PushTestSpec::FileContains { pattern, text } => Arc::new(FileContains::new(pattern, text.clone())?),
            PushTestSpec::Branch(branch) => Arc::new(OnBranch::new(branch.clone())),
            PushTestSpec::All(specs) => all_of(Self::compile_all(specs)?),
            PushTestSpec::Any(specs) => any_of(Self::compile_all(specs)?),
            PushTestSpec::Not(spec) => not(spec.compile()?),
        })
    }

    fn compile_all(specs: &[PushTestSpec]) -> Result<Vec<Arc<dyn PushTest>>> {
        specs.iter().map(PushTestSpec::compile).collect()
    }
}
