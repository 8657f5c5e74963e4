//! Goals - the status state machine and the executors behind it
//!
//! A `GoalStatusMachine` pairs one goal with one executor. It claims the
//! goal's pending status, runs the executor and writes the terminal status.

pub mod autofix;
pub mod build;
pub mod command;
pub mod executor;
pub mod machine;
pub mod reaction;

pub use autofix::AutofixExecutor;
pub use build::BuildExecutor;
pub use command::CommandExecutor;
pub use executor::{ExecutionResult, GoalExecutor, GoalInvocation};
pub use machine::GoalStatusMachine;
pub use reaction::CodeReactionExecutor;
