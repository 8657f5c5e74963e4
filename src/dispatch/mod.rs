//! Event dispatch - an explicit registry from event kind to ordered handlers
//!
//! Handlers are registered at startup. `PhaseSetter` answers push events by
//! planning goals; one `GoalHandler` per goal answers status-changed events.

pub mod dispatcher;
pub mod handler;
pub mod phases;

pub use dispatcher::{DispatchSummary, Dispatcher, EventReport, HandlerRun};
pub use handler::{EventHandler, GoalHandler, HandlerReport};
pub use phases::{PhaseRule, PhaseSetter, Plan};
