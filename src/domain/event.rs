//! Inbound event payloads.
//!
//! The event source (webhook relay, queue, JSON-lines file) is not modelled
//! here; the core depends only on these payload shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::push::Push;
use crate::domain::status::Status;

/// A status changed on a commit; carries the push that owns the commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: Status,
    pub push: Push,
}

impl StatusEvent {
    pub fn new(status: Status, push: Push) -> Self {
        Self { status, push }
    }
}

/// Event type key used by the dispatcher registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Push,
    StatusChanged,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Push => f.write_str("push"),
            EventKind::StatusChanged => f.write_str("status_changed"),
        }
    }
}

/// Every payload the core can receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    Push(Push),
    StatusChanged(StatusEvent),
}

impl InboundEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InboundEvent::Push(_) => EventKind::Push,
            InboundEvent::StatusChanged(_) => EventKind::StatusChanged,
        }
    }

    /// The push this event concerns
    pub fn push(&self) -> &Push {
        match self {
            InboundEvent::Push(push) => push,
            InboundEvent::StatusChanged(event) => &event.push,
        }
    }
}
