//! Shipwright - continuous-delivery goal orchestration
//!
//! Shipwright reacts to pushes and commit-status changes. Each configured goal
//! (autofix, code reaction, build, deploy/verify command) claims its pending
//! status, does its work against a disposable working copy and reports a
//! terminal status.

pub mod autofix;
pub mod build;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod goal;
pub mod id;
pub mod process;
pub mod pushtest;
pub mod registry;
pub mod sdm;
pub mod status;
pub mod workspace;

pub use error::{DeliveryError, Result};
