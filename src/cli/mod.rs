//! CLI module for shipwright - command-line interface and subcommands.
//!
//! Provides the entry point for running the delivery machine locally over a
//! stream of inbound events, and for inspecting its configuration.

pub mod commands;

pub use commands::Cli;
