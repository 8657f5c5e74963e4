//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: dispatch JSON-lines inbound events and print a summary
//! - goals: list configured goals, phases, autofixes and code reactions
//! - marker: print the idempotency marker for an autofix name

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Shipwright - continuous-delivery goal orchestration
#[derive(Parser, Debug)]
#[command(name = "shipwright")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch inbound events, one JSON object per line
    Run {
        /// Events file; stdin when omitted
        #[arg(short, long)]
        events: Option<PathBuf>,
    },

    /// List configured goals and phases
    Goals,

    /// Print the idempotency marker an autofix leaves in its commits
    Marker {
        /// Autofix name
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["shipwright"]).is_err());
    }

    #[test]
    fn test_run_reads_stdin_by_default() {
        let cli = Cli::try_parse_from(["shipwright", "run"]).unwrap();
        match &cli.command {
            Commands::Run { events } => assert!(events.is_none()),
            other => panic!("Expected run command, got {:?}", other),
        }
        assert!(!cli.is_verbose());
    }

    #[test]
    fn test_run_with_events_file() {
        let cli = Cli::try_parse_from(["shipwright", "-v", "run", "--events", "events.jsonl"]).unwrap();
        assert!(cli.is_verbose());
        match cli.command {
            Commands::Run { events } => assert_eq!(events, Some(PathBuf::from("events.jsonl"))),
            other => panic!("Expected run command, got {:?}", other),
        }
    }

    #[test]
    fn test_config_option_is_global() {
        let cli = Cli::try_parse_from(["shipwright", "goals", "-c", "/etc/shipwright.yml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/shipwright.yml")));
        assert!(matches!(cli.command, Commands::Goals));
    }

    #[test]
    fn test_marker_name() {
        let cli = Cli::try_parse_from(["shipwright", "marker", "License header"]).unwrap();
        match cli.command {
            Commands::Marker { name } => assert_eq!(name, "License header"),
            other => panic!("Expected marker command, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
