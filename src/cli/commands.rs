//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: play a scenario through the scheduler
//! - validate: check a scenario file
//! - config: print the effective settings

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tasktree - a cooperative, tick-driven hierarchical task scheduler
#[derive(Parser, Debug)]
#[command(name = "tasktree")]
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
    /// Run a scenario until its tree finishes
    Run {
        /// Scenario file (YAML)
        scenario: PathBuf,

        /// Stop after this many ticks
        #[arg(short, long)]
        max_ticks: Option<u64>,

        /// Tick interval in milliseconds (overrides config)
        #[arg(short, long)]
        tick_ms: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Run on virtual time instead of waiting between ticks
        #[arg(short, long)]
        instant: bool,
    },

    /// Check a scenario file without running it
    Validate {
        /// Scenario file (YAML)
        scenario: PathBuf,
    },

    /// Print the effective configuration
    Config,
}
