//! CLI module for tasktree - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for running and
//! validating scenarios and inspecting configuration.

pub mod commands;

pub use commands::Cli;
