//! Command-line interface for deckbench.
//!
//! Provides commands for running evaluations, answering single cases, and
//! the offline sanitize/select tools.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
