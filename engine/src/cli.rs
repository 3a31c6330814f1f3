//! CLI interface for Scribe
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Scribe meeting-transcript pipeline
///
/// Turns a meeting transcript into insights, notes, action items, a
/// repository plan and an article outline, one bounded reasoning step at a
/// time.
#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the pipeline over a transcript
    Run {
        /// Transcript file, or `-` to read standard input
        transcript: String,

        /// Directory for results.json and summary.md
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Override the iteration cap of every step
        #[arg(long, value_name = "N")]
        max_iterations: Option<u32>,

        /// Replay engine replies from a JSON script instead of calling a provider
        #[arg(long, value_name = "FILE")]
        script: Option<PathBuf>,

        /// Do not record the run in history
        #[arg(long)]
        no_save: bool,
    },

    /// List the configured pipeline steps
    Steps,

    /// Show run history
    History {
        /// Number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Delete runs older than this many days first
        #[arg(long, value_name = "DAYS")]
        prune: Option<i64>,
    },

    /// Show the stored results of a run
    Replay {
        /// Run ID to replay
        run_id: String,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check configuration and provider health
    Doctor,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}
