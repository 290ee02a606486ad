//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Conductor using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Conductor - transit data pipeline orchestrator
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(version, about, long_about = None)]
#[command(author = "Conductor Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "conductor.toml", env = "CONDUCTOR_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CONDUCTOR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline for one provider delivery
    Run(commands::run::RunArgs),

    /// Merge GTFS archives into a single deduplicated archive
    Merge(commands::merge::MergeArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
