//! CLI module for conductor-inventory
//!
//! Argument parsing and subcommand dispatch for inspecting the topology the
//! loader publishes.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Inspect the conductor inventory topology
#[derive(Parser, Debug, Clone)]
#[command(name = "conductor-inventory")]
#[command(author = "Conductor Inventory Contributors")]
#[command(version)]
#[command(about = "Cached host/group/datacenter topology from a conductor inventory service", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file, replacing every standard location
    /// (`CONDUCTOR_CONFIG` is layered on top of them instead)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Inventory service base URL (overrides configuration)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Comma separated work groups (overrides configuration)
    #[arg(short = 'w', long = "work-groups", global = true)]
    pub work_groups: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List hosts
    Hosts(commands::inventory::HostsArgs),

    /// List groups with their parents
    Groups(commands::inventory::GroupsArgs),

    /// List datacenters
    Datacenters,

    /// Refresh the inventory from the service, ignoring cache freshness
    Reload,

    /// Show the cache file location and freshness
    Cache,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}
