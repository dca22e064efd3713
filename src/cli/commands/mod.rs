//! Subcommands module for the conductor-inventory CLI

pub mod inventory;

use crate::cli::output::OutputFormatter;
use anyhow::Result;
use conductor_inventory::config::Config;
use conductor_inventory::inventory::Loader;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration, with command-line overrides applied
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, mut config: Config) -> Self {
        let output = OutputFormatter::new(!cli.no_color, cli.is_json(), cli.verbosity());

        if let Some(url) = &cli.url {
            config.backend.url = Some(url.clone());
        }
        if let Some(work_groups) = &cli.work_groups {
            config.backend.work_groups = Some(work_groups.clone());
        }

        Self { config, output }
    }

    /// Build a loader from the effective configuration
    pub fn loader(&self) -> Result<Loader> {
        Ok(Loader::new(&self.config)?)
    }
}

/// Trait for runnable commands
pub trait Runnable {
    /// Execute the command, returning the process exit code
    fn run(&self, ctx: &mut CommandContext) -> Result<i32>;
}
