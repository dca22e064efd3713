//! conductor-inventory - topology from a conductor inventory service
//!
//! This is the main entry point for the conductor-inventory CLI.

mod cli;

use anyhow::Result;
use cli::commands::{inventory, CommandContext, Runnable};
use cli::output::OutputFormatter;
use cli::{Cli, Commands};
use conductor_inventory::config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            OutputFormatter::new(!cli.no_color, cli.is_json(), cli.verbosity())
                .error(&format!("Failed to load config: {:#}", e));
            std::process::exit(2);
        }
    };

    // Initialize logging based on verbosity
    init_logging(cli.verbosity(), config.logging.level.as_deref(), cli.is_json());

    let mut ctx = CommandContext::new(&cli, config);

    let exit_code = match run(&cli, &mut ctx) {
        Ok(code) => code,
        Err(e) => {
            ctx.output.error(&format!("{:#}", e));
            e.downcast_ref::<conductor_inventory::Error>()
                .map_or(1, conductor_inventory::Error::exit_code)
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: &Cli, ctx: &mut CommandContext) -> Result<i32> {
    match &cli.command {
        Commands::Hosts(args) => args.run(ctx),
        Commands::Groups(args) => args.run(ctx),
        Commands::Datacenters => inventory::datacenters(ctx),
        Commands::Reload => inventory::reload(ctx),
        Commands::Cache => inventory::cache(ctx),
    }
}

/// Initialize logging based on verbosity level
///
/// Logs always go to stderr; with `--output json` they are JSON lines too.
fn init_logging(verbosity: u8, configured: Option<&str>, json: bool) {
    let filter = match verbosity {
        0 => configured.unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let json_layer = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbosity >= 3)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
