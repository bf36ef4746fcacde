//! guilddesk - support-ticket workflow for chat guilds
//!
//! Entry point: parses arguments, initializes logging and settings, and
//! dispatches to the command handlers.

use clap::Parser;
use guilddesk::cli::{Cli, Commands, OutputFormatter, handlers::handle_check_command};
use guilddesk::config::Settings;
use guilddesk::error::{GuildDeskError, Result};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let formatter = OutputFormatter::new(cli.no_color);

    if let Err(e) = run(cli, &formatter).await {
        handle_error(&e, &formatter);
        process::exit(1);
    }
}

/// Run the requested command with merged settings
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    init_logging(cli.verbose);

    let mut settings = Settings::load_or_default()?;
    if let Some(path) = cli.config {
        settings.config_path = path;
    }

    match cli.command {
        #[cfg(feature = "discord")]
        Commands::Serve { token, port } => {
            use guilddesk::cli::handlers::handle_serve_command;
            if let Some(token) = token {
                settings.bot_token = Some(token);
            }
            if let Some(port) = port {
                settings.liveness_port = port;
            }
            handle_serve_command(settings, formatter).await
        },
        Commands::Check { detailed } => {
            handle_check_command(&settings.config_path, detailed, formatter).await
        },
    }
}

/// Initialize tracing with RUST_LOG taking precedence over the verbosity flag
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Display an error and, in debug logging, its full chain
fn handle_error(error: &GuildDeskError, formatter: &OutputFormatter) {
    formatter.error(&error.to_string());

    if tracing::enabled!(tracing::Level::DEBUG) {
        eprintln!("\nDebug information:");
        eprintln!("{error:?}");
    }
}
