//! Command-line interface definitions

pub mod handlers;
mod output;

pub use output::OutputFormatter;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Support-ticket workflow for chat guilds
#[derive(Parser)]
#[command(name = "guilddesk", version, about)]
pub struct Cli {
    /// Path of the guild configuration document
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot and the liveness endpoint
    #[cfg(feature = "discord")]
    Serve {
        /// Bot token; falls back to settings or GUILDDESK_BOT_TOKEN
        #[arg(long, env = "GUILDDESK_BOT_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Liveness endpoint port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate and summarize the guild configuration document
    Check {
        /// Show per-guild details
        #[arg(long)]
        detailed: bool,
    },
}
