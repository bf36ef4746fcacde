//! Serve command handler
//!
//! Runs the Discord-backed bot and the liveness endpoint until the process
//! is stopped.

use crate::cli::output::OutputFormatter;
use crate::config::Settings;
use crate::error::{GuildDeskError, Result};

/// Handle the serve command
pub async fn handle_serve_command(settings: Settings, formatter: &OutputFormatter) -> Result<()> {
    formatter.info(&format!(
        "Starting guilddesk (config: {}, liveness: {}:{})",
        settings.config_path.display(),
        settings.liveness_host,
        settings.liveness_port
    ));

    let liveness_addr = settings.liveness_addr()?;
    tokio::spawn(async move {
        if let Err(e) = crate::api::serve(liveness_addr).await {
            tracing::error!(error = %e, "liveness endpoint failed");
        }
    });

    crate::gateway::discord::serve_bot(&settings)
        .await
        .map_err(|e| GuildDeskError::custom(e.to_string()))
}
