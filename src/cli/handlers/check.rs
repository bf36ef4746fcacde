//! Check command handler
//!
//! Validates that the guild configuration document parses and summarizes
//! what it holds. Useful after hand-edits and before deploys.

use crate::cli::output::OutputFormatter;
use crate::error::Result;
use crate::storage::ConfigStore;
use std::path::Path;

/// Handle the check command
pub async fn handle_check_command(
    config_path: &Path,
    detailed: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let store = ConfigStore::new(config_path);
    let guilds = store.all().await?;

    if guilds.is_empty() {
        formatter.info(&format!(
            "No guilds configured yet ({}).",
            config_path.display()
        ));
        return Ok(());
    }

    formatter.success(&format!(
        "✅ {} guild(s) configured in {}",
        guilds.len(),
        config_path.display()
    ));

    if detailed {
        for (guild, config) in &guilds {
            formatter.info(&format!(
                "  {guild}: {} ticket(s) issued, panel {}, category {}, log {}",
                config.ticket_counter,
                config.panel_channel_id,
                config.category_id,
                config.log_channel_id,
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChannelId, GuildId, RoleId};
    use crate::storage::GuildConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_check_empty_and_populated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ticket_config.json");
        let formatter = OutputFormatter::new(true);

        handle_check_command(&path, false, &formatter).await.unwrap();

        let store = ConfigStore::new(&path);
        store
            .put(
                GuildId::new(1),
                GuildConfig {
                    panel_channel_id: ChannelId::new(10),
                    mod_role_id: RoleId::new(20),
                    admin_role_id: RoleId::new(30),
                    category_id: ChannelId::new(40),
                    log_channel_id: ChannelId::new(50),
                    ticket_counter: 3,
                },
            )
            .await
            .unwrap();

        handle_check_command(&path, true, &formatter).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_rejects_corrupt_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ticket_config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let formatter = OutputFormatter::new(true);
        assert!(handle_check_command(&path, false, &formatter).await.is_err());
    }
}
