//! One-time guild setup flow
//!
//! An administrator runs the setup command, replies with five numeric
//! identifiers, and the flow writes a fresh guild configuration (counter
//! reset to 0) and posts the ticket panel to the named channel.

use crate::core::{ChannelId, GuildId, RoleId, UserId};
use crate::error::{GuildDeskError, Result};
use crate::gateway::{ChatGateway, Embed, InteractionToken, OutboundMessage, colours};
use crate::interactions::components;
use crate::storage::{ConfigStore, GuildConfig};
use std::sync::Arc;
use tracing::info;

/// Prompt sent to the administrator after invoking the setup command
const SETUP_PROMPT: &str =
    "Reply with:\n`panel_channel_id mod_role_id admin_role_id category_id log_channel_id`";

/// Interactive configuration wizard for one guild
#[derive(Clone)]
pub struct SetupFlow {
    gateway: Arc<dyn ChatGateway>,
    store: Arc<ConfigStore>,
}

impl SetupFlow {
    /// Create a setup flow over the given gateway and store
    #[must_use]
    pub fn new(gateway: Arc<dyn ChatGateway>, store: Arc<ConfigStore>) -> Self {
        Self { gateway, store }
    }

    /// Run the wizard for one guild
    ///
    /// The caller has already verified the invoker is an administrator.
    /// Overwrites any existing configuration for the guild.
    pub async fn run(
        &self,
        guild: GuildId,
        channel: ChannelId,
        user: UserId,
        token: &InteractionToken,
    ) -> Result<()> {
        self.gateway.ephemeral_reply(token, SETUP_PROMPT).await?;

        let reply = self.gateway.await_reply(channel, user).await?;
        let config = parse_setup_reply(&reply.content)?;
        let panel_channel = config.panel_channel_id;

        self.store.put(guild, config).await?;
        self.gateway
            .send_message(panel_channel, panel_message())
            .await?;
        self.gateway.followup(token, "Ticket system configured.").await?;

        info!(%guild, %user, panel = %panel_channel, "ticket system configured");
        Ok(())
    }
}

/// The panel message exposing the "Open Ticket" control to end users
#[must_use]
pub fn panel_message() -> OutboundMessage {
    OutboundMessage::new()
        .embed(
            Embed::new("🎟️ Support Tickets", "Click below to open a ticket.")
                .colour(colours::GREEN),
        )
        .component(components::open_button())
}

/// Parse five space-separated numeric identifiers into a fresh config
fn parse_setup_reply(content: &str) -> Result<GuildConfig> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() != 5 {
        return Err(GuildDeskError::InvalidSetupReply {
            reason: format!("expected 5 identifiers, got {}", parts.len()),
        });
    }

    let mut ids = [0u64; 5];
    for (slot, part) in ids.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| GuildDeskError::InvalidSetupReply {
                reason: format!("`{part}` is not a numeric identifier"),
            })?;
    }

    Ok(GuildConfig {
        panel_channel_id: ChannelId::new(ids[0]),
        mod_role_id: RoleId::new(ids[1]),
        admin_role_id: RoleId::new(ids[2]),
        category_id: ChannelId::new(ids[3]),
        log_channel_id: ChannelId::new(ids[4]),
        ticket_counter: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Component;
    use crate::gateway::memory::InMemoryGateway;
    use tempfile::TempDir;

    #[test]
    fn test_parse_setup_reply() {
        let config = parse_setup_reply("10 20 30 40 50").unwrap();
        assert_eq!(config.panel_channel_id, ChannelId::new(10));
        assert_eq!(config.mod_role_id, RoleId::new(20));
        assert_eq!(config.admin_role_id, RoleId::new(30));
        assert_eq!(config.category_id, ChannelId::new(40));
        assert_eq!(config.log_channel_id, ChannelId::new(50));
        assert_eq!(config.ticket_counter, 0);
    }

    #[test]
    fn test_parse_setup_reply_rejects_malformed_input() {
        assert!(matches!(
            parse_setup_reply("10 20 30"),
            Err(GuildDeskError::InvalidSetupReply { .. })
        ));
        assert!(matches!(
            parse_setup_reply("10 20 thirty 40 50"),
            Err(GuildDeskError::InvalidSetupReply { .. })
        ));
    }

    #[test]
    fn test_panel_message_shape() {
        let panel = panel_message();
        let embed = panel.embed.expect("panel carries an embed");
        assert_eq!(embed.title, "🎟️ Support Tickets");
        assert!(matches!(&panel.components[0], Component::Button(b) if b.id == "ticket_open_button"));
    }

    #[tokio::test]
    async fn test_run_writes_config_and_posts_panel() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(InMemoryGateway::new());
        let store = Arc::new(ConfigStore::new(dir.path().join("ticket_config.json")));
        let guild = GuildId::new(1);
        let admin = UserId::new(9);

        let admin_channel = gateway.add_channel(guild, None, "admin", None);
        let panel_channel = gateway.add_channel(guild, None, "tickets", None);
        gateway.queue_reply(
            admin_channel,
            admin,
            format!("{panel_channel} 20 30 40 50"),
        );

        let flow = SetupFlow::new(gateway.clone(), store.clone());
        flow.run(guild, admin_channel, admin, &InteractionToken::new("t1"))
            .await
            .unwrap();

        // Counter starts at 0 and the record is durable
        let config = store.guild(guild).await.unwrap();
        assert_eq!(config.ticket_counter, 0);
        assert_eq!(config.panel_channel_id, panel_channel);

        // The panel landed in the named channel
        let history = gateway.full_history(panel_channel).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].embeds[0].title, "🎟️ Support Tickets");

        // Prompt and confirmation both went to the admin
        let acks = gateway.ephemeral_replies().await;
        assert_eq!(acks.len(), 2);
        assert_eq!(acks[1], "Ticket system configured.");
    }

    #[tokio::test]
    async fn test_run_with_malformed_reply_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(InMemoryGateway::new());
        let store = Arc::new(ConfigStore::new(dir.path().join("ticket_config.json")));
        let guild = GuildId::new(1);
        let admin = UserId::new(9);

        let admin_channel = gateway.add_channel(guild, None, "admin", None);
        gateway.queue_reply(admin_channel, admin, "not five ids");

        let flow = SetupFlow::new(gateway.clone(), store.clone());
        let err = flow
            .run(guild, admin_channel, admin, &InteractionToken::new("t1"))
            .await
            .unwrap_err();

        assert!(matches!(err, GuildDeskError::InvalidSetupReply { .. }));
        assert!(store.get(guild).await.unwrap().is_none());
    }
}
