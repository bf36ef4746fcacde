//! Interaction routing
//!
//! Inbound user interactions (button presses, menu selections, the setup
//! command) are normalized into [`Interaction`] values and dispatched here.
//! Routing is by stable component id, so any process that knows the ids can
//! serve controls created by an earlier one. Every outcome, success or
//! failure, is acknowledged to the invoking user; errors never escape
//! [`Router::dispatch`].

pub mod components;
mod setup;

pub use setup::{SetupFlow, panel_message};

use crate::core::{ChannelId, GuildId, TicketType, UserId, ticket_from_channel_name};
use crate::error::{GuildDeskError, Result};
use crate::gateway::{ChatGateway, InteractionToken, OutboundMessage};
use crate::storage::ConfigStore;
use crate::tickets::TicketLifecycle;
use std::sync::Arc;
use tracing::{debug, warn};

/// What the user did
#[derive(Debug, Clone)]
pub enum InteractionKind {
    /// A component press; `values` carries menu selections
    Component { id: String, values: Vec<String> },
    /// A slash command; `is_admin` reflects the platform's permission check
    Command { name: String, is_admin: bool },
}

/// One inbound user interaction, normalized from the platform event
#[derive(Debug, Clone)]
pub struct Interaction {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub user: UserId,
    pub kind: InteractionKind,
    pub token: InteractionToken,
}

/// Routes interactions to the lifecycle and setup flow
pub struct Router {
    gateway: Arc<dyn ChatGateway>,
    lifecycle: Arc<TicketLifecycle>,
    setup: SetupFlow,
}

impl Router {
    /// Create a router wiring the full ticket stack over one gateway
    #[must_use]
    pub fn new(gateway: Arc<dyn ChatGateway>, store: Arc<ConfigStore>) -> Self {
        Self {
            lifecycle: Arc::new(TicketLifecycle::new(gateway.clone(), store.clone())),
            setup: SetupFlow::new(gateway.clone(), store),
            gateway,
        }
    }

    /// The lifecycle manager behind this router
    #[must_use]
    pub fn lifecycle(&self) -> Arc<TicketLifecycle> {
        self.lifecycle.clone()
    }

    /// Dispatch one interaction, acknowledging the outcome to the user
    ///
    /// Failures are rendered with their user message and delivered
    /// ephemerally; they are terminal for this one action and never
    /// propagate.
    pub async fn dispatch(&self, interaction: Interaction) {
        if let Err(e) = self.route(&interaction).await {
            if !matches!(
                e,
                GuildDeskError::ConfigNotFound { .. }
                    | GuildDeskError::Forbidden
                    | GuildDeskError::AlreadyOpen { .. }
                    | GuildDeskError::AlreadyClaimed
            ) {
                warn!(user = %interaction.user, error = %e, "interaction failed");
            }
            if let Err(ack_err) = self
                .gateway
                .ephemeral_reply(&interaction.token, &e.user_message())
                .await
            {
                warn!(error = %ack_err, "failed to acknowledge interaction failure");
            }
        }
    }

    async fn route(&self, interaction: &Interaction) -> Result<()> {
        match &interaction.kind {
            InteractionKind::Component { id, values } => match id.as_str() {
                components::OPEN_BUTTON_ID => self.prompt_ticket_type(interaction).await,
                components::TYPE_SELECT_ID => self.open_ticket(interaction, values).await,
                components::CLAIM_BUTTON_ID => self.claim_ticket(interaction).await,
                components::CLOSE_BUTTON_ID => self.close_ticket(interaction).await,
                other => {
                    debug!(component = other, "ignoring unknown component");
                    Ok(())
                },
            },
            InteractionKind::Command { name, is_admin } => {
                if name != components::SETUP_COMMAND {
                    debug!(command = %name, "ignoring unknown command");
                    return Ok(());
                }
                if !*is_admin {
                    return Err(GuildDeskError::Forbidden);
                }
                self.setup
                    .run(
                        interaction.guild,
                        interaction.channel,
                        interaction.user,
                        &interaction.token,
                    )
                    .await
            },
        }
    }

    /// Panel button: offer the type menu, visible only to the requester
    async fn prompt_ticket_type(&self, interaction: &Interaction) -> Result<()> {
        self.gateway
            .ephemeral_reply_with(
                &interaction.token,
                OutboundMessage::new()
                    .content("Please select your ticket type:")
                    .component(components::type_select()),
            )
            .await?;
        Ok(())
    }

    /// Type menu: open the ticket and point the requester at its channel
    async fn open_ticket(&self, interaction: &Interaction, values: &[String]) -> Result<()> {
        let selected = values
            .first()
            .ok_or_else(|| GuildDeskError::custom("type selection carried no value"))?;
        let ticket_type: TicketType = selected.parse()?;

        let opened = self
            .lifecycle
            .open(interaction.guild, interaction.user, ticket_type)
            .await?;

        self.gateway
            .ephemeral_reply(
                &interaction.token,
                &format!(
                    "Your **{ticket_type}** ticket has been created: {}",
                    opened.channel.id.mention()
                ),
            )
            .await?;
        Ok(())
    }

    async fn claim_ticket(&self, interaction: &Interaction) -> Result<()> {
        self.lifecycle
            .claim(interaction.guild, interaction.user, interaction.channel)
            .await?;
        self.gateway
            .ephemeral_reply(&interaction.token, "Ticket claimed!")
            .await?;
        Ok(())
    }

    async fn close_ticket(&self, interaction: &Interaction) -> Result<()> {
        // Recover the ticket's identity from its channel name; there is no
        // per-message state to consult after a restart.
        let channel = self.gateway.channel_info(interaction.channel).await?;
        let (ticket_type, number) = ticket_from_channel_name(&channel.name)
            .ok_or_else(|| GuildDeskError::custom(format!("{} is not a ticket channel", channel.name)))?;

        // The staff check runs before the closing acknowledgement so a
        // non-staff press is refused without announcing a closure.
        self.lifecycle
            .authorize_staff(interaction.guild, interaction.user)
            .await?;

        self.gateway
            .ephemeral_reply(&interaction.token, "Closing ticket...")
            .await?;

        if let Err(e) = self
            .lifecycle
            .close(
                interaction.guild,
                interaction.user,
                interaction.channel,
                ticket_type,
                number,
            )
            .await
        {
            warn!(channel = %interaction.channel, error = %e, "close failed after acknowledgement");
            self.gateway
                .followup(&interaction.token, &e.user_message())
                .await?;
        }
        Ok(())
    }
}
