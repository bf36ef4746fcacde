//! Discord gateway backend
//!
//! Implements [`ChatGateway`] over the Discord REST API and translates
//! gateway events into [`Interaction`] values for the router. Nothing here
//! holds per-message state: controls are routed purely by their stable
//! custom ids, so they keep working across restarts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serenity::all::{
    ButtonStyle as DiscordButtonStyle, Channel, ChannelType as DiscordChannelType, Client,
    Command as DiscordCommand, CommandInteraction, ComponentInteraction,
    ComponentInteractionDataKind, Context, CreateActionRow, CreateAttachment, CreateButton,
    CreateChannel as CreateDiscordChannel, CreateCommand, CreateEmbed, CreateEmbedFooter,
    CreateInteractionResponse, CreateInteractionResponseFollowup, CreateInteractionResponseMessage,
    CreateMessage, CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption, EditMessage,
    EventHandler, GatewayIntents, GetMessages, Interaction as DiscordInteraction,
    Message, PermissionOverwriteType, Permissions, ReactionType, Ready,
};
use serenity::http::Http;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::core::{ChannelId, GuildId, MessageId, RoleId, UserId};
use crate::gateway::{
    Button, ButtonStyle, ChannelMessage, ChannelPermissions, ChannelRef, ChatGateway, Component,
    CreateChannel, Embed, GatewayError, InteractionToken, OutboundMessage, OverwriteTarget,
    PermissionOverwrite, SelectMenu, colours,
};
use crate::interactions::{Interaction, InteractionKind, Router, components};
use crate::storage::ConfigStore;

/// How long the setup flow waits for the administrator's reply
const REPLY_TIMEOUT: Duration = Duration::from_secs(120);

/// A live interaction awaiting acknowledgement
enum AckTarget {
    Component(ComponentInteraction),
    Command(CommandInteraction),
}

struct PendingAck {
    target: AckTarget,
    acked: AtomicBool,
}

/// [`ChatGateway`] over the Discord REST API
pub struct DiscordGateway {
    http: Arc<Http>,
    bot_user: AtomicU64,
    pending_acks: DashMap<String, Arc<PendingAck>>,
    pending_replies: DashMap<(ChannelId, UserId), oneshot::Sender<ChannelMessage>>,
}

impl DiscordGateway {
    /// Create a gateway over an authenticated HTTP client
    #[must_use]
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            bot_user: AtomicU64::new(0),
            pending_acks: DashMap::new(),
            pending_replies: DashMap::new(),
        }
    }

    fn set_bot_user(&self, id: u64) {
        self.bot_user.store(id, Ordering::SeqCst);
    }

    fn register_ack(&self, token: &InteractionToken, target: AckTarget) {
        self.pending_acks.insert(
            token.0.clone(),
            Arc::new(PendingAck {
                target,
                acked: AtomicBool::new(false),
            }),
        );
    }

    fn finish_interaction(&self, token: &InteractionToken) {
        self.pending_acks.remove(&token.0);
    }

    /// Hand an inbound message to a waiting `await_reply`, if any
    fn fulfil_reply(&self, message: &Message) {
        let key = (
            ChannelId::new(message.channel_id.get()),
            UserId::new(message.author.id.get()),
        );
        if let Some((_, sender)) = self.pending_replies.remove(&key) {
            let _ = sender.send(convert_message(message));
        }
    }

    /// Acknowledge an interaction: first call responds, later calls follow up
    async fn ack(
        &self,
        token: &InteractionToken,
        content: &str,
        rows: Vec<CreateActionRow>,
    ) -> Result<(), GatewayError> {
        let pending = self
            .pending_acks
            .get(&token.0)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| GatewayError::NotFound("interaction".to_string()))?;

        if pending.acked.swap(true, Ordering::SeqCst) {
            let mut followup = CreateInteractionResponseFollowup::new()
                .content(content)
                .ephemeral(true);
            if !rows.is_empty() {
                followup = followup.components(rows);
            }
            match &pending.target {
                AckTarget::Component(i) => i
                    .create_followup(&self.http, followup)
                    .await
                    .map(|_| ())
                    .map_err(map_err),
                AckTarget::Command(i) => i
                    .create_followup(&self.http, followup)
                    .await
                    .map(|_| ())
                    .map_err(map_err),
            }
        } else {
            let mut message = CreateInteractionResponseMessage::new()
                .content(content)
                .ephemeral(true);
            if !rows.is_empty() {
                message = message.components(rows);
            }
            let response = CreateInteractionResponse::Message(message);
            match &pending.target {
                AckTarget::Component(i) => {
                    i.create_response(&self.http, response).await.map_err(map_err)
                },
                AckTarget::Command(i) => {
                    i.create_response(&self.http, response).await.map_err(map_err)
                },
            }
        }
    }
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn bot_user(&self) -> UserId {
        UserId::new(self.bot_user.load(Ordering::SeqCst))
    }

    async fn create_channel(
        &self,
        guild: GuildId,
        request: CreateChannel,
    ) -> Result<ChannelRef, GatewayError> {
        let mut builder = CreateDiscordChannel::new(&request.name)
            .kind(DiscordChannelType::Text)
            .category(serenity::all::ChannelId::new(request.category.get()));
        if let Some(topic) = &request.topic {
            builder = builder.topic(topic);
        }
        let overwrites: Vec<serenity::all::PermissionOverwrite> = request
            .overwrites
            .iter()
            .map(|o| convert_overwrite(guild, o))
            .collect();
        builder = builder.permissions(overwrites);

        let created = serenity::all::GuildId::new(guild.get())
            .create_channel(&self.http, builder)
            .await
            .map_err(map_err)?;
        Ok(ChannelRef {
            id: ChannelId::new(created.id.get()),
            name: created.name.clone(),
            topic: created.topic.clone(),
        })
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), GatewayError> {
        serenity::all::ChannelId::new(channel.get())
            .delete(&self.http)
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn channel_info(&self, channel: ChannelId) -> Result<ChannelRef, GatewayError> {
        let fetched = serenity::all::ChannelId::new(channel.get())
            .to_channel(&self.http)
            .await
            .map_err(map_err)?;
        match fetched {
            Channel::Guild(guild_channel) => Ok(ChannelRef {
                id: channel,
                name: guild_channel.name.clone(),
                topic: guild_channel.topic.clone(),
            }),
            _ => Err(GatewayError::NotFound(format!("guild channel {channel}"))),
        }
    }

    async fn channels_in_category(
        &self,
        guild: GuildId,
        category: ChannelId,
    ) -> Result<Vec<ChannelRef>, GatewayError> {
        let channels = serenity::all::GuildId::new(guild.get())
            .channels(&self.http)
            .await
            .map_err(map_err)?;
        let mut refs: Vec<ChannelRef> = channels
            .values()
            .filter(|c| c.parent_id.map(serenity::all::ChannelId::get) == Some(category.get()))
            .map(|c| ChannelRef {
                id: ChannelId::new(c.id.get()),
                name: c.name.clone(),
                topic: c.topic.clone(),
            })
            .collect();
        refs.sort_by_key(|r| r.id);
        Ok(refs)
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutboundMessage,
    ) -> Result<MessageId, GatewayError> {
        let mut builder = CreateMessage::new().content(&message.content);
        if let Some(embed) = &message.embed {
            builder = builder.embed(build_embed(embed));
        }
        let rows = build_components(&message.components);
        if !rows.is_empty() {
            builder = builder.components(rows);
        }
        if let Some(file) = &message.file {
            builder = builder.add_file(CreateAttachment::bytes(
                file.contents.clone(),
                file.filename.clone(),
            ));
        }

        let sent = serenity::all::ChannelId::new(channel.get())
            .send_message(&self.http, builder)
            .await
            .map_err(map_err)?;
        Ok(MessageId::new(sent.id.get()))
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: OutboundMessage,
    ) -> Result<(), GatewayError> {
        let mut builder = EditMessage::new().content(&content.content);
        if let Some(embed) = &content.embed {
            builder = builder.embed(build_embed(embed));
        }
        let rows = build_components(&content.components);
        if !rows.is_empty() {
            builder = builder.components(rows);
        }

        serenity::all::ChannelId::new(channel.get())
            .edit_message(&self.http, serenity::all::MessageId::new(message.get()), builder)
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, GatewayError> {
        let limit = u8::try_from(limit.min(100)).unwrap_or(100);
        let messages = serenity::all::ChannelId::new(channel.get())
            .messages(&self.http, GetMessages::new().limit(limit))
            .await
            .map_err(map_err)?;
        Ok(messages.iter().map(convert_message).collect())
    }

    async fn full_history(&self, channel: ChannelId) -> Result<Vec<ChannelMessage>, GatewayError> {
        let channel = serenity::all::ChannelId::new(channel.get());
        let mut newest_first = Vec::new();
        let mut before: Option<serenity::all::MessageId> = None;

        loop {
            let mut filter = GetMessages::new().limit(100);
            if let Some(oldest) = before {
                filter = filter.before(oldest);
            }
            let batch = channel.messages(&self.http, filter).await.map_err(map_err)?;
            let Some(last) = batch.last() else {
                break;
            };
            before = Some(last.id);
            newest_first.extend(batch.iter().map(convert_message));
        }

        newest_first.reverse();
        Ok(newest_first)
    }

    async fn member_roles(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> Result<Vec<RoleId>, GatewayError> {
        let member = serenity::all::GuildId::new(guild.get())
            .member(&self.http, serenity::all::UserId::new(user.get()))
            .await
            .map_err(map_err)?;
        Ok(member.roles.iter().map(|r| RoleId::new(r.get())).collect())
    }

    async fn ephemeral_reply(
        &self,
        token: &InteractionToken,
        text: &str,
    ) -> Result<(), GatewayError> {
        self.ack(token, text, Vec::new()).await
    }

    async fn ephemeral_reply_with(
        &self,
        token: &InteractionToken,
        message: OutboundMessage,
    ) -> Result<(), GatewayError> {
        self.ack(token, &message.content, build_components(&message.components))
            .await
    }

    async fn followup(&self, token: &InteractionToken, text: &str) -> Result<(), GatewayError> {
        self.ack(token, text, Vec::new()).await
    }

    async fn await_reply(
        &self,
        channel: ChannelId,
        user: UserId,
    ) -> Result<ChannelMessage, GatewayError> {
        let (sender, receiver) = oneshot::channel();
        self.pending_replies.insert((channel, user), sender);

        match tokio::time::timeout(REPLY_TIMEOUT, receiver).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(_)) => Err(GatewayError::Protocol("reply channel dropped".to_string())),
            Err(_) => {
                self.pending_replies.remove(&(channel, user));
                Err(GatewayError::Timeout)
            },
        }
    }
}

/// Serenity event handler feeding the interaction router
pub struct DiscordHandler {
    gateway: Arc<DiscordGateway>,
    router: Arc<Router>,
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        self.gateway.set_bot_user(ready.user.id.get());

        // Register the setup command by name; components need no
        // registration at all, they are routed by stable custom id.
        let command = CreateCommand::new(components::SETUP_COMMAND)
            .description("Set up the ticket system")
            .default_member_permissions(Permissions::ADMINISTRATOR);
        if let Err(e) = DiscordCommand::create_global_command(&ctx.http, command).await {
            warn!(error = %e, "failed to register setup command");
        }

        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );
    }

    async fn message(&self, _ctx: Context, message: Message) {
        if message.author.bot {
            return;
        }
        self.gateway.fulfil_reply(&message);
    }

    async fn interaction_create(&self, _ctx: Context, interaction: DiscordInteraction) {
        match interaction {
            DiscordInteraction::Component(component) => {
                let Some(guild_id) = component.guild_id else {
                    return;
                };
                let token = InteractionToken::new(component.token.clone());
                let values = match &component.data.kind {
                    ComponentInteractionDataKind::StringSelect { values } => values.clone(),
                    _ => Vec::new(),
                };
                let event = Interaction {
                    guild: GuildId::new(guild_id.get()),
                    channel: ChannelId::new(component.channel_id.get()),
                    user: UserId::new(component.user.id.get()),
                    kind: InteractionKind::Component {
                        id: component.data.custom_id.clone(),
                        values,
                    },
                    token: token.clone(),
                };
                debug!(component = %component.data.custom_id, user = %event.user, "component interaction");

                self.gateway.register_ack(&token, AckTarget::Component(component));
                self.router.dispatch(event).await;
                self.gateway.finish_interaction(&token);
            },
            DiscordInteraction::Command(command) => {
                let Some(guild_id) = command.guild_id else {
                    return;
                };
                let token = InteractionToken::new(command.token.clone());
                let is_admin = command
                    .member
                    .as_ref()
                    .and_then(|m| m.permissions)
                    .is_some_and(|p| p.administrator());
                let event = Interaction {
                    guild: GuildId::new(guild_id.get()),
                    channel: ChannelId::new(command.channel_id.get()),
                    user: UserId::new(command.user.id.get()),
                    kind: InteractionKind::Command {
                        name: command.data.name.clone(),
                        is_admin,
                    },
                    token: token.clone(),
                };
                debug!(command = %command.data.name, user = %event.user, "command interaction");

                self.gateway.register_ack(&token, AckTarget::Command(command));
                self.router.dispatch(event).await;
                self.gateway.finish_interaction(&token);
            },
            _ => {},
        }
    }
}

/// Run the bot until the process is stopped
pub async fn serve_bot(settings: &Settings) -> anyhow::Result<()> {
    let token = settings
        .bot_token
        .clone()
        .context("bot token is not configured (set GUILDDESK_BOT_TOKEN)")?;

    let store = Arc::new(ConfigStore::new(&settings.config_path));
    let http = Arc::new(Http::new(&token));
    let gateway = Arc::new(DiscordGateway::new(http));
    let router = Arc::new(Router::new(gateway.clone(), store));
    let handler = DiscordHandler {
        gateway,
        router,
    };

    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .await
        .context("failed to build discord client")?;

    client.start().await.context("discord client stopped")?;
    Ok(())
}

fn map_err(e: serenity::Error) -> GatewayError {
    if let serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(ref response)) = e {
        return match response.status_code.as_u16() {
            404 => GatewayError::NotFound(response.error.message.clone()),
            403 => GatewayError::Forbidden(response.error.message.clone()),
            _ => GatewayError::Protocol(e.to_string()),
        };
    }
    GatewayError::Protocol(e.to_string())
}

fn convert_message(message: &Message) -> ChannelMessage {
    ChannelMessage {
        id: MessageId::new(message.id.get()),
        author: UserId::new(message.author.id.get()),
        author_name: message.author.name.clone(),
        author_is_bot: message.author.bot,
        content: message.content.clone(),
        embeds: message.embeds.iter().map(convert_embed).collect(),
        timestamp: DateTime::<Utc>::from_timestamp(message.timestamp.unix_timestamp(), 0)
            .unwrap_or_default(),
    }
}

fn convert_embed(embed: &serenity::all::Embed) -> Embed {
    Embed {
        title: embed.title.clone().unwrap_or_default(),
        description: embed.description.clone().unwrap_or_default(),
        colour: embed.colour.map_or(colours::BLURPLE, |c| c.0),
        footer: embed.footer.as_ref().map(|f| f.text.clone()),
    }
}

fn convert_overwrite(
    guild: GuildId,
    overwrite: &PermissionOverwrite,
) -> serenity::all::PermissionOverwrite {
    let kind = match overwrite.target {
        // The everyone role shares the guild's id
        OverwriteTarget::Everyone => {
            PermissionOverwriteType::Role(serenity::all::RoleId::new(guild.get()))
        },
        OverwriteTarget::Role(role) => {
            PermissionOverwriteType::Role(serenity::all::RoleId::new(role.get()))
        },
        OverwriteTarget::Member(user) => {
            PermissionOverwriteType::Member(serenity::all::UserId::new(user.get()))
        },
    };
    serenity::all::PermissionOverwrite {
        allow: convert_permissions(overwrite.allow),
        deny: convert_permissions(overwrite.deny),
        kind,
    }
}

fn convert_permissions(permissions: ChannelPermissions) -> Permissions {
    let mut out = Permissions::empty();
    if permissions.contains(ChannelPermissions::VIEW) {
        out |= Permissions::VIEW_CHANNEL;
    }
    if permissions.contains(ChannelPermissions::SEND) {
        out |= Permissions::SEND_MESSAGES;
    }
    out
}

fn build_embed(embed: &Embed) -> CreateEmbed {
    let mut builder = CreateEmbed::new()
        .title(&embed.title)
        .description(&embed.description)
        .colour(embed.colour);
    if let Some(footer) = &embed.footer {
        builder = builder.footer(CreateEmbedFooter::new(footer));
    }
    builder
}

fn build_button(button: &Button) -> CreateButton {
    let style = match button.style {
        ButtonStyle::Primary => DiscordButtonStyle::Primary,
        ButtonStyle::Success => DiscordButtonStyle::Success,
        ButtonStyle::Danger => DiscordButtonStyle::Danger,
    };
    CreateButton::new(&button.id).label(&button.label).style(style)
}

fn build_select(menu: &SelectMenu) -> CreateSelectMenu {
    let options = menu
        .options
        .iter()
        .map(|option| {
            let mut builder = CreateSelectMenuOption::new(&option.label, &option.value)
                .description(&option.description);
            if let Some(emoji) = &option.emoji {
                builder = builder.emoji(ReactionType::Unicode(emoji.clone()));
            }
            builder
        })
        .collect();
    CreateSelectMenu::new(&menu.id, CreateSelectMenuKind::String { options })
        .placeholder(&menu.placeholder)
}

/// Buttons share one action row; each select menu takes its own
fn build_components(components: &[Component]) -> Vec<CreateActionRow> {
    let mut rows = Vec::new();
    let mut buttons = Vec::new();
    for component in components {
        match component {
            Component::Button(button) => buttons.push(build_button(button)),
            Component::Select(menu) => rows.push(CreateActionRow::SelectMenu(build_select(menu))),
        }
    }
    if !buttons.is_empty() {
        rows.push(CreateActionRow::Buttons(buttons));
    }
    rows
}
