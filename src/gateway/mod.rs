//! Chat-platform boundary
//!
//! The ticket lifecycle never talks to a chat platform directly; it goes
//! through [`ChatGateway`], which covers exactly the operations the
//! lifecycle needs. [`memory::InMemoryGateway`] backs tests and local
//! development; the `discord` feature adds a serenity-backed implementation.

pub mod memory;

#[cfg(feature = "discord")]
pub mod discord;

use crate::core::{ChannelId, GuildId, MessageId, RoleId, UserId};
use async_trait::async_trait;
use bitflags::bitflags;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors surfaced by the chat platform
///
/// Platform failures are not classified beyond this; the lifecycle reports
/// them to the invoking user as a generic operational failure.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    Forbidden(String),

    #[error("timed out waiting for a reply")]
    Timeout,

    #[error("platform protocol error: {0}")]
    Protocol(String),
}

bitflags! {
    /// Channel permission bits the ticket system manages
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChannelPermissions: u8 {
        const VIEW = 1;
        const SEND = 1 << 1;
    }
}

/// Who a permission overwrite applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteTarget {
    Everyone,
    Role(RoleId),
    Member(UserId),
}

/// A single allow/deny entry on a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionOverwrite {
    pub target: OverwriteTarget,
    pub allow: ChannelPermissions,
    pub deny: ChannelPermissions,
}

impl PermissionOverwrite {
    /// Hide the channel from a target
    #[must_use]
    pub const fn hide(target: OverwriteTarget) -> Self {
        Self {
            target,
            allow: ChannelPermissions::empty(),
            deny: ChannelPermissions::VIEW,
        }
    }

    /// Grant a target the given bits
    #[must_use]
    pub const fn allow(target: OverwriteTarget, allow: ChannelPermissions) -> Self {
        Self {
            target,
            allow,
            deny: ChannelPermissions::empty(),
        }
    }
}

/// Request to create a text channel under a category
#[derive(Debug, Clone)]
pub struct CreateChannel {
    pub name: String,
    pub category: ChannelId,
    pub topic: Option<String>,
    pub overwrites: Vec<PermissionOverwrite>,
}

/// A channel as seen when scanning a category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: ChannelId,
    pub name: String,
    pub topic: Option<String>,
}

/// A rich-content block attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub colour: u32,
    pub footer: Option<String>,
}

impl Embed {
    /// Create an embed with a title and description
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            colour: colours::BLURPLE,
            footer: None,
        }
    }

    /// Set the accent colour
    #[must_use]
    pub const fn colour(mut self, colour: u32) -> Self {
        self.colour = colour;
        self
    }

    /// Set the footer line
    #[must_use]
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

/// Accent colours used by the ticket embeds
pub mod colours {
    pub const BLURPLE: u32 = 0x5865F2;
    pub const GREEN: u32 = 0x57F287;
}

/// Visual style of a button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Success,
    Danger,
}

/// A button bound to a stable component id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub id: String,
    pub label: String,
    pub style: ButtonStyle,
}

/// One option of a single-select menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    pub description: String,
    pub emoji: Option<String>,
}

/// A single-select menu bound to a stable component id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectMenu {
    pub id: String,
    pub placeholder: String,
    pub options: Vec<SelectOption>,
}

/// An interactive control carried by a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Button(Button),
    Select(SelectMenu),
}

/// A file attached to an outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub contents: Vec<u8>,
}

/// A message to send or an edit to apply
#[derive(Debug, Clone, Default)]
pub struct OutboundMessage {
    pub content: String,
    pub embed: Option<Embed>,
    pub components: Vec<Component>,
    pub file: Option<FileUpload>,
}

impl OutboundMessage {
    /// Create an empty message
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the plain-text content
    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Attach an embed
    #[must_use]
    pub fn embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }

    /// Add an interactive component
    #[must_use]
    pub fn component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    /// Attach a file
    #[must_use]
    pub fn file(mut self, file: FileUpload) -> Self {
        self.file = Some(file);
        self
    }
}

/// A message as read back from a channel's history
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub id: MessageId,
    pub author: UserId,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
    pub embeds: Vec<Embed>,
    pub timestamp: DateTime<Utc>,
}

/// Opaque handle for acknowledging one interaction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InteractionToken(pub String);

impl InteractionToken {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

/// The chat-platform operations the ticket lifecycle depends on
///
/// Implementations must be safe to share across tasks; every method may
/// suspend, and handlers interleave freely at those suspension points.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// The automation identity the gateway acts as
    async fn bot_user(&self) -> UserId;

    /// Create a text channel under a category
    async fn create_channel(
        &self,
        guild: GuildId,
        request: CreateChannel,
    ) -> Result<ChannelRef, GatewayError>;

    /// Delete a channel; irreversible
    async fn delete_channel(&self, channel: ChannelId) -> Result<(), GatewayError>;

    /// Look up a channel's name and topic
    async fn channel_info(&self, channel: ChannelId) -> Result<ChannelRef, GatewayError>;

    /// List the channels currently under a category
    async fn channels_in_category(
        &self,
        guild: GuildId,
        category: ChannelId,
    ) -> Result<Vec<ChannelRef>, GatewayError>;

    /// Send a message to a channel
    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutboundMessage,
    ) -> Result<MessageId, GatewayError>;

    /// Rewrite an existing message in place
    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: OutboundMessage,
    ) -> Result<(), GatewayError>;

    /// The most recent messages in a channel, newest first
    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, GatewayError>;

    /// The full message history of a channel, oldest first
    async fn full_history(&self, channel: ChannelId) -> Result<Vec<ChannelMessage>, GatewayError>;

    /// Roles held by a guild member
    async fn member_roles(&self, guild: GuildId, user: UserId)
    -> Result<Vec<RoleId>, GatewayError>;

    /// Acknowledge an interaction with a reply only its author can see
    async fn ephemeral_reply(
        &self,
        token: &InteractionToken,
        text: &str,
    ) -> Result<(), GatewayError>;

    /// Acknowledge an interaction with a reply carrying components
    async fn ephemeral_reply_with(
        &self,
        token: &InteractionToken,
        message: OutboundMessage,
    ) -> Result<(), GatewayError>;

    /// Send a follow-up to an already-acknowledged interaction
    async fn followup(&self, token: &InteractionToken, text: &str) -> Result<(), GatewayError>;

    /// Wait for the next message from `user` in `channel`
    async fn await_reply(
        &self,
        channel: ChannelId,
        user: UserId,
    ) -> Result<ChannelMessage, GatewayError>;
}
