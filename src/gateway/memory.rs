//! In-process chat gateway
//!
//! A complete [`ChatGateway`] over in-memory state. Integration tests and
//! local development run the whole ticket lifecycle against it; it records
//! ephemeral acknowledgements and file uploads so tests can assert on
//! everything the lifecycle produces.

use crate::core::{ChannelId, GuildId, MessageId, RoleId, UserId};
use crate::gateway::{
    ChannelMessage, ChannelRef, ChatGateway, Component, CreateChannel, FileUpload, GatewayError,
    InteractionToken, OutboundMessage, PermissionOverwrite,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredChannel {
    guild: GuildId,
    category: Option<ChannelId>,
    name: String,
    topic: Option<String>,
    #[allow(dead_code)]
    overwrites: Vec<PermissionOverwrite>,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    message: ChannelMessage,
    file: Option<FileUpload>,
    components: Vec<Component>,
}

/// In-memory gateway state
pub struct InMemoryGateway {
    bot_user: UserId,
    bot_name: String,
    next_channel_id: AtomicU64,
    next_message_id: AtomicU64,
    channels: DashMap<ChannelId, StoredChannel>,
    messages: DashMap<ChannelId, Vec<StoredMessage>>,
    roles: DashMap<(GuildId, UserId), Vec<RoleId>>,
    pending_replies: DashMap<(ChannelId, UserId), VecDeque<String>>,
    ephemeral: Mutex<Vec<(InteractionToken, OutboundMessage)>>,
}

impl InMemoryGateway {
    /// Create a gateway acting as bot user 1
    #[must_use]
    pub fn new() -> Self {
        Self::with_bot(UserId::new(1), "guilddesk")
    }

    /// Create a gateway acting as a specific bot identity
    #[must_use]
    pub fn with_bot(bot_user: UserId, bot_name: impl Into<String>) -> Self {
        Self {
            bot_user,
            bot_name: bot_name.into(),
            next_channel_id: AtomicU64::new(1000),
            next_message_id: AtomicU64::new(1),
            channels: DashMap::new(),
            messages: DashMap::new(),
            roles: DashMap::new(),
            pending_replies: DashMap::new(),
            ephemeral: Mutex::new(Vec::new()),
        }
    }

    /// Register an existing channel (panel, log, or a pre-seeded ticket)
    pub fn add_channel(
        &self,
        guild: GuildId,
        category: Option<ChannelId>,
        name: impl Into<String>,
        topic: Option<String>,
    ) -> ChannelId {
        let id = ChannelId::new(self.next_channel_id.fetch_add(1, Ordering::SeqCst));
        self.channels.insert(
            id,
            StoredChannel {
                guild,
                category,
                name: name.into(),
                topic,
                overwrites: Vec::new(),
            },
        );
        self.messages.insert(id, Vec::new());
        id
    }

    /// Grant a role to a guild member
    pub fn grant_role(&self, guild: GuildId, user: UserId, role: RoleId) {
        self.roles.entry((guild, user)).or_default().push(role);
    }

    /// Record a message from a human participant in a channel
    pub fn post_user_message(
        &self,
        channel: ChannelId,
        user: UserId,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> MessageId {
        let id = MessageId::new(self.next_message_id.fetch_add(1, Ordering::SeqCst));
        let message = ChannelMessage {
            id,
            author: user,
            author_name: name.into(),
            author_is_bot: false,
            content: content.into(),
            embeds: Vec::new(),
            timestamp: Utc::now(),
        };
        self.messages.entry(channel).or_default().push(StoredMessage {
            message,
            file: None,
            components: Vec::new(),
        });
        id
    }

    /// Queue the text `await_reply` will resolve to for `(channel, user)`
    pub fn queue_reply(&self, channel: ChannelId, user: UserId, content: impl Into<String>) {
        self.pending_replies
            .entry((channel, user))
            .or_default()
            .push_back(content.into());
    }

    /// Whether a channel currently exists
    #[must_use]
    pub fn channel_exists(&self, channel: ChannelId) -> bool {
        self.channels.contains_key(&channel)
    }

    /// Every ephemeral acknowledgement sent so far, oldest first
    pub async fn ephemeral_replies(&self) -> Vec<String> {
        self.ephemeral
            .lock()
            .await
            .iter()
            .map(|(_, m)| m.content.clone())
            .collect()
    }

    /// The most recent ephemeral acknowledgement, if any
    pub async fn last_ephemeral(&self) -> Option<OutboundMessage> {
        self.ephemeral.lock().await.last().map(|(_, m)| m.clone())
    }

    /// File attachments delivered to a channel, oldest first
    #[must_use]
    pub fn attachments(&self, channel: ChannelId) -> Vec<FileUpload> {
        self.messages
            .get(&channel)
            .map(|msgs| msgs.iter().filter_map(|m| m.file.clone()).collect())
            .unwrap_or_default()
    }

    /// Components carried by a stored message
    #[must_use]
    pub fn components_of(&self, channel: ChannelId, message: MessageId) -> Vec<Component> {
        self.messages
            .get(&channel)
            .and_then(|msgs| {
                msgs.iter()
                    .find(|m| m.message.id == message)
                    .map(|m| m.components.clone())
            })
            .unwrap_or_default()
    }

    fn store_outbound(&self, channel: ChannelId, outbound: OutboundMessage) -> MessageId {
        let id = MessageId::new(self.next_message_id.fetch_add(1, Ordering::SeqCst));
        let message = ChannelMessage {
            id,
            author: self.bot_user,
            author_name: self.bot_name.clone(),
            author_is_bot: true,
            content: outbound.content,
            embeds: outbound.embed.into_iter().collect(),
            timestamp: Utc::now(),
        };
        self.messages.entry(channel).or_default().push(StoredMessage {
            message,
            file: outbound.file,
            components: outbound.components,
        });
        id
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatGateway for InMemoryGateway {
    async fn bot_user(&self) -> UserId {
        self.bot_user
    }

    async fn create_channel(
        &self,
        guild: GuildId,
        request: CreateChannel,
    ) -> Result<ChannelRef, GatewayError> {
        let id = ChannelId::new(self.next_channel_id.fetch_add(1, Ordering::SeqCst));
        self.channels.insert(
            id,
            StoredChannel {
                guild,
                category: Some(request.category),
                name: request.name.clone(),
                topic: request.topic.clone(),
                overwrites: request.overwrites,
            },
        );
        self.messages.insert(id, Vec::new());
        Ok(ChannelRef {
            id,
            name: request.name,
            topic: request.topic,
        })
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), GatewayError> {
        self.channels
            .remove(&channel)
            .ok_or_else(|| GatewayError::NotFound(format!("channel {channel}")))?;
        self.messages.remove(&channel);
        Ok(())
    }

    async fn channel_info(&self, channel: ChannelId) -> Result<ChannelRef, GatewayError> {
        let stored = self
            .channels
            .get(&channel)
            .ok_or_else(|| GatewayError::NotFound(format!("channel {channel}")))?;
        Ok(ChannelRef {
            id: channel,
            name: stored.name.clone(),
            topic: stored.topic.clone(),
        })
    }

    async fn channels_in_category(
        &self,
        guild: GuildId,
        category: ChannelId,
    ) -> Result<Vec<ChannelRef>, GatewayError> {
        let mut refs: Vec<ChannelRef> = self
            .channels
            .iter()
            .filter(|entry| entry.guild == guild && entry.category == Some(category))
            .map(|entry| ChannelRef {
                id: *entry.key(),
                name: entry.name.clone(),
                topic: entry.topic.clone(),
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
        if !self.channels.contains_key(&channel) {
            return Err(GatewayError::NotFound(format!("channel {channel}")));
        }
        Ok(self.store_outbound(channel, message))
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: OutboundMessage,
    ) -> Result<(), GatewayError> {
        let mut messages = self
            .messages
            .get_mut(&channel)
            .ok_or_else(|| GatewayError::NotFound(format!("channel {channel}")))?;
        let stored = messages
            .iter_mut()
            .find(|m| m.message.id == message)
            .ok_or_else(|| GatewayError::NotFound(format!("message {message}")))?;
        stored.message.content = content.content;
        stored.message.embeds = content.embed.into_iter().collect();
        if !content.components.is_empty() {
            stored.components = content.components;
        }
        Ok(())
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, GatewayError> {
        let messages = self
            .messages
            .get(&channel)
            .ok_or_else(|| GatewayError::NotFound(format!("channel {channel}")))?;
        Ok(messages
            .iter()
            .rev()
            .take(limit)
            .map(|m| m.message.clone())
            .collect())
    }

    async fn full_history(&self, channel: ChannelId) -> Result<Vec<ChannelMessage>, GatewayError> {
        let messages = self
            .messages
            .get(&channel)
            .ok_or_else(|| GatewayError::NotFound(format!("channel {channel}")))?;
        Ok(messages.iter().map(|m| m.message.clone()).collect())
    }

    async fn member_roles(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> Result<Vec<RoleId>, GatewayError> {
        Ok(self
            .roles
            .get(&(guild, user))
            .map(|r| r.clone())
            .unwrap_or_default())
    }

    async fn ephemeral_reply(
        &self,
        token: &InteractionToken,
        text: &str,
    ) -> Result<(), GatewayError> {
        self.ephemeral
            .lock()
            .await
            .push((token.clone(), OutboundMessage::new().content(text)));
        Ok(())
    }

    async fn ephemeral_reply_with(
        &self,
        token: &InteractionToken,
        message: OutboundMessage,
    ) -> Result<(), GatewayError> {
        self.ephemeral.lock().await.push((token.clone(), message));
        Ok(())
    }

    async fn followup(&self, token: &InteractionToken, text: &str) -> Result<(), GatewayError> {
        self.ephemeral
            .lock()
            .await
            .push((token.clone(), OutboundMessage::new().content(text)));
        Ok(())
    }

    async fn await_reply(
        &self,
        channel: ChannelId,
        user: UserId,
    ) -> Result<ChannelMessage, GatewayError> {
        let content = self
            .pending_replies
            .get_mut(&(channel, user))
            .and_then(|mut queue| queue.pop_front())
            .ok_or(GatewayError::Timeout)?;

        let id = MessageId::new(self.next_message_id.fetch_add(1, Ordering::SeqCst));
        let message = ChannelMessage {
            id,
            author: user,
            author_name: format!("user-{user}"),
            author_is_bot: false,
            content,
            embeds: Vec::new(),
            timestamp: Utc::now(),
        };
        if let Some(mut messages) = self.messages.get_mut(&channel) {
            messages.push(StoredMessage {
                message: message.clone(),
                file: None,
                components: Vec::new(),
            });
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Embed;

    #[tokio::test]
    async fn test_create_scan_delete() {
        let gateway = InMemoryGateway::new();
        let guild = GuildId::new(1);
        let category = ChannelId::new(99);

        let created = gateway
            .create_channel(
                guild,
                CreateChannel {
                    name: "support-0001".to_string(),
                    category,
                    topic: Some("ticket_for:5".to_string()),
                    overwrites: Vec::new(),
                },
            )
            .await
            .unwrap();

        let scanned = gateway.channels_in_category(guild, category).await.unwrap();
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].id, created.id);
        assert_eq!(scanned[0].topic.as_deref(), Some("ticket_for:5"));

        gateway.delete_channel(created.id).await.unwrap();
        assert!(
            gateway
                .channels_in_category(guild, category)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(matches!(
            gateway.delete_channel(created.id).await,
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_history_ordering() {
        let gateway = InMemoryGateway::new();
        let guild = GuildId::new(1);
        let channel = gateway.add_channel(guild, None, "general", None);

        gateway
            .send_message(channel, OutboundMessage::new().content("first"))
            .await
            .unwrap();
        gateway.post_user_message(channel, UserId::new(5), "ayla", "second");
        gateway
            .send_message(channel, OutboundMessage::new().content("third"))
            .await
            .unwrap();

        let oldest_first = gateway.full_history(channel).await.unwrap();
        let contents: Vec<_> = oldest_first.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);

        let newest_first = gateway.recent_messages(channel, 2).await.unwrap();
        let contents: Vec<_> = newest_first.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["third", "second"]);
    }

    #[tokio::test]
    async fn test_edit_rewrites_embed() {
        let gateway = InMemoryGateway::new();
        let channel = gateway.add_channel(GuildId::new(1), None, "t", None);
        let id = gateway
            .send_message(
                channel,
                OutboundMessage::new().embed(Embed::new("Ticket", "hello")),
            )
            .await
            .unwrap();

        gateway
            .edit_message(
                channel,
                id,
                OutboundMessage::new().embed(Embed::new("Ticket", "hello\nclaimed")),
            )
            .await
            .unwrap();

        let history = gateway.full_history(channel).await.unwrap();
        assert_eq!(history[0].embeds[0].description, "hello\nclaimed");
    }

    #[tokio::test]
    async fn test_await_reply_queue() {
        let gateway = InMemoryGateway::new();
        let channel = gateway.add_channel(GuildId::new(1), None, "admin", None);
        let user = UserId::new(9);

        assert!(matches!(
            gateway.await_reply(channel, user).await,
            Err(GatewayError::Timeout)
        ));

        gateway.queue_reply(channel, user, "1 2 3 4 5");
        let reply = gateway.await_reply(channel, user).await.unwrap();
        assert_eq!(reply.content, "1 2 3 4 5");
        assert_eq!(reply.author, user);

        // The reply also lands in the channel history
        let history = gateway.full_history(channel).await.unwrap();
        assert_eq!(history.len(), 1);
    }
}
