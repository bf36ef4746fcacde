//! Ticket lifecycle state machine
//!
//! Owns the open → claimed → closed progression. A ticket's existence IS its
//! openness: opening creates the marked channel, claiming annotates the
//! intro message, closing archives the transcript and deletes the channel.
//! Closed is terminal.
//!
//! Two races are closed here deliberately: opens for the same (guild, user)
//! are serialized across the duplicate check and channel creation, and
//! number allocation is serialized in the store, so rapid double-submission
//! cannot yield two tickets or a reused number.

use crate::core::{
    CLAIM_MARKER, ChannelId, GuildId, RoleId, TicketStatus, TicketType, UserId, owner_marker,
};
use crate::error::{GuildDeskError, Result};
use crate::gateway::{
    ChannelPermissions, ChannelRef, ChatGateway, CreateChannel, Embed, GatewayError,
    OutboundMessage, OverwriteTarget, PermissionOverwrite,
};
use crate::interactions::components;
use crate::storage::{ConfigStore, GuildConfig};
use crate::tickets::{DuplicateGuard, TicketAllocator, Transcript, TranscriptArchiver};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How many recent messages are inspected to locate the intro message
const CLAIM_LOOKBACK: usize = 10;

/// Result of a successful open
#[derive(Debug, Clone)]
pub struct OpenedTicket {
    pub channel: ChannelRef,
    pub number: u64,
    pub ticket_type: TicketType,
    pub notify_role: RoleId,
}

/// Result of a successful close
#[derive(Debug, Clone)]
pub struct ClosedTicket {
    pub number: u64,
    pub ticket_type: TicketType,
    pub participants: Vec<String>,
    /// False when the log channel was missing and archiving was skipped
    pub archived: bool,
}

/// The ticket lifecycle manager
pub struct TicketLifecycle {
    gateway: Arc<dyn ChatGateway>,
    store: Arc<ConfigStore>,
    allocator: TicketAllocator,
    guard: DuplicateGuard,
    archiver: TranscriptArchiver,
    /// Per-(guild, user) exclusive locks spanning check-then-create in open()
    open_locks: DashMap<(GuildId, UserId), Arc<Mutex<()>>>,
}

impl TicketLifecycle {
    /// Create a lifecycle manager over a gateway and configuration store
    #[must_use]
    pub fn new(gateway: Arc<dyn ChatGateway>, store: Arc<ConfigStore>) -> Self {
        Self {
            allocator: TicketAllocator::new(store.clone()),
            guard: DuplicateGuard::new(gateway.clone()),
            archiver: TranscriptArchiver::new(gateway.clone()),
            gateway,
            store,
            open_locks: DashMap::new(),
        }
    }

    /// The duplicate guard used by this lifecycle
    #[must_use]
    pub const fn guard(&self) -> &DuplicateGuard {
        &self.guard
    }

    /// Open a ticket of the given type for a user
    ///
    /// Allocates the next number, creates the marked channel under the
    /// guild's ticket category visible only to the owner, the notify role,
    /// and the bot, and posts the intro message carrying the claim/close
    /// controls.
    ///
    /// # Errors
    ///
    /// `ConfigNotFound` when the guild is unconfigured; `AlreadyOpen` with
    /// the existing channel when the user already has a ticket (no number is
    /// allocated in that case).
    pub async fn open(
        &self,
        guild: GuildId,
        user: UserId,
        ticket_type: TicketType,
    ) -> Result<OpenedTicket> {
        // Hold the per-(guild, user) lock across the duplicate check and the
        // channel creation, so a rapid double-submission cannot create two
        // tickets for the same user.
        let lock = self
            .open_locks
            .entry((guild, user))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _open_guard = lock.lock().await;

        let config = self.store.guild(guild).await?;

        if let Some(existing) = self
            .guard
            .find_open_ticket(guild, config.category_id, user)
            .await?
        {
            debug!(%guild, %user, channel = %existing.id, "duplicate open rejected");
            return Err(GuildDeskError::AlreadyOpen {
                channel: existing.id,
            });
        }

        let number = self.allocator.allocate(guild).await?;
        let notify_role = config.notify_role(ticket_type);
        let bot = self.gateway.bot_user().await;

        let channel = self
            .gateway
            .create_channel(
                guild,
                CreateChannel {
                    name: ticket_type.channel_name(number),
                    category: config.category_id,
                    topic: Some(owner_marker(user)),
                    overwrites: vec![
                        PermissionOverwrite::hide(OverwriteTarget::Everyone),
                        PermissionOverwrite::allow(
                            OverwriteTarget::Member(user),
                            ChannelPermissions::VIEW | ChannelPermissions::SEND,
                        ),
                        PermissionOverwrite::allow(
                            OverwriteTarget::Role(notify_role),
                            ChannelPermissions::VIEW | ChannelPermissions::SEND,
                        ),
                        PermissionOverwrite::allow(
                            OverwriteTarget::Member(bot),
                            ChannelPermissions::VIEW,
                        ),
                    ],
                },
            )
            .await?;

        if let Err(e) = self
            .gateway
            .send_message(channel.id, intro_message(user, notify_role, ticket_type, number))
            .await
        {
            // The channel exists but carries no controls; nothing upstream
            // compensates for this, so it must at least be visible in logs.
            warn!(
                %guild,
                channel = %channel.id,
                error = %e,
                "ticket channel created but intro message failed; channel is left without controls"
            );
            return Err(e.into());
        }

        info!(%guild, %user, number, ticket_type = %ticket_type, channel = %channel.id, "ticket opened");
        Ok(OpenedTicket {
            channel,
            number,
            ticket_type,
            notify_role,
        })
    }

    /// Claim an open ticket for a staff member
    ///
    /// First writer wins: the claim annotation is appended to the intro
    /// embed exactly once and never overwritten.
    ///
    /// # Errors
    ///
    /// `Forbidden` when the actor holds neither staff role;
    /// `AlreadyClaimed` when the annotation is already present.
    pub async fn claim(&self, guild: GuildId, actor: UserId, channel: ChannelId) -> Result<()> {
        let config = self.store.guild(guild).await?;
        self.ensure_staff(guild, &config, actor).await?;

        let recent = self.gateway.recent_messages(channel, CLAIM_LOOKBACK).await?;
        for message in recent {
            let Some(embed) = message.embeds.first() else {
                continue;
            };
            if embed.description.contains(CLAIM_MARKER) {
                return Err(GuildDeskError::AlreadyClaimed);
            }

            let annotated = Embed {
                description: format!(
                    "{}\n\n🟢 **{CLAIM_MARKER}** {}",
                    embed.description,
                    actor.mention()
                ),
                ..embed.clone()
            };
            let mut edit = OutboundMessage::new()
                .content(message.content.clone())
                .embed(annotated);
            for component in components::ticket_controls() {
                edit = edit.component(component);
            }
            self.gateway.edit_message(channel, message.id, edit).await?;

            info!(%guild, %actor, %channel, "ticket claimed");
            return Ok(());
        }

        // No intro message within the lookback: the ticket was opened but
        // its controls message is gone. Surface as an operational failure.
        warn!(%guild, %channel, "claim found no intro message within lookback");
        Err(GuildDeskError::custom("ticket intro message not found"))
    }

    /// Close a ticket: archive its transcript and delete the channel
    ///
    /// The deletion is unconditional once authorization passes; there is no
    /// confirmation and no undo. Archiving is skipped when the log channel
    /// no longer exists.
    ///
    /// # Errors
    ///
    /// `Forbidden` when the actor holds neither staff role.
    pub async fn close(
        &self,
        guild: GuildId,
        actor: UserId,
        channel: ChannelId,
        ticket_type: TicketType,
        number: u64,
    ) -> Result<ClosedTicket> {
        let config = self.store.guild(guild).await?;
        self.ensure_staff(guild, &config, actor).await?;

        let history = self.gateway.full_history(channel).await?;
        let transcript = Transcript::render(&history);

        let archived = match self
            .archiver
            .archive(config.log_channel_id, ticket_type, number, &transcript, actor)
            .await
        {
            Ok(()) => true,
            Err(GatewayError::NotFound(_)) => {
                debug!(%guild, log_channel = %config.log_channel_id, "log channel missing, transcript skipped");
                false
            },
            Err(e) => return Err(e.into()),
        };

        self.gateway.delete_channel(channel).await?;
        info!(%guild, %actor, %channel, number, ticket_type = %ticket_type, archived, "ticket closed");

        Ok(ClosedTicket {
            number,
            ticket_type,
            participants: transcript.participants,
            archived,
        })
    }

    /// Derive a ticket channel's lifecycle status by inspection
    ///
    /// Closed coincides with deletion of the backing channel, so a missing
    /// channel reads as Closed rather than an error.
    pub async fn status(&self, channel: ChannelId) -> Result<TicketStatus> {
        match self.gateway.recent_messages(channel, CLAIM_LOOKBACK).await {
            Ok(recent) => {
                let claimed = recent.iter().any(|message| {
                    message
                        .embeds
                        .first()
                        .is_some_and(|embed| embed.description.contains(CLAIM_MARKER))
                });
                Ok(if claimed {
                    TicketStatus::Claimed
                } else {
                    TicketStatus::Open
                })
            },
            Err(GatewayError::NotFound(_)) => Ok(TicketStatus::Closed),
            Err(e) => Err(e.into()),
        }
    }

    /// Check that `actor` may claim or close tickets in `guild`
    ///
    /// # Errors
    ///
    /// `ConfigNotFound` when the guild is unconfigured; `Forbidden` when the
    /// actor holds neither staff role.
    pub async fn authorize_staff(&self, guild: GuildId, actor: UserId) -> Result<()> {
        let config = self.store.guild(guild).await?;
        self.ensure_staff(guild, &config, actor).await
    }

    async fn ensure_staff(
        &self,
        guild: GuildId,
        config: &GuildConfig,
        actor: UserId,
    ) -> Result<()> {
        let roles = self.gateway.member_roles(guild, actor).await?;
        if config.is_staff(&roles) {
            Ok(())
        } else {
            Err(GuildDeskError::Forbidden)
        }
    }
}

/// The intro message posted into a fresh ticket channel
fn intro_message(
    user: UserId,
    notify_role: RoleId,
    ticket_type: TicketType,
    number: u64,
) -> OutboundMessage {
    let embed = Embed::new(
        format!("🎟️ {ticket_type} Ticket #{number}"),
        "A staff member will assist you shortly.",
    )
    .footer(format!("Ticket #{number}"));

    let mut message = OutboundMessage::new()
        .content(format!("{} {}", user.mention(), notify_role.mention()))
        .embed(embed);
    for component in components::ticket_controls() {
        message = message.component(component);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChannelId, RoleId};
    use crate::gateway::memory::InMemoryGateway;
    use crate::storage::GuildConfig;
    use tempfile::TempDir;

    const GUILD: GuildId = GuildId::new(100);
    const CATEGORY: ChannelId = ChannelId::new(40);
    const MOD_ROLE: RoleId = RoleId::new(20);
    const ADMIN_ROLE: RoleId = RoleId::new(30);

    struct Fixture {
        _dir: TempDir,
        gateway: Arc<InMemoryGateway>,
        store: Arc<ConfigStore>,
        lifecycle: TicketLifecycle,
        log_channel: ChannelId,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(InMemoryGateway::new());
        let store = Arc::new(ConfigStore::new(dir.path().join("ticket_config.json")));

        let panel = gateway.add_channel(GUILD, None, "tickets", None);
        let log_channel = gateway.add_channel(GUILD, None, "ticket-logs", None);
        store
            .put(
                GUILD,
                GuildConfig {
                    panel_channel_id: panel,
                    mod_role_id: MOD_ROLE,
                    admin_role_id: ADMIN_ROLE,
                    category_id: CATEGORY,
                    log_channel_id: log_channel,
                    ticket_counter: 0,
                },
            )
            .await
            .unwrap();

        let lifecycle = TicketLifecycle::new(gateway.clone(), store.clone());
        Fixture {
            _dir: dir,
            gateway,
            store,
            lifecycle,
            log_channel,
        }
    }

    #[tokio::test]
    async fn test_open_without_config() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(InMemoryGateway::new());
        let store = Arc::new(ConfigStore::new(dir.path().join("ticket_config.json")));
        let lifecycle = TicketLifecycle::new(gateway, store);

        let err = lifecycle
            .open(GuildId::new(1), UserId::new(2), TicketType::Support)
            .await
            .unwrap_err();
        assert!(matches!(err, GuildDeskError::ConfigNotFound { .. }));
    }

    #[tokio::test]
    async fn test_open_appeal_notifies_admin_role() {
        let f = fixture().await;
        let user = UserId::new(7);

        let opened = f.lifecycle.open(GUILD, user, TicketType::Appeal).await.unwrap();
        assert_eq!(opened.number, 1);
        assert_eq!(opened.channel.name, "appeal-0001");
        assert_eq!(opened.notify_role, ADMIN_ROLE);
        assert_eq!(opened.channel.topic.as_deref(), Some("ticket_for:7"));
        assert_eq!(f.store.guild(GUILD).await.unwrap().ticket_counter, 1);

        // Intro message mentions the owner and the admin role and carries
        // the claim/close controls.
        let history = f.gateway.full_history(opened.channel.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, format!("<@7> {}", ADMIN_ROLE.mention()));
        assert_eq!(history[0].embeds[0].title, "🎟️ Appeal Ticket #1");
        assert_eq!(
            f.gateway.components_of(opened.channel.id, history[0].id).len(),
            2
        );
    }

    #[tokio::test]
    async fn test_open_duplicate_leaves_counter_unchanged() {
        let f = fixture().await;
        let user = UserId::new(7);

        let first = f.lifecycle.open(GUILD, user, TicketType::Support).await.unwrap();
        let err = f
            .lifecycle
            .open(GUILD, user, TicketType::Report)
            .await
            .unwrap_err();

        match err {
            GuildDeskError::AlreadyOpen { channel } => assert_eq!(channel, first.channel.id),
            other => panic!("expected AlreadyOpen, got {other:?}"),
        }
        assert_eq!(f.store.guild(GUILD).await.unwrap().ticket_counter, 1);
    }

    #[tokio::test]
    async fn test_concurrent_opens_create_one_ticket() {
        let f = fixture().await;
        let user = UserId::new(7);
        let lifecycle = Arc::new(f.lifecycle);

        let mut handles = Vec::new();
        for _ in 0..5 {
            let lifecycle = lifecycle.clone();
            handles.push(tokio::spawn(async move {
                lifecycle.open(GUILD, user, TicketType::Support).await
            }));
        }

        let mut opened = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => opened += 1,
                Err(GuildDeskError::AlreadyOpen { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(opened, 1);
        assert_eq!(rejected, 4);
        assert_eq!(f.store.guild(GUILD).await.unwrap().ticket_counter, 1);

        let tickets = f
            .gateway
            .channels_in_category(GUILD, CATEGORY)
            .await
            .unwrap();
        assert_eq!(tickets.len(), 1);
    }

    #[tokio::test]
    async fn test_claim_requires_staff_role() {
        let f = fixture().await;
        let opened = f
            .lifecycle
            .open(GUILD, UserId::new(7), TicketType::Support)
            .await
            .unwrap();

        let err = f
            .lifecycle
            .claim(GUILD, UserId::new(8), opened.channel.id)
            .await
            .unwrap_err();
        assert!(matches!(err, GuildDeskError::Forbidden));

        // The intro embed is untouched
        let history = f.gateway.full_history(opened.channel.id).await.unwrap();
        assert!(!history[0].embeds[0].description.contains(CLAIM_MARKER));
    }

    #[tokio::test]
    async fn test_claim_is_first_writer_wins() {
        let f = fixture().await;
        let opened = f
            .lifecycle
            .open(GUILD, UserId::new(7), TicketType::Support)
            .await
            .unwrap();

        let staff_a = UserId::new(81);
        let staff_b = UserId::new(82);
        f.gateway.grant_role(GUILD, staff_a, MOD_ROLE);
        f.gateway.grant_role(GUILD, staff_b, ADMIN_ROLE);

        f.lifecycle.claim(GUILD, staff_a, opened.channel.id).await.unwrap();
        let err = f
            .lifecycle
            .claim(GUILD, staff_b, opened.channel.id)
            .await
            .unwrap_err();
        assert!(matches!(err, GuildDeskError::AlreadyClaimed));

        // The annotation still names only the first claimer, and the intro
        // content (the mentions line) survived the edit.
        let history = f.gateway.full_history(opened.channel.id).await.unwrap();
        let description = &history[0].embeds[0].description;
        assert!(description.contains(&format!("**{CLAIM_MARKER}** {}", staff_a.mention())));
        assert!(!description.contains(&staff_b.mention()));
        assert!(history[0].content.starts_with("<@7>"));
    }

    #[tokio::test]
    async fn test_close_archives_and_deletes() {
        let f = fixture().await;
        let owner = UserId::new(7);
        let staff = UserId::new(81);
        f.gateway.grant_role(GUILD, staff, MOD_ROLE);

        let opened = f.lifecycle.open(GUILD, owner, TicketType::Support).await.unwrap();
        f.gateway
            .post_user_message(opened.channel.id, owner, "ayla", "my account is locked");
        f.gateway
            .post_user_message(opened.channel.id, staff, "mod", "looking into it");

        let closed = f
            .lifecycle
            .close(GUILD, staff, opened.channel.id, TicketType::Support, opened.number)
            .await
            .unwrap();

        assert!(closed.archived);
        assert_eq!(closed.participants, vec![owner.mention(), staff.mention()]);
        assert!(!f.gateway.channel_exists(opened.channel.id));

        let attachments = f.gateway.attachments(f.log_channel);
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename, "support-ticket-0001.txt");

        // Guard no longer sees an open ticket for the owner
        assert!(
            !f.lifecycle
                .guard()
                .has_open_ticket(GUILD, CATEGORY, owner)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_status_follows_transitions() {
        let f = fixture().await;
        let staff = UserId::new(81);
        f.gateway.grant_role(GUILD, staff, MOD_ROLE);

        let opened = f
            .lifecycle
            .open(GUILD, UserId::new(7), TicketType::Support)
            .await
            .unwrap();
        assert_eq!(
            f.lifecycle.status(opened.channel.id).await.unwrap(),
            TicketStatus::Open
        );

        f.lifecycle.claim(GUILD, staff, opened.channel.id).await.unwrap();
        assert_eq!(
            f.lifecycle.status(opened.channel.id).await.unwrap(),
            TicketStatus::Claimed
        );

        f.lifecycle
            .close(GUILD, staff, opened.channel.id, TicketType::Support, opened.number)
            .await
            .unwrap();
        assert_eq!(
            f.lifecycle.status(opened.channel.id).await.unwrap(),
            TicketStatus::Closed
        );
    }

    #[tokio::test]
    async fn test_close_with_missing_log_channel_still_deletes() {
        let f = fixture().await;
        let staff = UserId::new(81);
        f.gateway.grant_role(GUILD, staff, MOD_ROLE);

        let opened = f
            .lifecycle
            .open(GUILD, UserId::new(7), TicketType::Report)
            .await
            .unwrap();
        f.gateway.delete_channel(f.log_channel).await.unwrap();

        let closed = f
            .lifecycle
            .close(GUILD, staff, opened.channel.id, TicketType::Report, opened.number)
            .await
            .unwrap();

        assert!(!closed.archived);
        assert!(!f.gateway.channel_exists(opened.channel.id));
    }
}
