//! Duplicate-ticket detection
//!
//! Openness is derived by inspection: a user has an open ticket exactly when
//! a channel under the guild's ticket category carries their owner marker in
//! its topic. There is no separate index, so a channel deleted by any means
//! stops counting as open the moment it is gone.

use crate::core::{ChannelId, GuildId, UserId, owner_from_marker};
use crate::error::Result;
use crate::gateway::{ChannelRef, ChatGateway};
use std::sync::Arc;

/// Scans a guild's ticket category for a user's open ticket
#[derive(Clone)]
pub struct DuplicateGuard {
    gateway: Arc<dyn ChatGateway>,
}

impl DuplicateGuard {
    /// Create a guard over the given gateway
    #[must_use]
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self { gateway }
    }

    /// Find the user's open ticket channel, if one exists
    ///
    /// Point-in-time check: first channel whose topic marker names the user
    /// wins. Callers that need check-then-create atomicity must hold the
    /// per-(guild, user) open lock around this call.
    pub async fn find_open_ticket(
        &self,
        guild: GuildId,
        category: ChannelId,
        user: UserId,
    ) -> Result<Option<ChannelRef>> {
        let channels = self.gateway.channels_in_category(guild, category).await?;
        Ok(channels.into_iter().find(|channel| {
            channel
                .topic
                .as_deref()
                .and_then(owner_from_marker)
                .is_some_and(|owner| owner == user)
        }))
    }

    /// Whether the user currently has an open ticket under the category
    pub async fn has_open_ticket(
        &self,
        guild: GuildId,
        category: ChannelId,
        user: UserId,
    ) -> Result<bool> {
        Ok(self.find_open_ticket(guild, category, user).await?.is_some())
    }
}
