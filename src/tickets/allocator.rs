//! Ticket number allocation
//!
//! Numbers are allocated from the per-guild counter in the configuration
//! document. The increment is persisted before the number is returned, and
//! the whole read-increment-write span runs under the store's mutation lock,
//! so concurrent allocations in one guild can never observe the same value
//! or lose an increment.

use crate::core::GuildId;
use crate::error::Result;
use crate::storage::ConfigStore;
use std::sync::Arc;
use tracing::debug;

/// Allocates strictly increasing ticket numbers per guild
#[derive(Clone)]
pub struct TicketAllocator {
    store: Arc<ConfigStore>,
}

impl TicketAllocator {
    /// Create an allocator over the given store
    #[must_use]
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self { store }
    }

    /// Allocate the next ticket number for a guild
    ///
    /// Increments the guild's counter by exactly 1 and persists the result
    /// before returning it. Never returns the same number twice for a guild.
    ///
    /// # Errors
    ///
    /// `ConfigNotFound` when the guild has no configuration.
    pub async fn allocate(&self, guild: GuildId) -> Result<u64> {
        let number = self
            .store
            .update(guild, |config| {
                config.ticket_counter += 1;
                config.ticket_counter
            })
            .await?;
        debug!(%guild, number, "allocated ticket number");
        Ok(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChannelId, RoleId};
    use crate::error::GuildDeskError;
    use crate::storage::GuildConfig;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn sample_config() -> GuildConfig {
        GuildConfig {
            panel_channel_id: ChannelId::new(1),
            mod_role_id: RoleId::new(2),
            admin_role_id: RoleId::new(3),
            category_id: ChannelId::new(4),
            log_channel_id: ChannelId::new(5),
            ticket_counter: 0,
        }
    }

    async fn configured_store(dir: &TempDir, guild: GuildId) -> Arc<ConfigStore> {
        let store = Arc::new(ConfigStore::new(dir.path().join("ticket_config.json")));
        store.put(guild, sample_config()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_allocate_increments_by_one() {
        let dir = TempDir::new().unwrap();
        let guild = GuildId::new(1);
        let store = configured_store(&dir, guild).await;
        let allocator = TicketAllocator::new(store.clone());

        assert_eq!(allocator.allocate(guild).await.unwrap(), 1);
        assert_eq!(allocator.allocate(guild).await.unwrap(), 2);
        assert_eq!(allocator.allocate(guild).await.unwrap(), 3);

        // The increment is durable, not just in-memory
        assert_eq!(store.guild(guild).await.unwrap().ticket_counter, 3);
    }

    #[tokio::test]
    async fn test_allocate_unconfigured_guild() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ConfigStore::new(dir.path().join("ticket_config.json")));
        let allocator = TicketAllocator::new(store);

        let err = allocator.allocate(GuildId::new(9)).await.unwrap_err();
        assert!(matches!(err, GuildDeskError::ConfigNotFound { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_allocations_are_distinct_and_contiguous() {
        let dir = TempDir::new().unwrap();
        let guild = GuildId::new(1);
        let store = configured_store(&dir, guild).await;
        let allocator = TicketAllocator::new(store);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let allocator = allocator.clone();
            handles.push(tokio::spawn(
                async move { allocator.allocate(guild).await },
            ));
        }

        let mut numbers = BTreeSet::new();
        for handle in handles {
            numbers.insert(handle.await.unwrap().unwrap());
        }

        // 20 concurrent calls produce 20 distinct values forming a
        // contiguous run from the prior counter value.
        assert_eq!(numbers.len(), 20);
        let expected: BTreeSet<u64> = (1..=20).collect();
        assert_eq!(numbers, expected);
    }

    #[tokio::test]
    async fn test_counters_are_independent_per_guild() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ConfigStore::new(dir.path().join("ticket_config.json")));
        let a = GuildId::new(1);
        let b = GuildId::new(2);
        store.put(a, sample_config()).await.unwrap();
        store.put(b, sample_config()).await.unwrap();
        let allocator = TicketAllocator::new(store);

        assert_eq!(allocator.allocate(a).await.unwrap(), 1);
        assert_eq!(allocator.allocate(a).await.unwrap(), 2);
        assert_eq!(allocator.allocate(b).await.unwrap(), 1);
    }
}
