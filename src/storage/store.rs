//! JSON-backed configuration store
//!
//! The whole document is read before each use and written after each
//! mutation. Mutations run under one store-wide async lock, so a
//! read-modify-write can never lose a concurrent update; readers take no
//! lock and see the last completed write.

use crate::core::GuildId;
use crate::error::{GuildDeskError, Result};
use crate::storage::GuildConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// The full on-disk document: decimal guild-id strings to guild records
type ConfigDocument = BTreeMap<String, GuildConfig>;

/// Store for the per-guild configuration document
pub struct ConfigStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    /// Create a store backed by the document at `path`
    ///
    /// The file does not have to exist yet; a missing document reads as
    /// empty and is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing document
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration for one guild
    ///
    /// # Errors
    ///
    /// `ConfigNotFound` when the guild has no record, which means the ticket
    /// system is inactive for that guild.
    pub async fn guild(&self, guild: GuildId) -> Result<GuildConfig> {
        self.get(guild)
            .await?
            .ok_or(GuildDeskError::ConfigNotFound { guild })
    }

    /// Load the configuration for one guild, if present
    pub async fn get(&self, guild: GuildId) -> Result<Option<GuildConfig>> {
        let document = self.load_document().await?;
        Ok(document.get(&guild.to_string()).cloned())
    }

    /// Load every guild's configuration
    pub async fn all(&self) -> Result<BTreeMap<GuildId, GuildConfig>> {
        let document = self.load_document().await?;
        let mut out = BTreeMap::new();
        for (key, config) in document {
            let guild = key
                .parse::<GuildId>()
                .map_err(|_| GuildDeskError::custom(format!("invalid guild key in config: {key}")))?;
            out.insert(guild, config);
        }
        Ok(out)
    }

    /// Replace (or create) the configuration for one guild
    pub async fn put(&self, guild: GuildId, config: GuildConfig) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_document().await?;
        document.insert(guild.to_string(), config);
        self.save_document(&document).await
    }

    /// Mutate one guild's configuration in place and persist the result
    ///
    /// The read, the mutation, and the write all happen under the store
    /// lock, so concurrent updates cannot clobber each other.
    ///
    /// # Errors
    ///
    /// `ConfigNotFound` when the guild has no record; `f` is not called.
    pub async fn update<F, T>(&self, guild: GuildId, f: F) -> Result<T>
    where
        F: FnOnce(&mut GuildConfig) -> T,
    {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_document().await?;
        let config = document
            .get_mut(&guild.to_string())
            .ok_or(GuildDeskError::ConfigNotFound { guild })?;
        let value = f(config);
        self.save_document(&document).await?;
        Ok(value)
    }

    async fn load_document(&self) -> Result<ConfigDocument> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigDocument::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_document(&self, document: &ConfigDocument) -> Result<()> {
        let raw = serde_json::to_string_pretty(document)?;
        tokio::fs::write(&self.path, raw).await?;
        debug!(path = %self.path.display(), guilds = document.len(), "config document written");
        Ok(())
    }
}
