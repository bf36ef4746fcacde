//! guilddesk - support-ticket workflow for chat guilds
//!
//! Users open typed tickets through a persistent panel, staff claim and
//! close them, and closed tickets are archived as transcripts. The crate is
//! built around a small core:
//! - A per-guild configuration document ([`storage`])
//! - A chat-platform boundary trait with in-memory and Discord backends
//!   ([`gateway`])
//! - The ticket lifecycle: allocate, guard against duplicates, open, claim,
//!   close, archive ([`tickets`])
//! - Interaction routing over stable component ids ([`interactions`])
//!
//! # Concurrency
//!
//! Handlers interleave at every I/O suspension point. The two spots where
//! that matters are locked explicitly: ticket-number allocation runs under
//! the store's mutation lock, and open() holds a per-(guild, user) lock
//! across its duplicate check and channel creation.
//!
//! # Example
//!
//! ```rust,ignore
//! use guilddesk::gateway::memory::InMemoryGateway;
//! use guilddesk::interactions::Router;
//! use guilddesk::storage::ConfigStore;
//! use std::sync::Arc;
//!
//! let gateway = Arc::new(InMemoryGateway::new());
//! let store = Arc::new(ConfigStore::new("ticket_config.json"));
//! let router = Router::new(gateway, store);
//! // feed router.dispatch(..) from your platform's event source
//! ```

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod gateway;
pub mod interactions;
pub mod storage;
pub mod tickets;

// Re-export commonly used types
pub use error::{GuildDeskError, Result};
