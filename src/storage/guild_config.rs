//! Per-guild configuration record
//!
//! One record per guild, created by the setup flow. Its presence is what
//! activates the ticket system for a guild; every lifecycle operation starts
//! by loading it.

use crate::core::{ChannelId, RoleId, TicketType};
use serde::{Deserialize, Serialize};

/// Durable configuration for one guild
///
/// Field names match the on-disk document, which stays round-trippable with
/// configurations written by earlier deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    /// Channel holding the ticket-opening panel
    pub panel_channel_id: ChannelId,
    /// Role notified for Support and Report tickets
    pub mod_role_id: RoleId,
    /// Role notified for Appeal tickets
    pub admin_role_id: RoleId,
    /// Category under which ticket channels are created
    pub category_id: ChannelId,
    /// Channel receiving transcripts on close
    pub log_channel_id: ChannelId,
    /// Monotonic ticket counter; never reused, even after deletion
    pub ticket_counter: u64,
}

impl GuildConfig {
    /// The role to notify for a ticket of the given type
    #[must_use]
    pub const fn notify_role(&self, ticket_type: TicketType) -> RoleId {
        if ticket_type.escalates() {
            self.admin_role_id
        } else {
            self.mod_role_id
        }
    }

    /// Whether a member holding `roles` counts as staff for this guild
    #[must_use]
    pub fn is_staff(&self, roles: &[RoleId]) -> bool {
        roles
            .iter()
            .any(|r| *r == self.mod_role_id || *r == self.admin_role_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RoleId;

    fn sample() -> GuildConfig {
        GuildConfig {
            panel_channel_id: ChannelId::new(1),
            mod_role_id: RoleId::new(2),
            admin_role_id: RoleId::new(3),
            category_id: ChannelId::new(4),
            log_channel_id: ChannelId::new(5),
            ticket_counter: 0,
        }
    }

    #[test]
    fn test_notify_role_escalation() {
        let config = sample();
        assert_eq!(config.notify_role(TicketType::Support), RoleId::new(2));
        assert_eq!(config.notify_role(TicketType::Report), RoleId::new(2));
        assert_eq!(config.notify_role(TicketType::Appeal), RoleId::new(3));
    }

    #[test]
    fn test_is_staff() {
        let config = sample();
        assert!(config.is_staff(&[RoleId::new(2)]));
        assert!(config.is_staff(&[RoleId::new(9), RoleId::new(3)]));
        assert!(!config.is_staff(&[RoleId::new(9)]));
        assert!(!config.is_staff(&[]));
    }
}
