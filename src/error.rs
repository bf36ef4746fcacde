//! Error types for guilddesk
//!
//! One taxonomy covers every lifecycle operation. The first four variants are
//! user-visible outcomes of lifecycle checks; the rest wrap infrastructure
//! failures. No operation is retried automatically.

use crate::core::{ChannelId, GuildId};
use crate::gateway::GatewayError;
use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, GuildDeskError>;

/// Errors that can occur during ticket operations
#[derive(Error, Debug)]
pub enum GuildDeskError {
    /// The ticket system was never configured for this guild
    #[error("ticket system is not configured for guild {guild}")]
    ConfigNotFound { guild: GuildId },

    /// The actor lacks the moderator or admin role required for this action
    #[error("only staff can perform this action")]
    Forbidden,

    /// The user already has an open ticket in this guild
    #[error("user already has an open ticket in channel {channel}")]
    AlreadyOpen { channel: ChannelId },

    /// A claim annotation is already present on the ticket
    #[error("this ticket is already claimed")]
    AlreadyClaimed,

    /// The ticket type string did not match any known variant
    #[error("unknown ticket type: {value}")]
    InvalidTicketType { value: String },

    /// The setup reply did not contain five numeric identifiers
    #[error("invalid setup reply: {reason}")]
    InvalidSetupReply { reason: String },

    /// A chat-platform call failed
    #[error("platform error: {0}")]
    Gateway(#[from] GatewayError),

    /// IO error while reading or writing the configuration document
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration document could not be parsed or serialized
    #[error("configuration serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for errors that don't fit other categories
    #[error("{0}")]
    Custom(String),
}

impl GuildDeskError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// The message shown to the invoking user
    ///
    /// Lifecycle failures are reported back as an ephemeral acknowledgement;
    /// these strings match what the controls promise in their labels.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ConfigNotFound { .. } => "Ticket system not configured.".to_string(),
            Self::Forbidden => "Only staff can do that.".to_string(),
            Self::AlreadyOpen { channel } => {
                format!("You already have a ticket open: <#{channel}>")
            },
            Self::AlreadyClaimed => "This ticket is already claimed.".to_string(),
            Self::InvalidTicketType { value } => format!("Unknown ticket type: {value}"),
            Self::InvalidSetupReply { reason } => {
                format!("Setup failed: {reason}")
            },
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// Whether this error indicates a missing or broken configuration
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. } | Self::Json(_) | Self::InvalidSetupReply { .. }
        )
    }

    /// Whether the user can meaningfully retry the action that failed
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ConfigNotFound { .. } | Self::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let err = GuildDeskError::ConfigNotFound { guild: GuildId::new(1) };
        assert_eq!(err.user_message(), "Ticket system not configured.");
        assert!(err.is_config_error());
        assert!(!err.is_recoverable());

        let err = GuildDeskError::AlreadyOpen { channel: ChannelId::new(42) };
        assert_eq!(err.user_message(), "You already have a ticket open: <#42>");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_custom_error() {
        let err = GuildDeskError::custom("boom");
        assert_eq!(err.to_string(), "boom");
    }
}
