//! Ticket domain types
//!
//! A ticket's durable representation is its channel plus the topic marker;
//! there is no separate ticket record. The types here carry everything the
//! lifecycle derives from that channel: the typed variant, the number, and
//! the marker linking a channel to its owner.

use crate::core::ids::UserId;
use crate::error::{GuildDeskError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix of the channel-topic marker tying a ticket channel to its owner
const MARKER_PREFIX: &str = "ticket_for:";

/// Annotation marker recorded in the intro embed once a ticket is claimed
pub const CLAIM_MARKER: &str = "Claimed by:";

/// The three ticket categories a requester can choose from
///
/// The variant determines only which staff role is notified: appeals escalate
/// to the admin role, everything else goes to the moderator role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketType {
    Support,
    Report,
    Appeal,
}

impl TicketType {
    /// All variants, in the order they appear in the type menu
    pub const ALL: [Self; 3] = [Self::Support, Self::Report, Self::Appeal];

    /// Human-facing label, as shown in menus and embed titles
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Support => "Support",
            Self::Report => "Report",
            Self::Appeal => "Appeal",
        }
    }

    /// Lowercase form used in channel and transcript file names
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Report => "report",
            Self::Appeal => "appeal",
        }
    }

    /// Short description shown next to the menu option
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Support => "General support",
            Self::Report => "Report a user or issue",
            Self::Appeal => "Appeal a decision",
        }
    }

    /// Whether tickets of this type notify the admin role instead of the
    /// moderator role
    #[must_use]
    pub const fn escalates(self) -> bool {
        matches!(self, Self::Appeal)
    }

    /// Channel name for a ticket of this type, e.g. `appeal-0001`
    #[must_use]
    pub fn channel_name(self, number: u64) -> String {
        format!("{}-{number:04}", self.slug())
    }

    /// Transcript attachment name, e.g. `appeal-ticket-0001.txt`
    #[must_use]
    pub fn transcript_filename(self, number: u64) -> String {
        format!("{}-ticket-{number:04}.txt", self.slug())
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TicketType {
    type Err = GuildDeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Support" | "support" => Ok(Self::Support),
            "Report" | "report" => Ok(Self::Report),
            "Appeal" | "appeal" => Ok(Self::Appeal),
            other => Err(GuildDeskError::InvalidTicketType {
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle position of a ticket channel
///
/// Closed is terminal and coincides with deletion of the channel, so it never
/// appears on a live ticket; it exists for reporting and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Open,
    Claimed,
    Closed,
}

/// Recover a ticket's type and number from its channel name
///
/// Ticket channels are named `<type>-<number>`; this is how the claim and
/// close controls re-identify a ticket after a restart, without any live
/// per-message state.
#[must_use]
pub fn ticket_from_channel_name(name: &str) -> Option<(TicketType, u64)> {
    let (slug, number) = name.rsplit_once('-')?;
    let ticket_type = slug.parse::<TicketType>().ok()?;
    let number = number.parse::<u64>().ok()?;
    Some((ticket_type, number))
}

/// Render the topic marker for a ticket owned by `user`
#[must_use]
pub fn owner_marker(user: UserId) -> String {
    format!("{MARKER_PREFIX}{user}")
}

/// Extract the owner from a channel topic, if it carries a ticket marker
#[must_use]
pub fn owner_from_marker(topic: &str) -> Option<UserId> {
    topic
        .strip_prefix(MARKER_PREFIX)
        .and_then(|raw| raw.parse().ok())
}
