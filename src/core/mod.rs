//! Core domain types for the ticket system

mod ids;
mod ticket;

pub use ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
pub use ticket::{
    CLAIM_MARKER, TicketStatus, TicketType, owner_from_marker, owner_marker,
    ticket_from_channel_name,
};
