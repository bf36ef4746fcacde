//! Platform entity identifiers
//!
//! Guilds, channels, users, roles, and messages are all addressed by opaque
//! numeric snowflakes. Newtypes keep them from being mixed up at call sites;
//! serialization is transparent so the configuration document stays plain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw snowflake
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw snowflake value
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.parse::<u64>().map(Self)
            }
        }
    };
}

id_type! {
    /// A community/workspace on the chat platform; the tenant boundary
    GuildId
}

id_type! {
    /// A text channel or grouping category
    ChannelId
}

id_type! {
    /// A user account (human or automation)
    UserId
}

id_type! {
    /// A guild role
    RoleId
}

id_type! {
    /// A single message within a channel
    MessageId
}

impl UserId {
    /// Render the platform mention form for this user
    #[must_use]
    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }
}

impl RoleId {
    /// Render the platform mention form for this role
    #[must_use]
    pub fn mention(self) -> String {
        format!("<@&{}>", self.0)
    }
}

impl ChannelId {
    /// Render the platform mention form for this channel
    #[must_use]
    pub fn mention(self) -> String {
        format!("<#{}>", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id: GuildId = "123456789".parse().unwrap();
        assert_eq!(id.get(), 123_456_789);
        assert_eq!(id.to_string(), "123456789");
    }

    #[test]
    fn test_mentions() {
        assert_eq!(UserId::new(7).mention(), "<@7>");
        assert_eq!(RoleId::new(8).mention(), "<@&8>");
        assert_eq!(ChannelId::new(9).mention(), "<#9>");
    }

    #[test]
    fn test_serde_transparent() {
        let id = ChannelId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: ChannelId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
    }
}
