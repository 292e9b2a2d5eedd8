//! Opaque platform identifiers
//!
//! Discord hands out snowflakes as decimal strings; they are kept as strings and
//! never interpreted, so each kind of identifier gets its own newtype to keep
//! guild, channel and message ids from being mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw identifier
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into the raw identifier
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a guild (server)
    GuildId
);

string_id!(
    /// Identifier of a channel inside a guild
    ChannelId
);

string_id!(
    /// Identifier of a single message
    MessageId
);

impl ChannelId {
    /// Render the channel as a platform mention (`<#id>`)
    pub fn mention(&self) -> String {
        format!("<#{}>", self.0)
    }
}
