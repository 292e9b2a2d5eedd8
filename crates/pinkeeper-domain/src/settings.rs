//! Guild- and channel-level settings documents
//!
//! Settings are stored as loosely-typed JSON documents keyed by guild or channel
//! id. The typed views here decode them leniently: a missing field and a field of
//! the wrong type both come back as `None`, and the resolver applies defaults.

use crate::ChannelId;
use serde_json::{Map, Value};

/// A stored settings document (a JSON object)
pub type Document = Map<String, Value>;

/// Pin threshold used when a guild has not configured one
pub const DEFAULT_MAX_PINS: u32 = 40;

/// Largest pin threshold a guild may configure (the platform caps pins at 50)
pub const MAX_PINS_CAP: u32 = 49;

/// Command prefix used when a guild has not configured one
pub const DEFAULT_COMMAND_PREFIX: char = '-';

/// Document field names
pub mod fields {
    /// Pinboard destination channel id (guild and channel documents)
    pub const PINBOARD: &str = "pinboard";
    /// Channel blacklist flag
    pub const BLACKLISTED: &str = "blacklisted";
    /// Guild command prefix override
    pub const PREFIX: &str = "prefix";
    /// Guild pin threshold override
    pub const MAX_PINS: &str = "maxPins";
}

/// Document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Per-guild settings, keyed by guild id
    GuildConfig,
    /// Per-channel settings, keyed by channel id
    ChannelConfig,
}

impl Collection {
    /// Storage name of the collection
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::GuildConfig => "guild_config",
            Collection::ChannelConfig => "channel_config",
        }
    }
}

/// Channel-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Pinboard override for this channel
    pub pinboard: Option<ChannelId>,
    /// Suppresses auto-replies in this channel (never affects pin archival)
    pub blacklisted: Option<bool>,
}

impl ChannelConfig {
    /// Decode from a stored document
    pub fn from_document(doc: &Document) -> Self {
        Self {
            pinboard: string_field(doc, fields::PINBOARD).map(ChannelId::from),
            blacklisted: doc.get(fields::BLACKLISTED).and_then(Value::as_bool),
        }
    }

    /// Whether the channel is blacklisted (absent means no)
    pub fn is_blacklisted(&self) -> bool {
        self.blacklisted.unwrap_or(false)
    }
}

/// Guild-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildConfig {
    /// Default pinboard for every channel of the guild
    pub pinboard: Option<ChannelId>,
    /// Command prefix override
    pub prefix: Option<String>,
    /// Pin threshold override, unvalidated
    pub max_pins: Option<i64>,
}

impl GuildConfig {
    /// Decode from a stored document
    pub fn from_document(doc: &Document) -> Self {
        Self {
            pinboard: string_field(doc, fields::PINBOARD).map(ChannelId::from),
            prefix: string_field(doc, fields::PREFIX).map(str::to_string),
            max_pins: doc.get(fields::MAX_PINS).and_then(Value::as_i64),
        }
    }

    /// First character of the configured prefix, if any
    pub fn prefix_char(&self) -> Option<char> {
        self.prefix.as_deref().and_then(|p| p.chars().next())
    }

    /// The stored threshold if it lies within `0..=cap`
    pub fn max_pins_within(&self, cap: u32) -> Option<u32> {
        self.max_pins
            .and_then(|value| u32::try_from(value).ok())
            .filter(|value| *value <= cap)
    }
}

/// Settings resolved for a single archival run
///
/// Never persisted. `max_pins` is always within `0..=MAX_PINS_CAP` (or the
/// engine's configured cap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    /// Destination for archived pins; `None` means the run cannot proceed
    pub pinboard: Option<ChannelId>,
    /// Number of pins the channel may keep
    pub max_pins: u32,
}

fn string_field<'a>(doc: &'a Document, name: &str) -> Option<&'a str> {
    doc.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
