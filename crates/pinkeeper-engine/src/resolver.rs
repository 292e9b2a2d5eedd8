//! Effective configuration resolution
//!
//! Precedence: pinboard comes from the channel document, then the guild
//! document, else stays unset. The pin threshold comes from the guild document
//! when it is within range, else the engine default. Documents are fetched fresh
//! on every call; nothing is cached.

use futures_util::future::join;
use pinkeeper_domain::{
    ChannelConfig, ChannelId, Collection, DocumentStore, EffectiveConfig, GuildConfig, GuildId,
};
use std::sync::Arc;

/// Reads settings documents and applies precedence
pub struct ConfigResolver<S> {
    store: Arc<S>,
    default_max_pins: u32,
    max_pins_cap: u32,
}

impl<S: DocumentStore> ConfigResolver<S> {
    /// Create a resolver over a document store
    pub fn new(store: Arc<S>, default_max_pins: u32, max_pins_cap: u32) -> Self {
        Self {
            store,
            default_max_pins: default_max_pins.min(max_pins_cap),
            max_pins_cap,
        }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Resolve the settings for one run
    ///
    /// Never fails: a missing document, an undecodable field or a store error
    /// all fall back to the defaults (store errors are logged).
    pub async fn resolve(&self, channel: &ChannelId, guild: &GuildId) -> EffectiveConfig {
        let (channel_config, guild_config) =
            join(self.channel_config(channel), self.guild_config(guild)).await;

        let pinboard = channel_config
            .pinboard
            .or_else(|| guild_config.pinboard.clone());
        let max_pins = guild_config
            .max_pins_within(self.max_pins_cap)
            .unwrap_or(self.default_max_pins);

        tracing::debug!(
            channel = %channel,
            guild = %guild,
            pinboard = ?pinboard,
            max_pins,
            "resolved effective config"
        );

        EffectiveConfig { pinboard, max_pins }
    }

    /// Channel settings, defaulted when absent or unreadable
    pub async fn channel_config(&self, channel: &ChannelId) -> ChannelConfig {
        match self
            .store
            .get_document(Collection::ChannelConfig, channel.as_str())
            .await
        {
            Ok(Some(doc)) => ChannelConfig::from_document(&doc),
            Ok(None) => ChannelConfig::default(),
            Err(e) => {
                tracing::warn!(channel = %channel, "channel config lookup failed: {}", e);
                ChannelConfig::default()
            }
        }
    }

    /// Guild settings, defaulted when absent or unreadable
    pub async fn guild_config(&self, guild: &GuildId) -> GuildConfig {
        match self
            .store
            .get_document(Collection::GuildConfig, guild.as_str())
            .await
        {
            Ok(Some(doc)) => GuildConfig::from_document(&doc),
            Ok(None) => GuildConfig::default(),
            Err(e) => {
                tracing::warn!(guild = %guild, "guild config lookup failed: {}", e);
                GuildConfig::default()
            }
        }
    }
}
