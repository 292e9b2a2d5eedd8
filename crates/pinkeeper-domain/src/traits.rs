//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the archival engine and its two
//! collaborators. Infrastructure implementations live in other crates
//! (pinkeeper-store, pinkeeper-discord); tests substitute in-memory fakes.

use crate::{
    ChannelId, Collection, Document, GuildId, MessageId, OutboundMessage, PinnedMessageView,
    PlatformError,
};
use async_trait::async_trait;

/// Channel, message and pin operations on the chat platform
///
/// Implemented by the infrastructure layer (pinkeeper-discord)
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Currently pinned messages of a channel, most recently pinned first
    ///
    /// The oldest pin is the last element.
    async fn fetch_pinned_messages(
        &self,
        channel: &ChannelId,
    ) -> Result<Vec<PinnedMessageView>, PlatformError>;

    /// Deliver a payload to a channel, returning the new message id
    async fn send_message(
        &self,
        channel: &ChannelId,
        message: &OutboundMessage,
    ) -> Result<MessageId, PlatformError>;

    /// Unpin a message in a channel
    async fn unpin_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), PlatformError>;

    /// Text channels of a guild
    async fn list_text_channels(&self, guild: &GuildId) -> Result<Vec<ChannelId>, PlatformError>;

    /// Find a guild channel by display name or mention
    async fn resolve_channel_by_name(
        &self,
        guild: &GuildId,
        name: &str,
    ) -> Result<Option<ChannelId>, PlatformError>;

    /// Whether a channel id still refers to a reachable channel of `guild`
    async fn channel_exists(
        &self,
        guild: &GuildId,
        channel: &ChannelId,
    ) -> Result<bool, PlatformError>;
}

/// Key-value document store for settings
///
/// Implemented by the infrastructure layer (pinkeeper-store)
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Error type for store operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch a document by id
    async fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, Self::Error>;

    /// Merge `fields` into the document, creating it if absent
    async fn upsert_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Document,
    ) -> Result<(), Self::Error>;

    /// Remove a document, returning whether it existed
    async fn delete_document(&self, collection: Collection, id: &str) -> Result<bool, Self::Error>;
}
