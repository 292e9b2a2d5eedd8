//! Message views consumed and produced by the archival engine

use crate::{ChannelId, MessageId};
use chrono::{DateTime, Utc};

/// Read-only projection of a pinned platform message
///
/// Built fresh from the platform on every fetch; the engine never mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct PinnedMessageView {
    /// Message identifier
    pub id: MessageId,
    /// Channel the message was posted (and pinned) in
    pub channel_id: ChannelId,
    /// Display name of the author
    pub author_name: String,
    /// Display name of the source channel
    pub channel_name: String,
    /// Body text, possibly empty
    pub content: String,
    /// When the message was originally posted
    pub created_at: DateTime<Utc>,
    /// Attachment URLs in their original order
    pub attachment_urls: Vec<String>,
    /// Link back to the original message
    pub jump_url: String,
}

/// Payload delivered to a channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Text body; the platform rejects an empty one
    pub content: String,
    /// Attachments carried by reference, never re-uploaded
    pub attachment_urls: Vec<String>,
}

impl OutboundMessage {
    /// Text-only payload
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attachment_urls: Vec::new(),
        }
    }
}
