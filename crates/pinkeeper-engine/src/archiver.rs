//! Archival copies of pinned messages
//!
//! A copy is the source message's jump link, a fenced provenance block (author,
//! channel, date, time) and the original body, with attachments carried along
//! by URL. Copies longer than the platform limit are split into ordered parts.
//! The source is unpinned only after every part has been delivered.

use crate::ArchiveError;
use pinkeeper_domain::{ChannelId, ChatPlatform, MessageId, OutboundMessage, PinnedMessageView};
use std::sync::Arc;

/// Result of archiving one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReceipt {
    /// The source message, now unpinned
    pub source: MessageId,
    /// Ids of the delivered parts, in order
    pub delivered: Vec<MessageId>,
}

/// Copies pinned messages to a pinboard and unpins them
pub struct MessageArchiver<P> {
    platform: Arc<P>,
    max_content_chars: usize,
}

impl<P: ChatPlatform> MessageArchiver<P> {
    /// Create an archiver that splits copies at `max_content_chars`
    pub fn new(platform: Arc<P>, max_content_chars: usize) -> Self {
        Self {
            platform,
            max_content_chars: max_content_chars.max(1),
        }
    }

    /// Build the outbound parts for a message
    ///
    /// Never returns an empty list and never an empty body.
    pub fn build_payloads(&self, message: &PinnedMessageView) -> Vec<OutboundMessage> {
        let text = render_archive_text(message);
        let mut parts: Vec<OutboundMessage> = split_chars(&text, self.max_content_chars)
            .into_iter()
            .map(OutboundMessage::text)
            .collect();

        if let Some(first) = parts.first_mut() {
            first.attachment_urls = message.attachment_urls.clone();
        }
        parts
    }

    /// Deliver a copy of `message` to `destination`, then unpin the source
    pub async fn archive(
        &self,
        message: &PinnedMessageView,
        destination: &ChannelId,
    ) -> Result<ArchiveReceipt, ArchiveError> {
        let parts = self.build_payloads(message);
        let total = parts.len();
        let mut delivered = Vec::with_capacity(total);

        for (index, part) in parts.iter().enumerate() {
            let sent = self
                .platform
                .send_message(destination, part)
                .await
                .map_err(|source| ArchiveError::Delivery {
                    part: index + 1,
                    parts: total,
                    source,
                })?;
            delivered.push(sent);
        }

        self.platform
            .unpin_message(&message.channel_id, &message.id)
            .await
            .map_err(ArchiveError::Unpin)?;

        tracing::debug!(
            message = %message.id,
            destination = %destination,
            parts = total,
            "message archived"
        );

        Ok(ArchiveReceipt {
            source: message.id.clone(),
            delivered,
        })
    }
}

/// Provenance block placed ahead of the original body
pub fn provenance_header(message: &PinnedMessageView) -> String {
    format!(
        "{}\n```\nAuthor: {}\nChannel: {}\nDate: {}\nTime: {}\n```\n",
        message.jump_url,
        message.author_name,
        message.channel_name,
        message.created_at.format("%a %b %d %Y"),
        message.created_at.format("%H:%M:%S UTC"),
    )
}

/// Full archive text: header followed by the body
///
/// An empty body becomes a single space so the payload is never empty.
pub fn render_archive_text(message: &PinnedMessageView) -> String {
    let body = if message.content.is_empty() {
        " "
    } else {
        message.content.as_str()
    };
    format!("{}{}", provenance_header(message), body)
}

/// Split on character boundaries into pieces of at most `max` characters
fn split_chars(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        if count == max {
            parts.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() || parts.is_empty() {
        parts.push(current);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn message(content: &str) -> PinnedMessageView {
        PinnedMessageView {
            id: MessageId::from("m1"),
            channel_id: ChannelId::from("c1"),
            author_name: "ada".to_string(),
            channel_name: "general".to_string(),
            content: content.to_string(),
            created_at: Utc.with_ymd_and_hms(2022, 3, 14, 15, 9, 26).unwrap(),
            attachment_urls: vec![
                "https://cdn.example/a.png".to_string(),
                "https://cdn.example/b.txt".to_string(),
            ],
            jump_url: "https://discord.com/channels/g1/c1/m1".to_string(),
        }
    }

    #[test]
    fn test_provenance_header() {
        let header = provenance_header(&message("hello"));
        assert_eq!(
            header,
            "https://discord.com/channels/g1/c1/m1\n```\nAuthor: ada\nChannel: general\n\
             Date: Mon Mar 14 2022\nTime: 15:09:26 UTC\n```\n"
        );
    }

    #[test]
    fn test_render_keeps_body() {
        let text = render_archive_text(&message("hello world"));
        assert!(text.ends_with("```\nhello world"));
    }

    #[test]
    fn test_empty_body_is_never_empty() {
        let text = render_archive_text(&message(""));
        assert!(text.ends_with("```\n "));
    }

    #[test]
    fn test_split_chars() {
        assert_eq!(split_chars("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(split_chars("abcd", 4), vec!["abcd"]);
        assert_eq!(split_chars("", 4), vec![""]);
        // multi-byte characters are never cut in half
        assert_eq!(split_chars("ééé", 2), vec!["éé", "é"]);
    }

    #[test]
    fn test_split_covers_whole_text() {
        let text = "x".repeat(4500);
        let parts = split_chars(&text, 2000);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.concat(), text);
        assert!(parts.iter().all(|p| p.chars().count() <= 2000));
    }
}
