//! Wire models for the Discord REST API and gateway
//!
//! Only the fields the bot reads are modelled; everything else in a payload is
//! ignored by serde.

use chrono::{DateTime, Utc};
use pinkeeper_domain::{ChannelId, GuildId, MessageId, OutboundMessage, PinnedMessageView};
use serde::{Deserialize, Serialize};

/// Channel type of a guild text channel
pub const GUILD_TEXT: u8 = 0;

/// Message author
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    /// User id
    pub id: String,
    /// Account name
    pub username: String,
    /// Display name, when the user set one
    #[serde(default)]
    pub global_name: Option<String>,
    /// Whether the account is a bot
    #[serde(default)]
    pub bot: bool,
}

impl DiscordUser {
    /// Name shown in archived copies
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

/// Message attachment
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordAttachment {
    /// CDN URL of the file
    pub url: String,
    /// Original file name
    #[serde(default)]
    pub filename: String,
}

/// A message as returned by the REST API and `MESSAGE_CREATE`
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordMessage {
    /// Message id
    pub id: MessageId,
    /// Channel the message lives in
    pub channel_id: ChannelId,
    /// Guild, present on gateway events only
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// Author
    pub author: DiscordUser,
    /// Body text
    #[serde(default)]
    pub content: String,
    /// When the message was posted
    pub timestamp: DateTime<Utc>,
    /// Attachments
    #[serde(default)]
    pub attachments: Vec<DiscordAttachment>,
}

impl DiscordMessage {
    /// Project into the read-only view the engine archives
    pub fn into_view(self, guild: Option<&GuildId>, channel_name: &str) -> PinnedMessageView {
        let jump_url = jump_url(guild, &self.channel_id, &self.id);
        PinnedMessageView {
            author_name: self.author.display_name().to_string(),
            channel_name: channel_name.to_string(),
            content: self.content,
            created_at: self.timestamp,
            attachment_urls: self.attachments.into_iter().map(|a| a.url).collect(),
            jump_url,
            id: self.id,
            channel_id: self.channel_id,
        }
    }
}

/// A channel as returned by `GET /channels/{id}` and the guild channel list
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordChannel {
    /// Channel id
    pub id: ChannelId,
    /// Channel type
    #[serde(rename = "type")]
    pub kind: u8,
    /// Owning guild (absent for DMs)
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// Channel name (absent for DMs)
    #[serde(default)]
    pub name: Option<String>,
}

impl DiscordChannel {
    /// Whether this is a guild text channel
    pub fn is_text(&self) -> bool {
        self.kind == GUILD_TEXT
    }

    /// Name or, failing that, the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }
}

/// Link embed carrying an attachment by reference
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Embed {
    /// Link target
    pub url: String,
    /// Shown as the embed title
    pub title: String,
}

/// Reply target of an outgoing message
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MessageReference {
    /// Message being replied to
    pub message_id: MessageId,
    /// Do not fail when the target has been deleted
    pub fail_if_not_exists: bool,
}

/// Mentions the platform is allowed to notify
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AllowedMentions {
    /// Mention kinds to parse; empty disables all pings
    pub parse: Vec<String>,
}

/// Body of `POST /channels/{id}/messages`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CreateMessage {
    /// Text body
    pub content: String,
    /// Link embeds
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    /// Reply target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReference>,
    /// Archived copies must not re-ping the original mentions
    pub allowed_mentions: AllowedMentions,
}

/// Platform cap on embeds per message
pub const MAX_EMBEDS: usize = 10;

impl CreateMessage {
    /// Plain text message
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            embeds: Vec::new(),
            message_reference: None,
            allowed_mentions: AllowedMentions::default(),
        }
    }

    /// Reply to `message`
    pub fn reply(content: impl Into<String>, message: &MessageId) -> Self {
        Self {
            message_reference: Some(MessageReference {
                message_id: message.clone(),
                fail_if_not_exists: false,
            }),
            ..Self::text(content)
        }
    }
}

impl From<&OutboundMessage> for CreateMessage {
    fn from(message: &OutboundMessage) -> Self {
        let embeds = message
            .attachment_urls
            .iter()
            .take(MAX_EMBEDS)
            .map(|url| Embed {
                url: url.clone(),
                title: file_name(url).to_string(),
            })
            .collect();
        Self {
            embeds,
            ..Self::text(message.content.clone())
        }
    }
}

/// Response body of a created message
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedMessage {
    /// New message id
    pub id: MessageId,
}

/// Body of a 429 response
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitBody {
    /// Seconds to wait before retrying
    pub retry_after: f64,
}

/// Body of an error response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Human readable reason
    #[serde(default)]
    pub message: String,
}

/// Link to a message in the client
pub fn jump_url(guild: Option<&GuildId>, channel: &ChannelId, message: &MessageId) -> String {
    let guild = guild.map(GuildId::as_str).unwrap_or("@me");
    format!("https://discord.com/channels/{guild}/{channel}/{message}")
}

/// Channel id inside a `<#id>` mention
pub fn parse_channel_mention(text: &str) -> Option<&str> {
    let id = text.trim().strip_prefix("<#")?.strip_suffix('>')?;
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_digit())).then_some(id)
}

fn file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(url)
}
