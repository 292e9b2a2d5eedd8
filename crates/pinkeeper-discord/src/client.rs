//! REST client implementing [`ChatPlatform`] against the Discord HTTP API

use crate::models::{
    parse_channel_mention, ApiErrorBody, CreateMessage, CreatedMessage, DiscordChannel,
    DiscordMessage, RateLimitBody,
};
use async_trait::async_trait;
use pinkeeper_domain::{
    ChannelId, ChatPlatform, GuildId, MessageId, OutboundMessage, PinnedMessageView,
    PlatformError,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Default REST endpoint
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Attempts per request when rate limited
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Upper bound on a single rate limit wait
const MAX_RETRY_WAIT: Duration = Duration::from_secs(30);

/// Authenticated Discord REST client
#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    max_attempts: u32,
}

impl std::fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordClient")
            .field("api_base", &self.api_base)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl DiscordClient {
    /// Create a client for the given bot token and API base URL
    pub fn new(
        token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("pinkeeper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlatformError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Set how many times a rate limited request is attempted
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Post a plain text message
    pub async fn send_text(
        &self,
        channel: &ChannelId,
        text: &str,
    ) -> Result<MessageId, PlatformError> {
        self.create_message(channel, &CreateMessage::text(text)).await
    }

    /// Reply to a message in the same channel
    pub async fn reply_to_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        text: &str,
    ) -> Result<MessageId, PlatformError> {
        self.create_message(channel, &CreateMessage::reply(text, message))
            .await
    }

    /// Fetch a channel by id
    pub async fn get_channel(&self, channel: &ChannelId) -> Result<DiscordChannel, PlatformError> {
        self.request(Method::GET, &format!("/channels/{channel}"), None::<&()>)
            .await
    }

    /// Every channel of a guild, of any type
    pub async fn guild_channels(
        &self,
        guild: &GuildId,
    ) -> Result<Vec<DiscordChannel>, PlatformError> {
        self.request(Method::GET, &format!("/guilds/{guild}/channels"), None::<&()>)
            .await
    }

    async fn create_message(
        &self,
        channel: &ChannelId,
        body: &CreateMessage,
    ) -> Result<MessageId, PlatformError> {
        let created: CreatedMessage = self
            .request(Method::POST, &format!("/channels/{channel}/messages"), Some(body))
            .await?;
        Ok(created.id)
    }

    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, PlatformError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let bytes = self.execute(method, path, body).await?;
        serde_json::from_slice(&bytes).map_err(|e| PlatformError::Decode(format!("{path}: {e}")))
    }

    /// Send a request, retrying while rate limited, and return the raw body
    async fn execute<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, PlatformError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.api_base, path);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut request = self
                .http
                .request(method.clone(), &url)
                .header("Authorization", format!("Bot {}", self.token));
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(|e| PlatformError::Transport(e.to_string()))?;
            let status = response.status();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| PlatformError::Transport(e.to_string()))?;

            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = retry_after(&bytes);
                if attempt >= self.max_attempts {
                    return Err(PlatformError::RateLimited(format!(
                        "{method} {path} after {attempt} attempts"
                    )));
                }
                tracing::warn!(
                    path,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "rate limited, retrying"
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            if status.is_success() {
                return Ok(bytes.to_vec());
            }
            return Err(map_status(status, &bytes));
        }
    }
}

fn retry_after(body: &[u8]) -> Duration {
    serde_json::from_slice::<RateLimitBody>(body)
        .ok()
        .filter(|b| b.retry_after.is_finite() && b.retry_after >= 0.0)
        .map(|b| Duration::from_secs_f64(b.retry_after).min(MAX_RETRY_WAIT))
        .unwrap_or(Duration::from_secs(1))
}

/// Map a non-success response to a platform error
pub fn map_status(status: StatusCode, body: &[u8]) -> PlatformError {
    let message = serde_json::from_slice::<ApiErrorBody>(body)
        .map(|b| b.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

    match status {
        StatusCode::NOT_FOUND => PlatformError::NotFound(message),
        StatusCode::FORBIDDEN => PlatformError::Forbidden(message),
        StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimited(message),
        _ => PlatformError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn fetch_pinned_messages(
        &self,
        channel: &ChannelId,
    ) -> Result<Vec<PinnedMessageView>, PlatformError> {
        let info = self.get_channel(channel).await?;
        let pins: Vec<DiscordMessage> = self
            .request(Method::GET, &format!("/channels/{channel}/pins"), None::<&()>)
            .await?;

        let name = info.display_name();
        Ok(pins
            .into_iter()
            .map(|message| message.into_view(info.guild_id.as_ref(), name))
            .collect())
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        message: &OutboundMessage,
    ) -> Result<MessageId, PlatformError> {
        self.create_message(channel, &CreateMessage::from(message))
            .await
    }

    async fn unpin_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), PlatformError> {
        self.execute(
            Method::DELETE,
            &format!("/channels/{channel}/pins/{message}"),
            None::<&()>,
        )
        .await?;
        Ok(())
    }

    async fn list_text_channels(&self, guild: &GuildId) -> Result<Vec<ChannelId>, PlatformError> {
        Ok(self
            .guild_channels(guild)
            .await?
            .into_iter()
            .filter(DiscordChannel::is_text)
            .map(|c| c.id)
            .collect())
    }

    async fn resolve_channel_by_name(
        &self,
        guild: &GuildId,
        name: &str,
    ) -> Result<Option<ChannelId>, PlatformError> {
        let channels = self.guild_channels(guild).await?;

        if let Some(id) = parse_channel_mention(name) {
            return Ok(channels
                .into_iter()
                .filter(DiscordChannel::is_text)
                .find(|c| c.id.as_str() == id)
                .map(|c| c.id));
        }

        let wanted = name.trim().trim_start_matches('#');
        Ok(channels
            .into_iter()
            .filter(DiscordChannel::is_text)
            .find(|c| c.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(wanted)))
            .map(|c| c.id))
    }

    async fn channel_exists(
        &self,
        guild: &GuildId,
        channel: &ChannelId,
    ) -> Result<bool, PlatformError> {
        match self.get_channel(channel).await {
            Ok(found) => Ok(found.guild_id.as_ref() == Some(guild)),
            Err(PlatformError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
