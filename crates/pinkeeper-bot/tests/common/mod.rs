//! Fake platform shared by the bot tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pinkeeper_bot::Responder;
use pinkeeper_domain::{
    ChannelId, ChatPlatform, GuildId, MessageId, OutboundMessage, PinnedMessageView, PlatformError,
};
use pinkeeper_engine::{EngineConfig, InMemoryChannelLocks, PinOverflowEngine};
use pinkeeper_store::SqliteDocumentStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const GUILD: &str = "100";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Posted {
    Reply {
        channel: ChannelId,
        to: MessageId,
        text: String,
    },
    Say {
        channel: ChannelId,
        text: String,
    },
    Archive {
        channel: ChannelId,
        text: String,
    },
}

#[derive(Default)]
struct State {
    /// (id, name) of every text channel in the guild
    channels: Vec<(ChannelId, String)>,
    /// Pins per channel, most recent first
    pins: HashMap<ChannelId, Vec<PinnedMessageView>>,
    posted: Vec<Posted>,
}

#[derive(Default)]
pub struct FakeDiscord {
    state: Mutex<State>,
}

impl FakeDiscord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_channel(&self, id: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .channels
            .push((ChannelId::from(id), name.to_string()));
    }

    pub fn pin_many(&self, channel: &str, count: usize) {
        let views = (0..count)
            .rev()
            .map(|i| PinnedMessageView {
                id: MessageId::new(format!("{channel}-{i}")),
                channel_id: ChannelId::from(channel),
                author_name: "someone".to_string(),
                channel_name: channel.to_string(),
                content: format!("pin {i}"),
                created_at: Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(),
                attachment_urls: Vec::new(),
                jump_url: format!("https://discord.com/channels/{GUILD}/{channel}/{i}"),
            })
            .collect();
        self.state
            .lock()
            .unwrap()
            .pins
            .insert(ChannelId::from(channel), views);
    }

    pub fn pinned_count(&self, channel: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .pins
            .get(&ChannelId::from(channel))
            .map_or(0, Vec::len)
    }

    pub fn posted(&self) -> Vec<Posted> {
        self.state.lock().unwrap().posted.clone()
    }

    pub fn last_reply(&self) -> Option<String> {
        self.posted().into_iter().rev().find_map(|p| match p {
            Posted::Reply { text, .. } => Some(text),
            _ => None,
        })
    }

    pub fn said(&self) -> Vec<(ChannelId, String)> {
        self.posted()
            .into_iter()
            .filter_map(|p| match p {
                Posted::Say { channel, text } => Some((channel, text)),
                _ => None,
            })
            .collect()
    }

    pub fn archived_to(&self, channel: &str) -> usize {
        self.posted()
            .iter()
            .filter(|p| matches!(p, Posted::Archive { channel: c, .. } if c.as_str() == channel))
            .count()
    }
}

#[async_trait]
impl ChatPlatform for FakeDiscord {
    async fn fetch_pinned_messages(
        &self,
        channel: &ChannelId,
    ) -> Result<Vec<PinnedMessageView>, PlatformError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .pins
            .get(channel)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        message: &OutboundMessage,
    ) -> Result<MessageId, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.posted.push(Posted::Archive {
            channel: channel.clone(),
            text: message.content.clone(),
        });
        Ok(MessageId::new(format!("archived-{}", state.posted.len())))
    }

    async fn unpin_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), PlatformError> {
        if let Some(pins) = self.state.lock().unwrap().pins.get_mut(channel) {
            pins.retain(|p| &p.id != message);
        }
        Ok(())
    }

    async fn list_text_channels(&self, _guild: &GuildId) -> Result<Vec<ChannelId>, PlatformError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .channels
            .iter()
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn resolve_channel_by_name(
        &self,
        _guild: &GuildId,
        name: &str,
    ) -> Result<Option<ChannelId>, PlatformError> {
        let state = self.state.lock().unwrap();
        let found = state.channels.iter().find(|(id, channel_name)| {
            name == id.mention() || name.trim_start_matches('#') == channel_name
        });
        Ok(found.map(|(id, _)| id.clone()))
    }

    async fn channel_exists(
        &self,
        _guild: &GuildId,
        channel: &ChannelId,
    ) -> Result<bool, PlatformError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .channels
            .iter()
            .any(|(id, _)| id == channel))
    }
}

#[async_trait]
impl Responder for FakeDiscord {
    async fn reply(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        text: &str,
    ) -> Result<(), PlatformError> {
        self.state.lock().unwrap().posted.push(Posted::Reply {
            channel: channel.clone(),
            to: message.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn say(&self, channel: &ChannelId, text: &str) -> Result<(), PlatformError> {
        self.state.lock().unwrap().posted.push(Posted::Say {
            channel: channel.clone(),
            text: text.to_string(),
        });
        Ok(())
    }
}

pub type TestEngine = PinOverflowEngine<FakeDiscord, SqliteDocumentStore>;

/// Engine over the fake platform and an in-memory SQLite store
pub fn engine(platform: Arc<FakeDiscord>) -> Arc<TestEngine> {
    let store = Arc::new(SqliteDocumentStore::new(":memory:").unwrap());
    Arc::new(
        PinOverflowEngine::new(
            platform,
            store,
            Arc::new(InMemoryChannelLocks::new()),
            EngineConfig::default(),
        )
        .unwrap(),
    )
}

pub fn guild() -> GuildId {
    GuildId::from(GUILD)
}
