//! In-memory collaborators shared by the engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pinkeeper_domain::{
    ChannelId, ChatPlatform, Collection, Document, DocumentStore, GuildId, MessageId,
    OutboundMessage, PinnedMessageView, PlatformError,
};
use pinkeeper_engine::{EngineConfig, InMemoryChannelLocks, PinOverflowEngine};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

pub const GUILD: &str = "guild-1";
pub const PINBOARD: &str = "pinboard";

/// Recorded platform call, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch(ChannelId),
    Send(ChannelId, String),
    Unpin(ChannelId, MessageId),
}

#[derive(Default)]
struct PlatformState {
    /// Pins per channel, most recently pinned first
    pins: HashMap<ChannelId, Vec<PinnedMessageView>>,
    channels: HashMap<GuildId, Vec<ChannelId>>,
    /// Every reachable channel and the guild it belongs to
    existing: HashMap<ChannelId, GuildId>,
    calls: Vec<Call>,
    sends: usize,
    fail_sends: HashSet<usize>,
    fail_send_to: HashSet<ChannelId>,
    fail_unpin: HashSet<MessageId>,
    fail_listing: bool,
}

/// Scriptable chat platform
pub struct FakePlatform {
    state: Mutex<PlatformState>,
    fetch_entered: Notify,
    fetch_gate: Option<Semaphore>,
}

impl FakePlatform {
    pub fn new() -> Self {
        let platform = Self {
            state: Mutex::new(PlatformState::default()),
            fetch_entered: Notify::new(),
            fetch_gate: None,
        };
        platform.add_channel(PINBOARD);
        platform
    }

    /// Fetches block until `open_fetches` is called
    pub fn gated() -> Self {
        let mut platform = Self::new();
        platform.fetch_gate = Some(Semaphore::new(0));
        platform
    }

    pub fn add_channel(&self, channel: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .existing
            .insert(ChannelId::from(channel), GuildId::from(GUILD));
        if channel != PINBOARD {
            state
                .channels
                .entry(GuildId::from(GUILD))
                .or_default()
                .push(ChannelId::from(channel));
        }
    }

    /// Pin messages named `names`, given oldest first
    pub fn pin_oldest_first(&self, channel: &str, names: &[&str]) {
        let channel_id = ChannelId::from(channel);
        let mut views: Vec<PinnedMessageView> =
            names.iter().map(|name| view(channel, name)).collect();
        views.reverse();
        self.add_channel(channel);
        self.state.lock().unwrap().pins.insert(channel_id, views);
    }

    /// Pin `count` generated messages
    pub fn pin_many(&self, channel: &str, count: usize) {
        let names: Vec<String> = (0..count).map(|i| format!("{channel}-m{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        self.pin_oldest_first(channel, &refs);
    }

    /// A channel reachable by id that belongs to another guild
    pub fn add_foreign_channel(&self, channel: &str, guild: &str) {
        self.state
            .lock()
            .unwrap()
            .existing
            .insert(ChannelId::from(channel), GuildId::from(guild));
    }

    pub fn remove_channel(&self, channel: &str) {
        self.state
            .lock()
            .unwrap()
            .existing
            .remove(&ChannelId::from(channel));
    }

    /// Fail the n-th send call overall (1-based)
    pub fn fail_send_number(&self, n: usize) {
        self.state.lock().unwrap().fail_sends.insert(n);
    }

    pub fn fail_sends_to(&self, channel: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_send_to
            .insert(ChannelId::from(channel));
    }

    pub fn fail_unpin_of(&self, message: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_unpin
            .insert(MessageId::from(message));
    }

    pub fn fail_listing(&self) {
        self.state.lock().unwrap().fail_listing = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Fetch(_)))
            .count()
    }

    pub fn unpinned(&self) -> Vec<MessageId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Unpin(_, id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn sent(&self) -> Vec<(ChannelId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send(channel, content) => Some((channel, content)),
                _ => None,
            })
            .collect()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, Call::Fetch(_)))
            .count()
    }

    pub fn pinned(&self, channel: &str) -> Vec<MessageId> {
        self.state
            .lock()
            .unwrap()
            .pins
            .get(&ChannelId::from(channel))
            .map(|views| views.iter().map(|v| v.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn pinned_count(&self, channel: &str) -> usize {
        self.pinned(channel).len()
    }

    /// Wait until some run is parked inside `fetch_pinned_messages`
    pub async fn wait_for_fetch(&self) {
        self.fetch_entered.notified().await;
    }

    pub fn open_fetches(&self) {
        if let Some(gate) = &self.fetch_gate {
            gate.add_permits(1024);
        }
    }
}

pub fn view(channel: &str, name: &str) -> PinnedMessageView {
    PinnedMessageView {
        id: MessageId::from(name),
        channel_id: ChannelId::from(channel),
        author_name: "tester".to_string(),
        channel_name: channel.to_string(),
        content: format!("body of {name}"),
        created_at: Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap(),
        attachment_urls: Vec::new(),
        jump_url: format!("https://discord.com/channels/{GUILD}/{channel}/{name}"),
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn fetch_pinned_messages(
        &self,
        channel: &ChannelId,
    ) -> Result<Vec<PinnedMessageView>, PlatformError> {
        let pins = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Fetch(channel.clone()));
            state.pins.get(channel).cloned().unwrap_or_default()
        };
        self.fetch_entered.notify_one();
        if let Some(gate) = &self.fetch_gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        Ok(pins)
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        message: &OutboundMessage,
    ) -> Result<MessageId, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.sends += 1;
        let number = state.sends;
        if state.fail_sends.contains(&number) || state.fail_send_to.contains(channel) {
            return Err(PlatformError::Forbidden("missing access".to_string()));
        }
        state
            .calls
            .push(Call::Send(channel.clone(), message.content.clone()));
        Ok(MessageId::new(format!("sent-{number}")))
    }

    async fn unpin_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_unpin.contains(message) {
            return Err(PlatformError::Transport("connection reset".to_string()));
        }
        state.calls.push(Call::Unpin(channel.clone(), message.clone()));
        if let Some(pins) = state.pins.get_mut(channel) {
            pins.retain(|v| &v.id != message);
        }
        Ok(())
    }

    async fn list_text_channels(&self, guild: &GuildId) -> Result<Vec<ChannelId>, PlatformError> {
        let state = self.state.lock().unwrap();
        if state.fail_listing {
            return Err(PlatformError::Transport("gateway timeout".to_string()));
        }
        Ok(state.channels.get(guild).cloned().unwrap_or_default())
    }

    async fn resolve_channel_by_name(
        &self,
        _guild: &GuildId,
        name: &str,
    ) -> Result<Option<ChannelId>, PlatformError> {
        let state = self.state.lock().unwrap();
        let wanted = ChannelId::from(name.trim_start_matches('#'));
        Ok(state.existing.contains_key(&wanted).then_some(wanted))
    }

    async fn channel_exists(
        &self,
        guild: &GuildId,
        channel: &ChannelId,
    ) -> Result<bool, PlatformError> {
        Ok(self.state.lock().unwrap().existing.get(channel) == Some(guild))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("store offline")]
pub struct FakeStoreError;

/// HashMap-backed document store
#[derive(Default)]
pub struct FakeStore {
    docs: Mutex<HashMap<(Collection, String), Document>>,
    offline: Mutex<bool>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, collection: Collection, id: &str, value: Value) {
        let Value::Object(map) = value else {
            panic!("documents must be objects");
        };
        self.docs
            .lock()
            .unwrap()
            .insert((collection, id.to_string()), map);
    }

    pub fn set_guild_pinboard(&self, pinboard: &str) {
        self.put(Collection::GuildConfig, GUILD, json!({ "pinboard": pinboard }));
    }

    pub fn set_offline(&self) {
        *self.offline.lock().unwrap() = true;
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    type Error = FakeStoreError;

    async fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, Self::Error> {
        if *self.offline.lock().unwrap() {
            return Err(FakeStoreError);
        }
        Ok(self
            .docs
            .lock()
            .unwrap()
            .get(&(collection, id.to_string()))
            .cloned())
    }

    async fn upsert_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Document,
    ) -> Result<(), Self::Error> {
        let mut docs = self.docs.lock().unwrap();
        let doc = docs.entry((collection, id.to_string())).or_default();
        doc.extend(fields);
        Ok(())
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> Result<bool, Self::Error> {
        Ok(self
            .docs
            .lock()
            .unwrap()
            .remove(&(collection, id.to_string()))
            .is_some())
    }
}

pub fn engine_with(
    platform: Arc<FakePlatform>,
    store: Arc<FakeStore>,
    config: EngineConfig,
) -> PinOverflowEngine<FakePlatform, FakeStore> {
    PinOverflowEngine::new(platform, store, Arc::new(InMemoryChannelLocks::new()), config)
        .expect("valid engine config")
}

pub fn guild() -> GuildId {
    GuildId::from(GUILD)
}

pub fn channel(name: &str) -> ChannelId {
    ChannelId::from(name)
}

pub fn ids(names: &[&str]) -> Vec<MessageId> {
    names.iter().map(|n| MessageId::from(*n)).collect()
}
