//! Gateway event handling.
//!
//! Each event runs in its own task. Pin updates trigger an archival run for
//! the channel, messages are routed to commands or auto-replies, and guild
//! membership changes post a welcome or remove the guild's settings.

use crate::commands::{CommandContext, CommandRouter};
use crate::config::AutoReply;
use async_trait::async_trait;
use pinkeeper_discord::{DiscordClient, DiscordMessage, GatewayEvent};
use pinkeeper_domain::{
    ChannelId, ChatPlatform, Collection, DocumentStore, GuildId, MessageId, PlatformError,
    DEFAULT_COMMAND_PREFIX,
};
use pinkeeper_engine::{PinOverflowEngine, RunOutcome};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Posts replies and announcements.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Reply to a message in its channel
    async fn reply(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        text: &str,
    ) -> Result<(), PlatformError>;

    /// Post a message to a channel
    async fn say(&self, channel: &ChannelId, text: &str) -> Result<(), PlatformError>;
}

#[async_trait]
impl Responder for DiscordClient {
    async fn reply(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        text: &str,
    ) -> Result<(), PlatformError> {
        self.reply_to_message(channel, message, text).await.map(|_| ())
    }

    async fn say(&self, channel: &ChannelId, text: &str) -> Result<(), PlatformError> {
        self.send_text(channel, text).await.map(|_| ())
    }
}

#[derive(Default)]
struct Identity {
    user_id: Option<String>,
    guilds: HashSet<GuildId>,
}

/// Reacts to gateway events.
pub struct EventHandler<P, S> {
    router: CommandRouter<P, S>,
    auto_replies: Vec<AutoReply>,
    admin_contact: String,
    identity: RwLock<Identity>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<P, S> EventHandler<P, S>
where
    P: ChatPlatform + Responder + 'static,
    S: DocumentStore + 'static,
{
    /// Create a handler around a shared engine.
    pub fn new(
        engine: Arc<PinOverflowEngine<P, S>>,
        auto_replies: Vec<AutoReply>,
        admin_contact: impl Into<String>,
    ) -> Self {
        let admin_contact = admin_contact.into();
        Self {
            router: CommandRouter::new(engine, "Pinkeeper", admin_contact.clone()),
            auto_replies,
            admin_contact,
            identity: RwLock::new(Identity::default()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// The command router.
    pub fn router(&self) -> &CommandRouter<P, S> {
        &self.router
    }

    fn engine(&self) -> &Arc<PinOverflowEngine<P, S>> {
        self.router.engine()
    }

    /// Consume events until the sender side closes.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<GatewayEvent>) {
        while let Some(event) = events.recv().await {
            // Ready carries the guild list the join check relies on
            if matches!(event, GatewayEvent::Ready { .. }) {
                self.handle(event).await;
            } else {
                self.spawn(event);
            }
        }
        self.drain_tasks().await;
        tracing::info!("event stream closed");
    }

    /// Handle one event in its own task.
    pub fn spawn(self: &Arc<Self>, event: GatewayEvent) {
        let handler = Arc::clone(self);
        let task = tokio::spawn(async move { handler.handle(event).await });

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    /// Wait for every spawned event task.
    pub async fn drain_tasks(&self) {
        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!("event task panicked: {}", e);
            }
        }
    }

    /// Handle one event to completion.
    pub async fn handle(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready {
                user_id,
                username,
                guilds,
            } => {
                tracing::info!(user = %username, guilds = guilds.len(), "connected to Discord");
                let mut identity = self.identity.write().unwrap_or_else(PoisonError::into_inner);
                identity.user_id = Some(user_id);
                identity.guilds.extend(guilds);
                drop(identity);
                self.router.set_bot_name(username);
            }
            GatewayEvent::MessageCreate(message) => self.on_message(*message).await,
            GatewayEvent::ChannelPinsUpdate {
                guild_id: Some(guild),
                channel_id,
            } => {
                self.on_pins_update(&guild, &channel_id).await;
            }
            GatewayEvent::ChannelPinsUpdate { guild_id: None, .. } => {}
            GatewayEvent::GuildCreate {
                guild_id,
                name,
                system_channel_id,
            } => self.on_guild_create(guild_id, &name, system_channel_id).await,
            GatewayEvent::GuildDelete {
                guild_id,
                unavailable,
            } => {
                if !unavailable {
                    self.on_guild_delete(&guild_id).await;
                }
            }
        }
    }

    async fn on_pins_update(&self, guild: &GuildId, channel: &ChannelId) -> RunOutcome {
        tracing::debug!(guild = %guild, channel = %channel, "pins updated");
        self.engine().run_for_channel(guild, channel).await
    }

    async fn on_message(&self, message: DiscordMessage) {
        let own = self
            .identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user_id
            .as_deref()
            == Some(message.author.id.as_str());
        if own {
            return;
        }
        let Some(guild) = message.guild_id.clone() else {
            return;
        };

        if self.router.is_command(&guild, &message.content).await {
            let ctx = CommandContext {
                guild,
                channel: message.channel_id.clone(),
            };
            if let Some(reply) = self.router.execute(&ctx, &message.content).await {
                if let Err(e) = self
                    .engine()
                    .platform()
                    .reply(&message.channel_id, &message.id, &reply)
                    .await
                {
                    tracing::warn!(
                        channel = %message.channel_id,
                        "failed to send command reply: {}",
                        e
                    );
                }
            }
            return;
        }

        let Some(auto) = self.auto_reply_for(&message.content) else {
            return;
        };
        let blacklisted = self
            .engine()
            .resolver()
            .channel_config(&message.channel_id)
            .await
            .is_blacklisted();
        if blacklisted {
            return;
        }
        if let Err(e) = self.engine().platform().say(&message.channel_id, &auto.reply).await {
            tracing::warn!(channel = %message.channel_id, "failed to send auto reply: {}", e);
        }
    }

    /// First auto-reply whose trigger occurs in `content`, ignoring case.
    pub fn auto_reply_for(&self, content: &str) -> Option<&AutoReply> {
        let lower = content.to_lowercase();
        self.auto_replies
            .iter()
            .find(|r| lower.contains(&r.trigger.to_lowercase()))
    }

    async fn on_guild_create(&self, guild: GuildId, name: &str, system_channel: Option<ChannelId>) {
        let joined = self
            .identity
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .guilds
            .insert(guild.clone());
        if !joined {
            return;
        }
        tracing::info!(guild = %guild, name, "joined guild");

        let Some(channel) = system_channel else {
            return;
        };
        if let Err(e) = self.engine().platform().say(&channel, &self.welcome_text()).await {
            tracing::warn!(guild = %guild, "failed to post welcome message: {}", e);
        }
    }

    /// Message posted when the bot joins a guild.
    pub fn welcome_text(&self) -> String {
        let p = DEFAULT_COMMAND_PREFIX;
        format!(
            "Hello! Thanks for choosing {name} for your pinboard needs. Here's how it works:\n\
             First, set a server-wide pinboard with **{p}setServerPinboard**.\n\
             If needed, set channel-specific pinboards with **{p}setChannelPinboard**.\n\
             Then start pinning messages, or run **{p}updateServerPins**, and I'll move excess pins \
             into your pinboard channels.\n\n\
             More questions? Use **{p}help** or contact {admin}.",
            name = self.router.bot_name(),
            admin = self.admin_contact,
        )
    }

    async fn on_guild_delete(&self, guild: &GuildId) {
        self.identity
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .guilds
            .remove(guild);

        match self
            .engine()
            .resolver()
            .store()
            .delete_document(Collection::GuildConfig, guild.as_str())
            .await
        {
            Ok(removed) => {
                tracing::info!(guild = %guild, removed, "removed from guild, settings deleted")
            }
            Err(e) => tracing::error!(
                guild = %guild,
                "removed from guild, could not delete settings: {}",
                e
            ),
        }
    }
}
