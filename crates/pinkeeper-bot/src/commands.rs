//! Text commands for configuring the bot from inside a guild.
//!
//! A command is the guild's prefix character followed by a case-insensitive
//! command name and whitespace-separated arguments. Every command produces a
//! single reply; settings changes are merged into the stored documents.

use pinkeeper_domain::{
    fields, ChannelId, ChatPlatform, Collection, Document, DocumentStore, GuildId,
    DEFAULT_COMMAND_PREFIX,
};
use pinkeeper_engine::{GuildSweepCoordinator, PinOverflowEngine};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};

/// Commands understood by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Liveness check
    Ping,
    /// Change the guild's command prefix
    SetPrefix,
    /// Set the guild-wide pinboard
    SetServerPinboard,
    /// Set the pinboard for the current channel
    SetChannelPinboard,
    /// Set the guild's pin threshold
    SetMaxPins,
    /// Suppress auto-replies in the current channel
    BlacklistChannel,
    /// Re-enable auto-replies in the current channel
    UnblacklistChannel,
    /// Sweep every channel of the guild
    UpdateServerPins,
    /// Command overview
    Help,
}

impl Command {
    /// Look up a command by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        let command = match name.to_ascii_lowercase().as_str() {
            "ping" => Command::Ping,
            "setprefix" => Command::SetPrefix,
            "setserverpinboard" => Command::SetServerPinboard,
            "setchannelpinboard" => Command::SetChannelPinboard,
            "setmaxpins" => Command::SetMaxPins,
            "blacklistchannel" => Command::BlacklistChannel,
            "unblacklistchannel" => Command::UnblacklistChannel,
            "updateserverpins" => Command::UpdateServerPins,
            "help" => Command::Help,
            _ => return None,
        };
        Some(command)
    }
}

/// Where a command was issued.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// The guild
    pub guild: GuildId,
    /// The channel the command was posted in
    pub channel: ChannelId,
}

/// Whether the first character could start a command at all.
///
/// Letters, digits and whitespace never can, so ordinary chat is rejected
/// without touching the store.
pub fn may_be_command(content: &str) -> bool {
    content
        .chars()
        .next()
        .is_some_and(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

/// Parses and executes commands against the store and the engine.
pub struct CommandRouter<P, S> {
    engine: Arc<PinOverflowEngine<P, S>>,
    coordinator: GuildSweepCoordinator<P, S>,
    bot_name: RwLock<String>,
    admin_contact: String,
}

impl<P: ChatPlatform, S: DocumentStore> CommandRouter<P, S> {
    /// Create a router.
    pub fn new(
        engine: Arc<PinOverflowEngine<P, S>>,
        bot_name: impl Into<String>,
        admin_contact: impl Into<String>,
    ) -> Self {
        Self {
            coordinator: GuildSweepCoordinator::new(Arc::clone(&engine)),
            engine,
            bot_name: RwLock::new(bot_name.into()),
            admin_contact: admin_contact.into(),
        }
    }

    /// Change the name used in help texts.
    pub fn set_bot_name(&self, name: impl Into<String>) {
        *self.bot_name.write().unwrap_or_else(PoisonError::into_inner) = name.into();
    }

    /// The name used in help texts.
    pub fn bot_name(&self) -> String {
        self.bot_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The shared engine.
    pub fn engine(&self) -> &Arc<PinOverflowEngine<P, S>> {
        &self.engine
    }

    /// The guild's command prefix.
    pub async fn prefix(&self, guild: &GuildId) -> char {
        self.engine
            .resolver()
            .guild_config(guild)
            .await
            .prefix_char()
            .unwrap_or(DEFAULT_COMMAND_PREFIX)
    }

    /// Whether `content` is addressed to the bot in this guild.
    pub async fn is_command(&self, guild: &GuildId, content: &str) -> bool {
        if !may_be_command(content) {
            return false;
        }
        content.chars().next() == Some(self.prefix(guild).await)
    }

    /// Execute a command line; `None` if the name is not a known command.
    ///
    /// The caller has already checked the prefix with [`is_command`](Self::is_command).
    pub async fn execute(&self, ctx: &CommandContext, content: &str) -> Option<String> {
        let mut chars = content.chars();
        let prefix = chars.next()?;
        let line = chars.as_str();
        let mut words = line.split_whitespace();
        let command = Command::from_name(words.next()?)?;
        let args: Vec<&str> = words.collect();

        tracing::info!(
            guild = %ctx.guild,
            channel = %ctx.channel,
            ?command,
            "processing command"
        );

        let reply = match command {
            Command::Ping => "Pong!".to_string(),
            Command::SetPrefix => self.set_prefix(ctx, &args).await,
            Command::SetServerPinboard => self.set_server_pinboard(ctx, &args).await,
            Command::SetChannelPinboard => self.set_channel_pinboard(ctx, &args).await,
            Command::SetMaxPins => self.set_max_pins(ctx, &args).await,
            Command::BlacklistChannel => self.set_blacklisted(ctx, &args, true).await,
            Command::UnblacklistChannel => self.set_blacklisted(ctx, &args, false).await,
            Command::UpdateServerPins => self.update_server_pins(ctx).await,
            Command::Help => self.help(prefix),
        };
        Some(reply)
    }

    async fn set_prefix(&self, ctx: &CommandContext, args: &[&str]) -> String {
        let [symbol] = args else {
            return "setPrefix takes one argument: the character to use as the command prefix."
                .to_string();
        };
        let mut chars = symbol.chars();
        let (Some(prefix), None) = (chars.next(), chars.next()) else {
            return "The new prefix must be exactly one character.".to_string();
        };
        if !may_be_command(symbol) {
            return "The new prefix must be a symbol, not a letter or number.".to_string();
        }

        match self
            .upsert(
                Collection::GuildConfig,
                ctx.guild.as_str(),
                fields::PREFIX,
                prefix.to_string().into(),
            )
            .await
        {
            Ok(()) => format!("Done. Your new command prefix is {prefix}."),
            Err(reply) => reply,
        }
    }

    async fn set_server_pinboard(&self, ctx: &CommandContext, args: &[&str]) -> String {
        let [name] = args else {
            return "setServerPinboard takes one argument: the channel to use as the pinboard."
                .to_string();
        };
        let pinboard = match self.find_channel(ctx, name).await {
            Ok(pinboard) => pinboard,
            Err(reply) => return reply,
        };

        match self
            .upsert(
                Collection::GuildConfig,
                ctx.guild.as_str(),
                fields::PINBOARD,
                pinboard.as_str().into(),
            )
            .await
        {
            Ok(()) => format!(
                "Change successful! The server pinboard is now {}.",
                pinboard.mention()
            ),
            Err(reply) => reply,
        }
    }

    async fn set_channel_pinboard(&self, ctx: &CommandContext, args: &[&str]) -> String {
        let [name] = args else {
            return "setChannelPinboard takes one argument: the channel to use as the pinboard."
                .to_string();
        };
        let pinboard = match self.find_channel(ctx, name).await {
            Ok(pinboard) => pinboard,
            Err(reply) => return reply,
        };

        if let Err(reply) = self
            .upsert(
                Collection::ChannelConfig,
                ctx.channel.as_str(),
                fields::PINBOARD,
                pinboard.as_str().into(),
            )
            .await
        {
            return reply;
        }

        // Overflow already waiting in this channel moves now
        let outcome = self.engine.run_for_channel(&ctx.guild, &ctx.channel).await;
        tracing::debug!(
            channel = %ctx.channel,
            archived = outcome.archived(),
            "run after pinboard change"
        );

        format!(
            "Change successful! The pinboard for {} is now {}.",
            ctx.channel.mention(),
            pinboard.mention()
        )
    }

    async fn set_max_pins(&self, ctx: &CommandContext, args: &[&str]) -> String {
        let cap = self.engine.config().max_pins_cap;
        let Some(max_pins) = args
            .first()
            .filter(|_| args.len() == 1)
            .and_then(|arg| arg.parse::<i64>().ok())
        else {
            return "setMaxPins takes one argument: how many pins a channel may keep before the oldest move to the pinboard."
                .to_string();
        };
        if !(0..=i64::from(cap)).contains(&max_pins) {
            return format!("The number of pins must be between 0 and {cap}, inclusive.");
        }

        match self
            .upsert(Collection::GuildConfig, ctx.guild.as_str(), fields::MAX_PINS, max_pins.into())
            .await
        {
            Ok(()) => {
                format!("Command successful. The pin limit for this server is now {max_pins}.")
            }
            Err(reply) => reply,
        }
    }

    async fn set_blacklisted(
        &self,
        ctx: &CommandContext,
        args: &[&str],
        blacklisted: bool,
    ) -> String {
        let name = if blacklisted { "blacklistChannel" } else { "unblacklistChannel" };
        if !args.is_empty() {
            return format!("{name} takes no arguments; use it in the channel itself.");
        }

        match self
            .upsert(
                Collection::ChannelConfig,
                ctx.channel.as_str(),
                fields::BLACKLISTED,
                blacklisted.into(),
            )
            .await
        {
            Ok(()) if blacklisted => "Success! Channel blacklisted.".to_string(),
            Ok(()) => "Success! Channel removed from the blacklist.".to_string(),
            Err(reply) => reply,
        }
    }

    async fn update_server_pins(&self, ctx: &CommandContext) -> String {
        let report = self.coordinator.sweep(&ctx.guild).await;
        if report.is_success() {
            "Success. Pins should be updated.".to_string()
        } else {
            "Command failed. If you have not set a pinboard yet, do so with setServerPinboard or setChannelPinboard."
                .to_string()
        }
    }

    fn help(&self, p: char) -> String {
        format!(
            "Thanks for choosing {name} for your pinboard needs. Here is every command:\n\n\
             **help** - This message.\n\n\
             **setPrefix** - Changes the command prefix to another symbol. Example: ```{p}setPrefix !```\n\n\
             **setServerPinboard** - Sets the pinboard for the whole server. Overflow from every channel goes there \
             unless the channel has its own pinboard. Example: ```{p}setServerPinboard #pins```\n\n\
             **setChannelPinboard** - Sets a pinboard for the current channel only, overriding the server pinboard. \
             Example: ```{p}setChannelPinboard #special-pins```\n\n\
             **setMaxPins** - Sets how many pins a channel keeps before the oldest move to the pinboard. \
             Defaults to {default}. Example: ```{p}setMaxPins 35```\n\n\
             **blacklistChannel** - Stops automatic replies in the current channel. Pinboard handling is unaffected. \
             Example: ```{p}blacklistChannel```\n\n\
             **unblacklistChannel** - Removes the current channel from the blacklist. Example: ```{p}unblacklistChannel```\n\n\
             **updateServerPins** - Checks every channel for pin overflow and moves the excess to the pinboards. \
             Example: ```{p}updateServerPins```\n\n\
             For anything else, contact {admin}.",
            name = self.bot_name(),
            default = self.engine.config().default_max_pins,
            admin = self.admin_contact,
        )
    }

    async fn find_channel(&self, ctx: &CommandContext, name: &str) -> Result<ChannelId, String> {
        match self
            .engine
            .platform()
            .resolve_channel_by_name(&ctx.guild, name)
            .await
        {
            Ok(Some(channel)) => Ok(channel),
            Ok(None) => Err(format!(
                "{name} was not found. Check the spelling, or mention the channel with #."
            )),
            Err(e) => {
                tracing::warn!(guild = %ctx.guild, "channel lookup failed: {}", e);
                Err("Could not look up channels right now. Please try again later.".to_string())
            }
        }
    }

    async fn upsert(
        &self,
        collection: Collection,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), String> {
        let mut document = Document::new();
        document.insert(field.to_string(), value);

        self.engine
            .resolver()
            .store()
            .upsert_document(collection, id, document)
            .await
            .map_err(|e| {
                tracing::error!(
                    collection = collection.as_str(),
                    id,
                    "settings update failed: {}",
                    e
                );
                format!("Database error. Please contact {} for help.", self.admin_contact)
            })
    }
}
