//! Wires the store, the Discord client and the engine together.

use crate::commands::{CommandContext, CommandRouter};
use crate::config::BotConfig;
use crate::error::Result;
use crate::handler::EventHandler;
use pinkeeper_discord::gateway::BOT_INTENTS;
use pinkeeper_discord::{run_gateway, DiscordClient, GatewayConfig};
use pinkeeper_domain::{ChannelId, GuildId};
use pinkeeper_engine::{
    GuildSweepCoordinator, InMemoryChannelLocks, PinOverflowEngine, RunOutcome, SweepReport,
    SweepWorker,
};
use pinkeeper_store::SqliteDocumentStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Engine over the production collaborators.
pub type DiscordEngine = PinOverflowEngine<DiscordClient, SqliteDocumentStore>;

/// Buffered gateway events before the reader waits for the handler
const EVENT_BUFFER: usize = 256;

/// A configured bot instance.
pub struct App {
    config: BotConfig,
    token: String,
    engine: Arc<DiscordEngine>,
}

impl App {
    /// Open the store and build the engine.
    pub fn build(config: BotConfig, token: String) -> Result<Self> {
        let store = Arc::new(SqliteDocumentStore::new(&config.database_path)?);
        let client = DiscordClient::new(token.clone(), config.discord.api_base.clone())?
            .with_max_attempts(config.discord.max_attempts);
        let engine = PinOverflowEngine::new(
            Arc::new(client),
            store,
            Arc::new(InMemoryChannelLocks::new()),
            config.engine.clone(),
        )?;

        tracing::info!(
            database = %config.database_path.display(),
            dry_run = config.engine.dry_run,
            "bot initialized"
        );

        Ok(Self {
            config,
            token,
            engine: Arc::new(engine),
        })
    }

    /// The shared engine.
    pub fn engine(&self) -> &Arc<DiscordEngine> {
        &self.engine
    }

    /// Drain one channel once.
    pub async fn drain(&self, guild: &GuildId, channel: &ChannelId) -> RunOutcome {
        self.engine.run_for_channel(guild, channel).await
    }

    /// Sweep one guild once.
    pub async fn sweep(&self, guild: &GuildId) -> SweepReport {
        GuildSweepCoordinator::new(Arc::clone(&self.engine))
            .sweep(guild)
            .await
    }

    /// Execute a command line as if posted in `channel`.
    pub async fn command(&self, guild: &GuildId, channel: &ChannelId, text: &str) -> String {
        let router = CommandRouter::new(
            Arc::clone(&self.engine),
            "Pinkeeper",
            self.config.admin_contact.clone(),
        );
        if !router.is_command(guild, text).await {
            return format!(
                "Not a command in this guild; commands start with '{}'.",
                router.prefix(guild).await
            );
        }
        let ctx = CommandContext {
            guild: guild.clone(),
            channel: channel.clone(),
        };
        router
            .execute(&ctx, text)
            .await
            .unwrap_or_else(|| "Unknown command. Try help.".to_string())
    }

    fn sweep_worker(&self) -> Option<SweepWorker<DiscordClient, SqliteDocumentStore>> {
        let interval = self.config.engine.sweep_interval()?;
        if self.config.sweep_guilds.is_empty() {
            tracing::warn!("sweep interval set but no sweep_guilds configured");
            return None;
        }
        Some(SweepWorker::new(
            GuildSweepCoordinator::new(Arc::clone(&self.engine)),
            self.config.sweep_guilds.clone(),
            interval,
        ))
    }

    /// Connect to the gateway and handle events until Ctrl+C.
    pub async fn run(self) -> Result<()> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let handler = Arc::new(EventHandler::new(
            Arc::clone(&self.engine),
            self.config.auto_replies.clone(),
            self.config.admin_contact.clone(),
        ));

        let gateway_config = GatewayConfig {
            url: self.config.discord.gateway_url.clone(),
            token: self.token.clone(),
            intents: BOT_INTENTS,
            reconnect_delay: Duration::from_secs(self.config.discord.reconnect_delay_secs),
        };
        let mut gateway = tokio::spawn(run_gateway(gateway_config, tx));
        let events = tokio::spawn(handler.run(rx));
        let worker = self
            .sweep_worker()
            .map(|worker| tokio::spawn(async move { worker.run().await }));

        let result: Result<()> = tokio::select! {
            joined = &mut gateway => joined.map_err(Into::into).and_then(|r| r.map_err(Into::into)),
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                gateway.abort();
                Ok(())
            }
        };

        // Dropping the gateway's sender ends the event loop
        events.await?;
        if let Some(worker) = worker {
            worker.abort();
        }

        tracing::info!("Final metrics:\n{}", self.engine.metrics().summary());
        result
    }
}
