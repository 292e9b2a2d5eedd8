//! Bot configuration, loaded from a TOML file.
//!
//! ```toml
//! database_path = "pinkeeper.db"
//! admin_contact = "@pinkeeper-admin"
//! sweep_guilds = ["123456789012345678"]
//!
//! [discord]
//! api_base = "https://discord.com/api/v10"
//!
//! [engine]
//! default_max_pins = 40
//! sweep_interval_minutes = 60
//!
//! [[auto_replies]]
//! trigger = "fight image"
//! reply = "https://imgur.com/OSVZKMt"
//! ```

use crate::error::{BotError, Result};
use pinkeeper_discord::gateway::DEFAULT_GATEWAY_URL;
use pinkeeper_discord::{DEFAULT_API_BASE, DEFAULT_MAX_ATTEMPTS};
use pinkeeper_domain::GuildId;
use pinkeeper_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Discord connection settings
    #[serde(default)]
    pub discord: DiscordSettings,

    /// SQLite database holding guild and channel settings
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Who users should contact when something breaks
    #[serde(default = "default_admin_contact")]
    pub admin_contact: String,

    /// Archival engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Guilds swept by the periodic worker
    #[serde(default)]
    pub sweep_guilds: Vec<GuildId>,

    /// Canned replies to trigger phrases
    #[serde(default)]
    pub auto_replies: Vec<AutoReply>,
}

/// Discord connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordSettings {
    /// Bot token; `DISCORD_TOKEN` or `--token` take precedence
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// REST API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Gateway WebSocket URL
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Attempts per REST request while rate limited
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seconds between a dropped gateway session and the next connect
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

/// Reply posted when a message contains `trigger` (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoReply {
    /// Phrase to look for
    pub trigger: String,
    /// Text to post in response
    pub reply: String,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("pinkeeper.db")
}

fn default_admin_contact() -> String {
    "the bot administrator".to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_reconnect_delay() -> u64 {
    5
}

impl Default for DiscordSettings {
    fn default() -> Self {
        Self {
            token: None,
            api_base: default_api_base(),
            gateway_url: default_gateway_url(),
            max_attempts: default_max_attempts(),
            reconnect_delay_secs: default_reconnect_delay(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            discord: DiscordSettings::default(),
            database_path: default_database_path(),
            admin_contact: default_admin_contact(),
            engine: EngineConfig::default(),
            sweep_guilds: Vec::new(),
            auto_replies: Vec::new(),
        }
    }
}

impl BotConfig {
    /// Load configuration from file, or defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            Self::from_toml_str(&contents)
        } else {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: BotConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that serde cannot.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        if self.discord.max_attempts == 0 {
            return Err(BotError::Config(
                "discord.max_attempts must be at least 1".into(),
            ));
        }
        if let Some(reply) = self.auto_replies.iter().find(|r| r.trigger.trim().is_empty()) {
            return Err(BotError::Config(format!(
                "auto reply '{}' has an empty trigger",
                reply.reply
            )));
        }
        Ok(())
    }

    /// Resolve the bot token, preferring an explicit value over the file.
    pub fn token(&self, explicit: Option<&str>) -> Result<String> {
        let non_blank = |t: &&str| !t.trim().is_empty();
        explicit
            .filter(non_blank)
            .or(self.discord.token.as_deref().filter(non_blank))
            .map(|t| t.trim().to_string())
            .ok_or_else(|| {
                BotError::Config("no bot token: set DISCORD_TOKEN or discord.token".into())
            })
    }
}
