//! Error types for the bot application.

use thiserror::Error;

/// Result type alias for bot operations.
pub type Result<T> = std::result::Result<T, BotError>;

/// Bot-level errors.
#[derive(Debug, Error)]
pub enum BotError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] pinkeeper_store::StoreError),

    /// Platform error
    #[error("Platform error: {0}")]
    Platform(#[from] pinkeeper_domain::PlatformError),

    /// Engine setup error
    #[error("Engine error: {0}")]
    Engine(#[from] pinkeeper_engine::EngineError),

    /// Gateway error
    #[error("Gateway error: {0}")]
    Gateway(#[from] pinkeeper_discord::GatewayError),

    /// A background task failed
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
