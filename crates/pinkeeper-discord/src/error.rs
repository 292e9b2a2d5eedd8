//! Gateway errors

use thiserror::Error;

/// Why a gateway session ended
#[derive(Error, Debug)]
pub enum GatewayError {
    /// WebSocket failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A frame could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server sent something out of sequence
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The connection was closed
    #[error("Connection closed: {0}")]
    Closed(String),

    /// Token or intents rejected; reconnecting will not help
    #[error("Authentication failed")]
    AuthenticationFailed,
}
