//! Errors reported by chat platform implementations

use thiserror::Error;

/// Failure of a single platform call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The channel, message or guild does not exist (or is not visible)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The bot lacks permission for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Still rate limited after the configured retries
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Any other non-success response
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or description
        message: String,
    },

    /// Network-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl PlatformError {
    /// Whether the error means the target does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound(_))
    }
}
