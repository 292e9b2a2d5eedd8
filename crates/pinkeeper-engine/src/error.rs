//! Error types for archival runs

use pinkeeper_domain::{ChannelId, MessageId, PlatformError};
use thiserror::Error;

/// Why a single message could not be archived
#[derive(Error, Debug, Clone)]
pub enum ArchiveError {
    /// The pinboard rejected (part of) the archived copy
    #[error("Delivery of part {part}/{parts} failed: {source}")]
    Delivery {
        /// 1-based index of the failing part
        part: usize,
        /// Total number of parts
        parts: usize,
        /// Platform failure
        source: PlatformError,
    },

    /// The copy was delivered but the source message stayed pinned
    #[error("Unpin failed after delivery: {0}")]
    Unpin(PlatformError),
}

/// Why an archival run ended in `Failed`
///
/// Every variant is scoped to the one channel that produced it.
#[derive(Error, Debug, Clone)]
pub enum RunError {
    /// Neither the channel nor its guild names a pinboard
    #[error("No pinboard configured")]
    ConfigurationMissing,

    /// The stored pinboard id no longer refers to a channel
    #[error("Pinboard channel {0} could not be resolved")]
    UnresolvableReference(ChannelId),

    /// Checking the pinboard failed for another reason
    #[error("Pinboard lookup failed: {0}")]
    PinboardLookup(PlatformError),

    /// The channel's pins could not be listed
    #[error("Failed to fetch pinned messages: {0}")]
    PinFetch(PlatformError),

    /// A message could not be archived; the drain halted there
    #[error("Archiving message {message} failed: {source}")]
    Archive {
        /// The message left pinned
        message: MessageId,
        /// Underlying failure
        source: ArchiveError,
    },
}

impl RunError {
    /// Whether this failure is the operator's to fix by setting a pinboard
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RunError::ConfigurationMissing | RunError::UnresolvableReference(_)
        )
    }
}

/// Errors raised while setting the engine up
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
