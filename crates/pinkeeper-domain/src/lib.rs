//! Pinkeeper Domain Layer
//!
//! Core vocabulary shared by every other Pinkeeper crate: identifiers, settings
//! documents, pinned-message views, outbound payloads, and the trait interfaces
//! for the two external collaborators (the chat platform and the document store).
//!
//! ## Key Concepts
//!
//! - **Pinboard**: the channel that receives archived copies of overflow pins
//! - **Overflow**: a channel holds more pinned messages than its effective threshold
//! - **Drain**: evicting the oldest pins until the channel is back under threshold
//! - **Sweep**: running the drain over every text channel of a guild
//! - **Effective configuration**: channel > guild > built-in default, resolved per run
//!
//! ## Architecture
//!
//! This crate holds no infrastructure. The SQLite store and the Discord client
//! live in their own crates and implement the traits in [`traits`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod ids;
pub mod message;
pub mod settings;
pub mod traits;

// Re-exports for convenience
pub use error::PlatformError;
pub use ids::{ChannelId, GuildId, MessageId};
pub use message::{OutboundMessage, PinnedMessageView};
pub use settings::{
    fields, ChannelConfig, Collection, Document, EffectiveConfig, GuildConfig,
    DEFAULT_COMMAND_PREFIX, DEFAULT_MAX_PINS, MAX_PINS_CAP,
};
pub use traits::{ChatPlatform, DocumentStore};
