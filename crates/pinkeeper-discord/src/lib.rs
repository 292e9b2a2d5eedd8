//! Pinkeeper Discord adapter
//!
//! [`DiscordClient`] implements the `ChatPlatform` trait on the Discord REST
//! API (v10). [`gateway`] keeps a WebSocket session open and forwards the
//! events that trigger archival runs and commands.
//!
//! # Examples
//!
//! ```no_run
//! use pinkeeper_discord::{DiscordClient, DEFAULT_API_BASE};
//!
//! let client = DiscordClient::new("bot-token", DEFAULT_API_BASE).unwrap();
//! ```

#![warn(missing_docs)]

mod client;
mod error;

pub mod gateway;
pub mod models;

pub use client::{map_status, DiscordClient, DEFAULT_API_BASE, DEFAULT_MAX_ATTEMPTS};
pub use error::GatewayError;
pub use gateway::{run_gateway, GatewayConfig, GatewayEvent};
pub use models::DiscordMessage;
