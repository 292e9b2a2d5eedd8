//! Pinkeeper bot library.
//!
//! Configuration, text commands and gateway event handling around the
//! archival engine, plus the wiring used by the `pinkeeper` binary.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod handler;

pub use app::App;
pub use cli::{Cli, Command};
pub use commands::{Command as BotCommand, CommandContext, CommandRouter};
pub use config::{AutoReply, BotConfig};
pub use error::{BotError, Result};
pub use handler::{EventHandler, Responder};
