//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pinkeeper - moves overflowing pins into a pinboard channel.
#[derive(Debug, Parser)]
#[command(name = "pinkeeper")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "pinkeeper.toml")]
    pub config: PathBuf,

    /// Bot token (overrides the configuration file)
    #[arg(long, env = "DISCORD_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Bot commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to the gateway and process events (default)
    Run,

    /// Archive overflow in a single channel once
    Drain(DrainArgs),

    /// Archive overflow in every text channel of a guild once
    Sweep(SweepArgs),

    /// Execute a text command as if it was posted in a channel
    Command(CommandArgs),

    /// Validate the configuration file and print the effective settings
    CheckConfig,
}

/// Arguments for the drain command.
#[derive(Debug, Parser)]
pub struct DrainArgs {
    /// Guild the channel belongs to
    #[arg(long)]
    pub guild: String,

    /// Channel to drain
    #[arg(long)]
    pub channel: String,
}

/// Arguments for the sweep command.
#[derive(Debug, Parser)]
pub struct SweepArgs {
    /// Guild to sweep
    #[arg(long)]
    pub guild: String,
}

/// Arguments for the command command.
#[derive(Debug, Parser)]
pub struct CommandArgs {
    /// Guild the command applies to
    #[arg(long)]
    pub guild: String,

    /// Channel the command is issued in
    #[arg(long)]
    pub channel: String,

    /// Command line, including its prefix (pass after `--`, e.g. `-- -setMaxPins 30`)
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}
