//! Pinkeeper - Discord bot that archives overflowing pins.

use anyhow::Context;
use clap::Parser;
use pinkeeper_bot::{App, BotConfig, Cli, Command};
use pinkeeper_domain::{ChannelId, GuildId};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = BotConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    let command = cli.command.unwrap_or(Command::Run);
    if let Command::CheckConfig = command {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let token = config.token(cli.token.as_deref())?;
    let app = App::build(config, token)?;

    match command {
        Command::Run | Command::CheckConfig => app.run().await?,
        Command::Drain(args) => {
            let outcome = app
                .drain(&GuildId::new(args.guild), &ChannelId::new(args.channel))
                .await;
            match outcome.error() {
                None => println!("ok: archived {} message(s)", outcome.archived()),
                Some(e) => anyhow::bail!(
                    "drain failed after {} message(s): {}",
                    outcome.archived(),
                    e
                ),
            }
        }
        Command::Sweep(args) => {
            let report = app.sweep(&GuildId::new(args.guild)).await;
            for entry in &report.outcomes {
                match entry.outcome.error() {
                    None => println!("{}: archived {}", entry.channel, entry.outcome.archived()),
                    Some(e) => println!("{}: failed: {}", entry.channel, e),
                }
            }
            if let Some(e) = &report.listing_error {
                anyhow::bail!("could not list channels: {}", e);
            }
            if !report.is_success() {
                anyhow::bail!("{} channel(s) failed", report.failed_channels().len());
            }
        }
        Command::Command(args) => {
            let reply = app
                .command(
                    &GuildId::new(args.guild),
                    &ChannelId::new(args.channel),
                    &args.text.join(" "),
                )
                .await;
            println!("{reply}");
        }
    }
    Ok(())
}
