//! Guild-wide sweeps
//!
//! Fans the engine out over every text channel of a guild concurrently and
//! aggregates the outcomes. A failing channel fails the aggregate but never
//! cancels or rolls back its siblings.

use crate::engine::{PinOverflowEngine, RunOutcome};
use futures_util::future::join_all;
use pinkeeper_domain::{ChannelId, ChatPlatform, DocumentStore, GuildId, PlatformError};
use std::sync::Arc;

/// Outcome of one channel within a sweep
#[derive(Debug, Clone)]
pub struct ChannelOutcome {
    /// The channel
    pub channel: ChannelId,
    /// Its run outcome
    pub outcome: RunOutcome,
}

/// Aggregate result of a guild sweep
#[derive(Debug, Clone)]
pub struct SweepReport {
    /// The swept guild
    pub guild: GuildId,
    /// Per-channel outcomes, in the order the channels were given
    pub outcomes: Vec<ChannelOutcome>,
    /// Set when the guild's channels could not be listed
    pub listing_error: Option<PlatformError>,
}

impl SweepReport {
    /// True only if the channel list was read and every channel succeeded
    pub fn is_success(&self) -> bool {
        self.listing_error.is_none() && self.outcomes.iter().all(|c| c.outcome.is_success())
    }

    /// Total messages archived across the guild
    pub fn archived(&self) -> usize {
        self.outcomes.iter().map(|c| c.outcome.archived()).sum()
    }

    /// Channels whose run failed
    pub fn failed_channels(&self) -> Vec<&ChannelId> {
        self.outcomes
            .iter()
            .filter(|c| !c.outcome.is_success())
            .map(|c| &c.channel)
            .collect()
    }
}

/// Runs the engine across a guild
pub struct GuildSweepCoordinator<P, S> {
    engine: Arc<PinOverflowEngine<P, S>>,
}

impl<P, S> Clone for GuildSweepCoordinator<P, S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<P: ChatPlatform, S: DocumentStore> GuildSweepCoordinator<P, S> {
    /// Create a coordinator around a shared engine
    pub fn new(engine: Arc<PinOverflowEngine<P, S>>) -> Self {
        Self { engine }
    }

    /// The shared engine
    pub fn engine(&self) -> &Arc<PinOverflowEngine<P, S>> {
        &self.engine
    }

    /// Sweep every text channel of the guild
    pub async fn sweep(&self, guild: &GuildId) -> SweepReport {
        match self.engine.platform().list_text_channels(guild).await {
            Ok(channels) => self.sweep_channels(guild, &channels).await,
            Err(e) => {
                tracing::warn!(guild = %guild, "could not list channels for sweep: {}", e);
                self.engine.record_sweep();
                SweepReport {
                    guild: guild.clone(),
                    outcomes: Vec::new(),
                    listing_error: Some(e),
                }
            }
        }
    }

    /// Sweep the given channels of the guild concurrently
    pub async fn sweep_channels(&self, guild: &GuildId, channels: &[ChannelId]) -> SweepReport {
        tracing::info!(guild = %guild, channels = channels.len(), "starting guild sweep");

        let runs = channels
            .iter()
            .map(|channel| self.engine.run_for_channel(guild, channel));
        let outcomes: Vec<ChannelOutcome> = join_all(runs)
            .await
            .into_iter()
            .zip(channels)
            .map(|(outcome, channel)| ChannelOutcome {
                channel: channel.clone(),
                outcome,
            })
            .collect();

        self.engine.record_sweep();
        let report = SweepReport {
            guild: guild.clone(),
            outcomes,
            listing_error: None,
        };

        tracing::info!(
            guild = %guild,
            archived = report.archived(),
            failed = report.failed_channels().len(),
            "guild sweep finished"
        );
        report
    }
}
