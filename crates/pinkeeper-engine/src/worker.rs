//! Background worker for periodic guild sweeps
//!
//! Pin notifications can be missed while the bot is offline; the worker sweeps
//! a fixed list of guilds on an interval so overflow is eventually drained.

use crate::sweep::GuildSweepCoordinator;
use pinkeeper_domain::{ChatPlatform, DocumentStore, GuildId};
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Sweeps configured guilds on a schedule
pub struct SweepWorker<P, S> {
    coordinator: GuildSweepCoordinator<P, S>,
    guilds: Vec<GuildId>,
    interval: Duration,
}

impl<P: ChatPlatform, S: DocumentStore> SweepWorker<P, S> {
    /// Create a worker over the given guilds
    pub fn new(
        coordinator: GuildSweepCoordinator<P, S>,
        guilds: Vec<GuildId>,
        interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            guilds,
            interval,
        }
    }

    /// Run until a shutdown signal (Ctrl+C) is received
    pub async fn run(&self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            guilds = self.guilds.len(),
            "Sweep worker started (interval: {:?})",
            self.interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_all().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping sweep worker");
                    break;
                }
            }
        }

        let metrics = self.coordinator.engine().metrics();
        tracing::info!("Sweep worker stopped. Final metrics:\n{}", metrics.summary());
    }

    /// Run for a specific number of cycles (useful for testing)
    ///
    /// Returns how many guild sweeps failed in total.
    pub async fn run_cycles(&self, cycles: usize) -> usize {
        let mut ticker = interval(self.interval);
        let mut failures = 0;

        for cycle in 0..cycles {
            ticker.tick().await;
            tracing::debug!("Starting sweep cycle {}/{}", cycle + 1, cycles);
            failures += self.sweep_all().await;
        }

        failures
    }

    async fn sweep_all(&self) -> usize {
        let mut failures = 0;
        for guild in &self.guilds {
            let report = self.coordinator.sweep(guild).await;
            if !report.is_success() {
                failures += 1;
                tracing::warn!(
                    guild = %guild,
                    failed_channels = report.failed_channels().len(),
                    "periodic sweep reported failures"
                );
            }
        }
        failures
    }
}
