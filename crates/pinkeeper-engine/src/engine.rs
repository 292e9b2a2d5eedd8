//! Pin overflow engine: one archival run per trigger
//!
//! A run moves through `Idle -> Locked -> Resolving -> Draining -> Unlocked`.
//! Lock contention short-circuits to a successful no-op. Configuration is
//! resolved once per run. The drain evicts the oldest pin first, one message at
//! a time, and halts at the first message that cannot be archived.

use crate::archiver::MessageArchiver;
use crate::lock::{ChannelLease, ChannelLockRegistry};
use crate::resolver::ConfigResolver;
use crate::{EngineConfig, EngineError, EngineMetrics, RunError};
use pinkeeper_domain::{ChannelId, ChatPlatform, DocumentStore, GuildId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// How an archival run ended
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The channel is at or under its threshold
    Done {
        /// Messages archived during this run
        archived: usize,
        /// Pins left in the channel
        remaining: usize,
    },

    /// Another run owns the channel; nothing was done
    ///
    /// Reported as success, but it does not mean the overflow is resolved.
    Contended,

    /// The run stopped early
    Failed {
        /// Messages archived before the failure
        archived: usize,
        /// Why the run stopped
        error: RunError,
    },
}

impl RunOutcome {
    /// Success for user-facing reporting (`Done` or `Contended`)
    pub fn is_success(&self) -> bool {
        !matches!(self, RunOutcome::Failed { .. })
    }

    /// Messages archived by this run
    pub fn archived(&self) -> usize {
        match self {
            RunOutcome::Done { archived, .. } | RunOutcome::Failed { archived, .. } => *archived,
            RunOutcome::Contended => 0,
        }
    }

    /// The failure, if the run failed
    pub fn error(&self) -> Option<&RunError> {
        match self {
            RunOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Orchestrates config resolution, locking and the drain loop
///
/// # Examples
///
/// ```no_run
/// use pinkeeper_domain::{ChannelId, GuildId};
/// use pinkeeper_engine::{EngineConfig, InMemoryChannelLocks, PinOverflowEngine};
/// # use std::sync::Arc;
/// # async fn demo<P, S>(platform: Arc<P>, store: Arc<S>) -> Result<(), Box<dyn std::error::Error>>
/// # where P: pinkeeper_domain::ChatPlatform, S: pinkeeper_domain::DocumentStore {
/// let engine = PinOverflowEngine::new(
///     platform,
///     store,
///     Arc::new(InMemoryChannelLocks::new()),
///     EngineConfig::default(),
/// )?;
///
/// let outcome = engine
///     .run_for_channel(&GuildId::from("1"), &ChannelId::from("2"))
///     .await;
/// println!("success: {}", outcome.is_success());
/// # Ok(())
/// # }
/// ```
pub struct PinOverflowEngine<P, S> {
    platform: Arc<P>,
    resolver: ConfigResolver<S>,
    archiver: MessageArchiver<P>,
    locks: Arc<dyn ChannelLockRegistry>,
    config: EngineConfig,
    metrics: Mutex<EngineMetrics>,
}

impl<P: ChatPlatform, S: DocumentStore> PinOverflowEngine<P, S> {
    /// Create an engine; fails if the configuration is invalid
    pub fn new(
        platform: Arc<P>,
        store: Arc<S>,
        locks: Arc<dyn ChannelLockRegistry>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            resolver: ConfigResolver::new(store, config.default_max_pins, config.max_pins_cap),
            archiver: MessageArchiver::new(Arc::clone(&platform), config.max_content_chars),
            platform,
            locks,
            config,
            metrics: Mutex::new(EngineMetrics::new()),
        })
    }

    /// The platform client
    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    /// The config resolver (also used for command handling)
    pub fn resolver(&self) -> &ConfigResolver<S> {
        &self.resolver
    }

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn metrics_mut(&self) -> MutexGuard<'_, EngineMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the metrics counters
    pub fn metrics(&self) -> EngineMetrics {
        self.metrics_mut().clone()
    }

    /// Reset the metrics counters
    pub fn reset_metrics(&self) {
        self.metrics_mut().reset();
    }

    pub(crate) fn record_sweep(&self) {
        self.metrics_mut().record_sweep();
    }

    /// Bring a channel back under its pin threshold
    ///
    /// `guild` is the channel's guild, used for guild-level settings.
    pub async fn run_for_channel(&self, guild: &GuildId, channel: &ChannelId) -> RunOutcome {
        let Some(_lease) = ChannelLease::acquire(self.locks.as_ref(), channel) else {
            tracing::info!(channel = %channel, "channel is locked by another run, skipping");
            self.metrics_mut().record_contended();
            return RunOutcome::Contended;
        };

        let outcome = self.drain(guild, channel).await;

        match &outcome {
            RunOutcome::Done {
                archived,
                remaining,
            } => {
                if *archived > 0 {
                    tracing::info!(
                        channel = %channel,
                        archived,
                        remaining,
                        "pin overflow drained"
                    );
                } else {
                    tracing::debug!(channel = %channel, remaining, "channel within pin limit");
                }
                let delivered = if self.config.dry_run { 0 } else { *archived };
                self.metrics_mut().record_completed(delivered);
            }
            RunOutcome::Failed { archived, error } => {
                tracing::warn!(channel = %channel, archived, "archival run failed: {}", error);
                self.metrics_mut().record_failed(*archived);
            }
            RunOutcome::Contended => {}
        }

        outcome
    }

    async fn drain(&self, guild: &GuildId, channel: &ChannelId) -> RunOutcome {
        let effective = self.resolver.resolve(channel, guild).await;

        let Some(pinboard) = effective.pinboard else {
            return failed(0, RunError::ConfigurationMissing);
        };

        match self.platform.channel_exists(guild, &pinboard).await {
            Ok(true) => {}
            Ok(false) => return failed(0, RunError::UnresolvableReference(pinboard)),
            Err(e) if e.is_not_found() => {
                return failed(0, RunError::UnresolvableReference(pinboard))
            }
            Err(e) => return failed(0, RunError::PinboardLookup(e)),
        }

        // Oldest pin is last
        let mut pinned = match self.platform.fetch_pinned_messages(channel).await {
            Ok(pinned) => pinned,
            Err(e) => return failed(0, RunError::PinFetch(e)),
        };

        let limit = effective.max_pins as usize;
        let mut archived = 0;

        while pinned.len() > limit {
            let Some(oldest) = pinned.last() else {
                break;
            };

            if self.config.dry_run {
                tracing::info!(
                    channel = %channel,
                    message = %oldest.id,
                    pinboard = %pinboard,
                    "DRY RUN: would archive and unpin message"
                );
            } else if let Err(source) = self.archiver.archive(oldest, &pinboard).await {
                return failed(
                    archived,
                    RunError::Archive {
                        message: oldest.id.clone(),
                        source,
                    },
                );
            }

            pinned.pop();
            archived += 1;
        }

        RunOutcome::Done {
            archived,
            remaining: pinned.len(),
        }
    }
}

fn failed(archived: usize, error: RunError) -> RunOutcome {
    RunOutcome::Failed { archived, error }
}
