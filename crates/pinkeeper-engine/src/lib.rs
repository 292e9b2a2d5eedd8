//! Pinkeeper Engine
//!
//! The pin-overflow archival engine: decides, for a channel, which pinned
//! messages must move to the pinboard, moves them oldest first, and serializes
//! concurrent triggers on the same channel.
//!
//! # Overview
//!
//! - **ConfigResolver**: effective pinboard and threshold (channel > guild > default)
//! - **ChannelLockRegistry**: at most one run per channel at any instant
//! - **MessageArchiver**: provenance-stamped copy, delivered before the unpin
//! - **PinOverflowEngine**: lock, resolve, drain, release
//! - **GuildSweepCoordinator**: concurrent fan-out over a guild's text channels
//! - **SweepWorker**: optional periodic sweeps
//!
//! # Failure model
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | No pinboard configured | `Failed(ConfigurationMissing)`, no pin mutations |
//! | Stored pinboard gone | `Failed(UnresolvableReference)` |
//! | Delivery rejected | `Failed(Archive)`, drain halts, message stays pinned |
//! | Channel already locked | `Contended`, reported as success |
//!
//! Nothing here retries; the next pin notification or sweep is the retry, which
//! is safe because a compliant channel is a no-op.
//!
//! # Configuration
//!
//! ```toml
//! [engine]
//! default_max_pins = 40
//! max_pins_cap = 49
//! max_content_chars = 2000
//! sweep_interval_minutes = 0
//! dry_run = false
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod metrics;

pub mod archiver;
pub mod engine;
pub mod lock;
pub mod resolver;
pub mod sweep;
pub mod worker;

pub use archiver::{ArchiveReceipt, MessageArchiver};
pub use config::{EngineConfig, PLATFORM_MAX_CONTENT_CHARS};
pub use engine::{PinOverflowEngine, RunOutcome};
pub use error::{ArchiveError, EngineError, RunError};
pub use lock::{ChannelLease, ChannelLockRegistry, InMemoryChannelLocks};
pub use metrics::EngineMetrics;
pub use resolver::ConfigResolver;
pub use sweep::{ChannelOutcome, GuildSweepCoordinator, SweepReport};
pub use worker::SweepWorker;
