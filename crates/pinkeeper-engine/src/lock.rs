//! Per-channel mutual exclusion for archival runs
//!
//! At most one run may drain a given channel at any instant. A registry records
//! the channels currently being processed; [`ChannelLease`] ties a successful
//! acquisition to a scope and releases it on drop, so every exit path of a run
//! (normal completion, early return, panic unwinding) gives the channel back.

use pinkeeper_domain::ChannelId;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Membership set of channels with a run in flight
///
/// `try_acquire` must be atomic with respect to itself: two concurrent calls for
/// the same channel never both return `true`.
pub trait ChannelLockRegistry: Send + Sync {
    /// Claim the channel; `false` means a run already owns it
    fn try_acquire(&self, channel: &ChannelId) -> bool;

    /// Give the channel back
    fn release(&self, channel: &ChannelId);
}

/// Mutex-guarded in-process registry
#[derive(Debug, Default)]
pub struct InMemoryChannelLocks {
    locked: Mutex<HashSet<ChannelId>>,
}

impl InMemoryChannelLocks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self) -> MutexGuard<'_, HashSet<ChannelId>> {
        // The set stays consistent even if a holder panicked mid-run
        self.locked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a run currently owns the channel
    pub fn is_locked(&self, channel: &ChannelId) -> bool {
        self.set().contains(channel)
    }

    /// Number of channels currently locked
    pub fn active_count(&self) -> usize {
        self.set().len()
    }
}

impl ChannelLockRegistry for InMemoryChannelLocks {
    fn try_acquire(&self, channel: &ChannelId) -> bool {
        self.set().insert(channel.clone())
    }

    fn release(&self, channel: &ChannelId) {
        self.set().remove(channel);
    }
}

/// Scoped ownership of one channel
///
/// Released exactly once, when dropped.
pub struct ChannelLease<'a> {
    registry: &'a dyn ChannelLockRegistry,
    channel: ChannelId,
}

impl<'a> ChannelLease<'a> {
    /// Acquire the channel, or `None` if another run holds it
    pub fn acquire(registry: &'a dyn ChannelLockRegistry, channel: &ChannelId) -> Option<Self> {
        if registry.try_acquire(channel) {
            Some(Self {
                registry,
                channel: channel.clone(),
            })
        } else {
            None
        }
    }

    /// The leased channel
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }
}

impl Drop for ChannelLease<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_second_acquire_fails() {
        let locks = InMemoryChannelLocks::new();
        let channel = ChannelId::from("1");

        assert!(locks.try_acquire(&channel));
        assert!(!locks.try_acquire(&channel));
        assert!(locks.try_acquire(&ChannelId::from("2")));
        assert_eq!(locks.active_count(), 2);
    }

    #[test]
    fn test_release_allows_reacquire() {
        let locks = InMemoryChannelLocks::new();
        let channel = ChannelId::from("1");

        assert!(locks.try_acquire(&channel));
        locks.release(&channel);
        assert!(!locks.is_locked(&channel));
        assert!(locks.try_acquire(&channel));
    }

    #[test]
    fn test_release_only_affects_one_channel() {
        let locks = InMemoryChannelLocks::new();
        let a = ChannelId::from("a");
        let b = ChannelId::from("b");
        locks.try_acquire(&a);
        locks.try_acquire(&b);

        locks.release(&a);

        assert!(!locks.is_locked(&a));
        assert!(locks.is_locked(&b));
    }

    #[test]
    fn test_lease_releases_on_drop() {
        let locks = InMemoryChannelLocks::new();
        let channel = ChannelId::from("1");

        {
            let lease = ChannelLease::acquire(&locks, &channel).expect("first lease");
            assert_eq!(lease.channel(), &channel);
            assert!(ChannelLease::acquire(&locks, &channel).is_none());
        }

        assert!(!locks.is_locked(&channel));
        assert!(ChannelLease::acquire(&locks, &channel).is_some());
    }

    #[test]
    fn test_lease_releases_on_early_return() {
        fn work(locks: &InMemoryChannelLocks, channel: &ChannelId) -> Result<(), ()> {
            let _lease = ChannelLease::acquire(locks, channel).ok_or(())?;
            Err(())
        }

        let locks = InMemoryChannelLocks::new();
        let channel = ChannelId::from("1");
        assert!(work(&locks, &channel).is_err());
        assert_eq!(locks.active_count(), 0);
    }

    #[test]
    fn test_lease_releases_on_panic() {
        let locks = InMemoryChannelLocks::new();
        let channel = ChannelId::from("1");

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _lease = ChannelLease::acquire(&locks, &channel).expect("lease");
            panic!("run blew up");
        }));

        assert!(result.is_err());
        assert!(!locks.is_locked(&channel));
    }

    #[test]
    fn test_failed_acquire_does_not_release() {
        struct Counting {
            inner: InMemoryChannelLocks,
            releases: AtomicUsize,
        }
        impl ChannelLockRegistry for Counting {
            fn try_acquire(&self, channel: &ChannelId) -> bool {
                self.inner.try_acquire(channel)
            }
            fn release(&self, channel: &ChannelId) {
                self.releases.fetch_add(1, Ordering::SeqCst);
                self.inner.release(channel);
            }
        }

        let locks = Counting {
            inner: InMemoryChannelLocks::new(),
            releases: AtomicUsize::new(0),
        };
        let channel = ChannelId::from("1");
        let held = ChannelLease::acquire(&locks, &channel).expect("lease");
        assert!(ChannelLease::acquire(&locks, &channel).is_none());
        drop(held);

        assert_eq!(locks.releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_acquire_single_winner() {
        let locks = Arc::new(InMemoryChannelLocks::new());
        let channel = ChannelId::from("contended");
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let channel = channel.clone();
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    if locks.try_acquire(&channel) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
