//! Per-debate run locks.
//!
//! Each debate runs at most one orchestrator task at a time. The lock
//! is advisory and non-blocking: a second starter observes
//! "already running" and returns immediately instead of queueing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Sharded lock map keyed by debate ID, with eviction of idle entries.
#[derive(Default)]
pub struct DebateLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl DebateLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the run lock for a debate.
    ///
    /// Returns the permit on success (hold it for the lifetime of the
    /// run task; it releases on drop), or `None` when a run is already
    /// in flight.
    pub fn try_acquire(&self, debate_id: &str) -> Option<OwnedSemaphorePermit> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(debate_id.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        sem.try_acquire_owned().ok()
    }

    /// Whether a run currently holds the lock for this debate.
    pub fn is_running(&self, debate_id: &str) -> bool {
        self.locks
            .lock()
            .get(debate_id)
            .map(|sem| sem.available_permits() == 0)
            .unwrap_or(false)
    }

    /// Number of tracked debates (for monitoring).
    pub fn tracked(&self) -> usize {
        self.locks.lock().len()
    }

    /// Evict entries whose lock is not currently held.
    pub fn prune_idle(&self) {
        self.locks
            .lock()
            .retain(|_, sem| sem.available_permits() == 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "db_AAAAAAAAAAAAAAAA";

    #[test]
    fn second_acquire_is_refused_until_release() {
        let map = DebateLockMap::new();

        let permit = map.try_acquire(ID).unwrap();
        assert!(map.is_running(ID));
        assert!(map.try_acquire(ID).is_none());

        drop(permit);
        assert!(!map.is_running(ID));
        assert!(map.try_acquire(ID).is_some());
    }

    #[test]
    fn debates_lock_independently() {
        let map = DebateLockMap::new();
        let _a = map.try_acquire(ID).unwrap();
        assert!(map.try_acquire("db_BBBBBBBBBBBBBBBB").is_some());
    }

    #[test]
    fn prune_evicts_only_idle_entries() {
        let map = DebateLockMap::new();
        let held = map.try_acquire(ID).unwrap();
        let released = map.try_acquire("db_BBBBBBBBBBBBBBBB").unwrap();
        drop(released);

        assert_eq!(map.tracked(), 2);
        map.prune_idle();
        assert_eq!(map.tracked(), 1);
        assert!(map.is_running(ID));
        drop(held);
    }
}
