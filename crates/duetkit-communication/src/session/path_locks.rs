//! Per-path serialization of structural file commands
//!
//! Commands touching the same path take turns; commands on disjoint paths
//! run concurrently. Lock entries are dropped once no command holds them.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Held while a structural command runs on a path
pub type PathGuard = OwnedMutexGuard<()>;

/// Table of async locks keyed by normalized path
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

/// Canonical lock key for a path
pub fn lock_key(path: &str) -> String {
    let trimmed = path.trim();
    let key = trimmed.trim_end_matches('/');
    if key.is_empty() {
        trimmed.to_string()
    } else {
        key.to_string()
    }
}

impl PathLocks {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        locks.retain(|_, lock| lock.strong_count() > 0);
        if let Some(lock) = locks.get(key).and_then(Weak::upgrade) {
            return lock;
        }
        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(key.to_string(), Arc::downgrade(&lock));
        lock
    }

    /// Wait for exclusive use of `path`
    pub async fn lock(&self, path: &str) -> PathGuard {
        self.entry(&lock_key(path)).lock_owned().await
    }

    /// Wait for exclusive use of several paths
    ///
    /// Locks are taken in sorted order so two multi-path commands can never
    /// deadlock each other; duplicates are locked once.
    pub async fn lock_all(&self, paths: &[&str]) -> Vec<PathGuard> {
        let mut keys: Vec<String> = paths.iter().map(|p| lock_key(p)).collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.entry(&key).lock_owned().await);
        }
        guards
    }

    /// Number of paths currently locked or awaited
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .values()
            .filter(|lock| lock.strong_count() > 0)
            .count()
    }
}
