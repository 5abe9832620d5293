//! Dispatch-order sequencing for snapshot caches
//!
//! Every round trip gets a sequence number when it is dispatched, not when
//! it completes. A snapshot only replaces the cache when its sequence is
//! newer than the cached one and newer than the last acknowledged mutation,
//! so completions arriving out of order never roll the cache back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic dispatch counter
#[derive(Debug, Default)]
pub struct Sequencer {
    last: AtomicU64,
}

impl Sequencer {
    /// Create a counter; the first dispatch gets sequence 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next sequence number
    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Most recently assigned sequence number, 0 if none
    pub fn current(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

/// Result of offering a snapshot to a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// The snapshot replaced the cached one
    Applied,
    /// A newer snapshot or mutation was already recorded
    Stale,
}

/// Latest-wins snapshot cache keyed by dispatch sequence
#[derive(Debug)]
pub struct SnapshotCache<T> {
    value: Option<Arc<T>>,
    sequence: u64,
}

impl<T> SnapshotCache<T> {
    /// Empty cache
    pub fn new() -> Self {
        Self {
            value: None,
            sequence: 0,
        }
    }

    /// Offer a snapshot dispatched at `sequence`
    ///
    /// Applied only when `sequence` is greater than both the cached
    /// snapshot's sequence and `floor` (the newest acknowledged mutation).
    pub fn offer(&mut self, sequence: u64, floor: u64, value: Arc<T>) -> Offer {
        if sequence <= self.sequence || sequence <= floor {
            return Offer::Stale;
        }
        self.value = Some(value);
        self.sequence = sequence;
        Offer::Applied
    }

    /// Drop the cached value; later offers still need a newer sequence
    pub fn clear(&mut self) {
        self.value = None;
    }

    /// Cached snapshot
    pub fn get(&self) -> Option<Arc<T>> {
        self.value.clone()
    }

    /// True when a snapshot is cached
    pub fn is_some(&self) -> bool {
        self.value.is_some()
    }

    /// Sequence of the last applied snapshot, 0 if none
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl<T> Default for SnapshotCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
