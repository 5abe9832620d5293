//! Type aliases for shared-state types.
//!
//! ```rust,ignore
//! use duetkit_core::types::*;
//!
//! // Instead of: Arc<RwLock<HashMap<String, Arc<dyn SessionListener>>>>
//! let listeners: ThreadSafeRwMap<String, Arc<dyn SessionListener>> = thread_safe_rw_map();
//! ```

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A thread-safe reader-writer hash map.
///
/// Backed by `parking_lot::RwLock`; never hold a guard across an `.await`.
pub type ThreadSafeRwMap<K, V> = Arc<RwLock<HashMap<K, V>>>;

/// Create an empty `Arc<RwLock<HashMap>>`
pub fn thread_safe_rw_map<K, V>() -> ThreadSafeRwMap<K, V> {
    Arc::new(RwLock::new(HashMap::new()))
}
