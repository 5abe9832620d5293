//! Session plumbing shared across crates
//!
//! Events, listeners and cancellation.

pub mod cancel;
pub mod event;
pub mod listener;

pub use cancel::{with_cancellation, CancellationToken};
pub use event::{EventDispatcher, SessionEvent};
pub use listener::{SessionListener, SessionListenerHandle};
