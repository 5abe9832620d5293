//! Event system for printer sessions
//!
//! Provides:
//! - Event types for status, heating and command outcomes
//! - Event dispatcher for publishing events to subscribers

use crate::data::{FileInfo, HeaterId, HeatingProgressState, PrinterStatus};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Session event types
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A poll result was applied to the cache
    StatusUpdated {
        /// Dispatch sequence of the applied poll
        sequence: u64,
        /// The new snapshot
        status: Arc<PrinterStatus>,
    },
    /// A poll failed; the cached status was kept
    PollFailed(String),
    /// A scheduled poll was skipped because another was still in flight
    PollSkipped,
    /// A result arrived after a newer one had been applied and was dropped
    StaleResultDiscarded {
        /// Dispatch sequence of the dropped result
        sequence: u64,
    },
    /// A heater changed its derived heating state
    HeatingChanged {
        /// The heater
        heater: HeaterId,
        /// Its new state
        state: HeatingProgressState,
    },
    /// A command was acknowledged
    CommandCompleted {
        /// Operation name
        operation: String,
        /// Dispatch sequence
        sequence: u64,
    },
    /// A command failed
    CommandFailed {
        /// Operation name
        operation: String,
        /// Failure description
        error: String,
    },
    /// Power-off was probably applied but its acknowledgement never arrived
    ConfirmationLost,
    /// Info for the file being printed was refreshed
    FileInfoUpdated(Arc<FileInfo>),
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::StatusUpdated { sequence, status } => {
                write!(f, "Status #{}: {}", sequence, status)
            }
            SessionEvent::PollFailed(msg) => write!(f, "Poll failed: {}", msg),
            SessionEvent::PollSkipped => write!(f, "Poll skipped"),
            SessionEvent::StaleResultDiscarded { sequence } => {
                write!(f, "Discarded stale result #{}", sequence)
            }
            SessionEvent::HeatingChanged { heater, state } => {
                write!(f, "Heating {}: {}", heater, state)
            }
            SessionEvent::CommandCompleted {
                operation,
                sequence,
            } => write!(f, "Command #{} complete: {}", sequence, operation),
            SessionEvent::CommandFailed { operation, error } => {
                write!(f, "Command {} failed: {}", operation, error)
            }
            SessionEvent::ConfirmationLost => write!(f, "Power-off confirmation lost"),
            SessionEvent::FileInfoUpdated(info) => write!(f, "File info: {}", info.path),
        }
    }
}

/// Event dispatcher for publishing events to subscribers
#[derive(Clone)]
pub struct EventDispatcher {
    /// Broadcast sender channel for session events.
    tx: broadcast::Sender<SessionEvent>,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    ///
    /// # Arguments
    /// * `buffer_size` - Size of the broadcast buffer (default 100)
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size);
        Self { tx }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of subscribers reached; zero when nobody listens.
    pub fn publish(&self, event: SessionEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let dispatcher = EventDispatcher::default();
        assert_eq!(dispatcher.publish(SessionEvent::PollSkipped), 0);

        let mut rx = dispatcher.subscribe();
        assert_eq!(dispatcher.subscriber_count(), 1);
        assert_eq!(dispatcher.publish(SessionEvent::ConfirmationLost), 1);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::ConfirmationLost));
    }
}
