//! Session listener interface
//!
//! Defines the listener trait for printer session events

use crate::data::{HeaterId, HeatingProgressState, PrinterStatus};
use async_trait::async_trait;

/// Handle for a registered session listener.
///
/// Uniquely identifies a listener subscription. Can be used to unsubscribe
/// from session events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionListenerHandle(pub String);

/// Listener trait for session events
///
/// Implement this trait to receive notifications of printer state changes
#[async_trait]
pub trait SessionListener: Send + Sync {
    /// Called when a new status snapshot has been applied
    async fn on_status_changed(&self, _status: &PrinterStatus) {}

    /// Called when a heater changes its derived heating state
    async fn on_heating_changed(&self, _heater: HeaterId, _state: HeatingProgressState) {}

    /// Called when a poll fails
    async fn on_poll_failed(&self, _message: &str) {}

    /// Called when a command is acknowledged
    async fn on_command_complete(&self, _operation: &str) {}
}
