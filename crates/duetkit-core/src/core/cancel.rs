//! Caller-initiated cancellation
//!
//! A `CancellationToken` is shared between the caller and an in-flight
//! operation. Cancelling is idempotent and visible to every clone.

use crate::error::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Token used to abandon an in-flight operation
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Create a token that is not yet cancelled
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Cancel every operation holding a clone of this token
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Check whether the token has been cancelled
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `future` until it completes or `token` is cancelled
///
/// On cancellation the future is dropped and `Error::Cancelled` returned.
pub async fn with_cancellation<F, T>(token: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if token.is_cancelled() {
        return Err(Error::Cancelled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::Cancelled),
        result = future => result,
    }
}
