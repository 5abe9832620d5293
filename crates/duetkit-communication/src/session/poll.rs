//! Status polling and the auto-update schedule

use super::sequence::Offer;
use super::{Inner, PollFailure, PrinterSession};
use crate::firmware::duet::{command_creator, parse_file_info, parse_status};
use chrono::Utc;
use duetkit_core::{Error, FileInfo, PrinterStatus, Result, SessionEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Marks a poll as in flight until dropped
///
/// Dropping a poll future mid-flight releases the marker too, so an
/// abandoned poll never blocks the schedule.
pub(super) struct PollGuard {
    counter: Arc<AtomicUsize>,
}

impl PollGuard {
    /// Enter unconditionally (on-demand polls)
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter: Arc::clone(counter),
        }
    }

    /// Enter only if no other poll is in flight (scheduled polls)
    fn try_enter_exclusive(counter: &Arc<AtomicUsize>) -> Option<Self> {
        counter
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                counter: Arc::clone(counter),
            })
    }
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Spawn the periodic poll loop
///
/// Each tick starts a poll unless one is still in flight, in which case the
/// tick is skipped rather than queued.
pub(super) fn spawn_poll_loop(inner: &Arc<Inner>, runtime: &Handle) -> JoinHandle<()> {
    let weak = Arc::downgrade(inner);
    let period = inner.config.connection.poll_interval();

    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            let session = PrinterSession { inner };

            match PollGuard::try_enter_exclusive(&session.inner.polls_in_flight) {
                Some(guard) => {
                    tokio::spawn(async move {
                        session.scheduled_poll(guard).await;
                    });
                }
                None => {
                    tracing::debug!("Previous poll still in flight, skipping tick");
                    session.publish(SessionEvent::PollSkipped);
                }
            }
        }
        tracing::trace!("Poll loop stopped");
    })
}

impl PrinterSession {
    /// Number of polls currently in flight
    pub fn polls_in_flight(&self) -> usize {
        self.inner.polls_in_flight.load(Ordering::SeqCst)
    }

    /// Poll the printer once and return the decoded status
    ///
    /// The cache is updated only if no newer poll or acknowledged command
    /// was recorded meanwhile. On failure the cache is kept, the failure is
    /// recorded as the last poll failure and returned to the caller.
    pub async fn fetch_status(&self) -> Result<Arc<PrinterStatus>> {
        let _guard = PollGuard::enter(&self.inner.polls_in_flight);
        self.poll_once().await
    }

    /// Start an immediate poll without waiting for it
    ///
    /// The periodic schedule is not reset. The returned handle can be
    /// awaited to know when the poll finished.
    pub fn refresh_status(&self) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            // Failures are already recorded as the last poll failure.
            let _ = session.fetch_status().await;
        })
    }

    /// Fetch info for the file currently printing and cache it
    pub async fn fetch_current_file_info(&self) -> Result<Arc<FileInfo>> {
        let sequence = self.inner.sequencer.next();
        let payload = self.round_trip(command_creator::file_info(None)).await?;
        let info = Arc::new(parse_file_info(None, &payload)?);

        let offer = {
            let mut state = self.inner.state.write();
            let printing = state.status.get().map(|s| s.printing()).unwrap_or(true);
            if printing {
                state.file_info.offer(sequence, 0, Arc::clone(&info))
            } else {
                Offer::Stale
            }
        };

        if offer == Offer::Applied {
            tracing::debug!(path = %info.path, sequence, "Current file info updated");
            self.publish(SessionEvent::FileInfoUpdated(Arc::clone(&info)));
        }
        Ok(info)
    }

    async fn scheduled_poll(&self, _guard: PollGuard) {
        let Ok(status) = self.poll_once().await else {
            return;
        };
        if !status.printing() || self.current_file_info().is_some() {
            return;
        }
        if self.inner.file_info_in_flight.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = self.fetch_current_file_info().await {
            tracing::debug!(error = %err, "Could not fetch current file info");
        }
        self.inner.file_info_in_flight.store(false, Ordering::SeqCst);
    }

    async fn poll_once(&self) -> Result<Arc<PrinterStatus>> {
        let sequence = self.inner.sequencer.next();
        tracing::trace!(sequence, "Polling status");

        let decoded = match self.round_trip(command_creator::status()).await {
            Ok(payload) => parse_status(&payload).map_err(|err| {
                tracing::warn!(sequence, error = %err, "Status payload rejected");
                Error::from(err)
            }),
            Err(err) => Err(err),
        };

        match decoded {
            Ok(status) => {
                let status = Arc::new(status);
                self.apply_status(sequence, Arc::clone(&status));
                Ok(status)
            }
            Err(err) => {
                self.record_poll_failure(sequence, &err);
                Err(err)
            }
        }
    }

    /// Offer a decoded status to the cache
    pub(super) fn apply_status(&self, sequence: u64, status: Arc<PrinterStatus>) -> Offer {
        let (offer, heating_changes) = {
            let mut state = self.inner.state.write();
            let floor = state.mutation_sequence;
            match state.status.offer(sequence, floor, Arc::clone(&status)) {
                Offer::Stale => (Offer::Stale, Vec::new()),
                Offer::Applied => {
                    state.last_update = Some(Utc::now());
                    state.last_failure = None;
                    let changes = state.heating.update(&status);
                    state.awaiting_heaters.retain(|_, mark| *mark >= sequence);
                    if !status.printing() {
                        state.file_info.clear();
                    }
                    (Offer::Applied, changes)
                }
            }
        };

        if offer == Offer::Stale {
            tracing::debug!(sequence, "Discarding stale status");
            self.publish(SessionEvent::StaleResultDiscarded { sequence });
            return offer;
        }

        self.inner.confirmation_lost.store(false, Ordering::SeqCst);
        tracing::trace!(sequence, status = %status, "Status applied");
        self.publish(SessionEvent::StatusUpdated {
            sequence,
            status: Arc::clone(&status),
        });
        for (heater, heating) in &heating_changes {
            self.publish(SessionEvent::HeatingChanged {
                heater: *heater,
                state: *heating,
            });
        }

        for listener in self.listeners() {
            let status = Arc::clone(&status);
            let changes = heating_changes.clone();
            tokio::spawn(async move {
                listener.on_status_changed(&status).await;
                for (heater, heating) in changes {
                    listener.on_heating_changed(heater, heating).await;
                }
            });
        }
        offer
    }

    fn record_poll_failure(&self, sequence: u64, err: &Error) {
        tracing::warn!(sequence, error = %err, "Status poll failed");
        let message = err.to_string();
        self.inner.state.write().last_failure = Some(PollFailure {
            message: message.clone(),
            at: Utc::now(),
        });
        self.publish(SessionEvent::PollFailed(message.clone()));

        for listener in self.listeners() {
            let message = message.clone();
            tokio::spawn(async move {
                listener.on_poll_failed(&message).await;
            });
        }
    }
}
