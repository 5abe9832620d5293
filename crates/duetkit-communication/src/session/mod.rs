//! Printer session
//!
//! The session is the single point of truth for one printer. It owns the
//! cached status snapshot, schedules periodic polls, dispatches commands,
//! and reconciles poll results with acknowledged commands through
//! dispatch-order sequence numbers.
//!
//! `PrinterSession` is a cheap handle; clones share the same session. The
//! poll loop only holds a weak reference, so dropping the last handle
//! stops polling.

mod commands;
mod files;
pub mod path_locks;
mod poll;
pub mod sequence;
pub mod validate;

pub use commands::{AtxPowerOutcome, ClearFaultOutcome};
pub use path_locks::{PathGuard, PathLocks};
pub use sequence::{Offer, Sequencer, SnapshotCache};

use crate::firmware::duet::Request;
use crate::heating::HeatingTracker;
use crate::transfer::FileTransferCoordinator;
use crate::transport::{send_with_deadline, Payload, Transport};
use chrono::{DateTime, Utc};
use duetkit_core::{
    thread_safe_rw_map, EventDispatcher, FileInfo, HeaterId, HeatingProgressState,
    PendingHeaters, PrinterStatus, Result, SessionEvent, SessionListener, SessionListenerHandle,
    ThreadSafeRwMap,
};
use duetkit_settings::Config;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// The most recent failed poll
#[derive(Debug, Clone, PartialEq)]
pub struct PollFailure {
    /// Failure description
    pub message: String,
    /// When the failure was recorded
    pub at: DateTime<Utc>,
}

/// Mutable session state, written by one poll or command at a time
struct SessionState {
    status: SnapshotCache<PrinterStatus>,
    /// Highest dispatch sequence of an acknowledged state-changing command
    mutation_sequence: u64,
    heating: HeatingTracker,
    /// Heaters with an acknowledged target, keyed by the last sequence
    /// dispatched before the acknowledgement
    awaiting_heaters: HashMap<HeaterId, u64>,
    last_update: Option<DateTime<Utc>>,
    last_failure: Option<PollFailure>,
    file_info: SnapshotCache<FileInfo>,
}

pub(crate) struct Inner {
    config: Config,
    transport: Arc<dyn Transport>,
    sequencer: Sequencer,
    state: RwLock<SessionState>,
    polls_in_flight: Arc<AtomicUsize>,
    file_info_in_flight: AtomicBool,
    path_locks: Arc<PathLocks>,
    events: EventDispatcher,
    listeners: ThreadSafeRwMap<String, Arc<dyn SessionListener>>,
    simulation_mode: AtomicBool,
    adjusted_filament_diameter: Mutex<f64>,
    confirmation_lost: AtomicBool,
    /// Auto-update was asked for; the loop starts once a runtime is available
    auto_update: AtomicBool,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.poll_task.get_mut().take() {
            task.abort();
        }
    }
}

/// Client session for one networked printer
#[derive(Clone)]
pub struct PrinterSession {
    inner: Arc<Inner>,
}

impl fmt::Debug for PrinterSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrinterSession")
            .field("hostname", &self.inner.config.connection.hostname)
            .field("port", &self.inner.config.connection.port)
            .field("auto_update", &self.is_auto_updating())
            .finish()
    }
}

impl PrinterSession {
    /// Open a session for `hostname:port`
    ///
    /// Nothing is sent until the first poll or command, so an unreachable
    /// printer only shows up as a transport failure later. With
    /// `auto_update` the poll loop starts immediately when called inside a
    /// tokio runtime, otherwise on the session's first round trip.
    pub fn open(
        hostname: &str,
        port: u16,
        auto_update: bool,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        validate::validate_endpoint(hostname, port)?;
        Self::with_config(Config::for_endpoint(hostname, port, auto_update), transport)
    }

    /// Open a session from a full configuration
    pub fn with_config(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        validate::validate_endpoint(&config.connection.hostname, config.connection.port)?;
        config.validate()?;

        let state = SessionState {
            status: SnapshotCache::new(),
            mutation_sequence: 0,
            heating: HeatingTracker::from_settings(&config.heating),
            awaiting_heaters: HashMap::new(),
            last_update: None,
            last_failure: None,
            file_info: SnapshotCache::new(),
        };
        let nominal = config.filament.nominal_diameter;
        let auto_update = config.connection.auto_update;

        let session = Self {
            inner: Arc::new(Inner {
                config,
                transport,
                sequencer: Sequencer::new(),
                state: RwLock::new(state),
                polls_in_flight: Arc::new(AtomicUsize::new(0)),
                file_info_in_flight: AtomicBool::new(false),
                path_locks: Arc::new(PathLocks::new()),
                events: EventDispatcher::default(),
                listeners: thread_safe_rw_map(),
                simulation_mode: AtomicBool::new(false),
                adjusted_filament_diameter: Mutex::new(nominal),
                confirmation_lost: AtomicBool::new(false),
                auto_update: AtomicBool::new(false),
                poll_task: Mutex::new(None),
            }),
        };

        tracing::info!(
            hostname = %session.hostname(),
            port = session.port(),
            auto_update,
            "Opened printer session"
        );

        if auto_update {
            session.set_auto_update(true);
        }
        Ok(session)
    }

    /// Printer hostname
    pub fn hostname(&self) -> &str {
        &self.inner.config.connection.hostname
    }

    /// Printer port
    pub fn port(&self) -> u16 {
        self.inner.config.connection.port
    }

    /// Session configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Printer name from the latest status, falling back to the hostname
    pub fn name(&self) -> String {
        self.status()
            .and_then(|status| status.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.hostname().to_string())
    }

    /// Latest applied status snapshot
    pub fn status(&self) -> Option<Arc<PrinterStatus>> {
        self.inner.state.read().status.get()
    }

    /// Dispatch sequence of the latest applied status, 0 if none
    pub fn status_sequence(&self) -> u64 {
        self.inner.state.read().status.sequence()
    }

    /// When a poll result was last applied
    pub fn last_successful_update(&self) -> Option<DateTime<Utc>> {
        self.inner.state.read().last_update
    }

    /// The most recent poll failure, cleared by the next applied poll
    pub fn last_poll_failure(&self) -> Option<PollFailure> {
        self.inner.state.read().last_failure.clone()
    }

    /// Info for the file currently printing, when known
    pub fn current_file_info(&self) -> Option<Arc<FileInfo>> {
        self.inner.state.read().file_info.get()
    }

    /// Derived heating state of a heater
    pub fn heating_state(&self, heater: HeaterId) -> HeatingProgressState {
        self.inner.state.read().heating.state(heater)
    }

    /// Heating state of the bed
    pub fn bed_heater_state(&self) -> HeatingProgressState {
        self.heating_state(HeaterId::Bed)
    }

    /// Heating state of the primary hotend
    pub fn hotend_heater_state(&self) -> HeatingProgressState {
        self.heating_state(HeaterId::PRIMARY_HOTEND)
    }

    /// Completion fraction of a heater's current transition
    pub fn heating_fraction(&self, heater: HeaterId) -> f64 {
        self.inner.state.read().heating.fraction(heater)
    }

    /// Completion fraction of the bed's current transition
    pub fn fraction_of_bed_heater_progress(&self) -> f64 {
        self.heating_fraction(HeaterId::Bed)
    }

    /// Completion fraction of the primary hotend's current transition
    pub fn fraction_of_hotend_heater_progress(&self) -> f64 {
        self.heating_fraction(HeaterId::PRIMARY_HOTEND)
    }

    /// Heaters warming, cooling, or waiting for a status that reflects a
    /// newly acknowledged target
    pub fn pending_heaters(&self) -> PendingHeaters {
        let state = self.inner.state.read();
        let mut pending = state.heating.transitioning();
        pending.extend(state.awaiting_heaters.keys().copied());
        pending
    }

    /// True after a power-off whose acknowledgement was lost, until the
    /// next status is applied
    pub fn confirmation_lost(&self) -> bool {
        self.inner.confirmation_lost.load(Ordering::SeqCst)
    }

    /// Whether print commands start a simulation instead of a real print
    pub fn simulation_mode(&self) -> bool {
        self.inner.simulation_mode.load(Ordering::SeqCst)
    }

    /// Make subsequent print commands simulate (or really print)
    pub fn set_simulation_mode(&self, simulate: bool) {
        self.inner.simulation_mode.store(simulate, Ordering::SeqCst);
        tracing::debug!(simulate, "Simulation mode changed");
    }

    /// Filament diameter the slicer assumed
    pub fn nominal_filament_diameter(&self) -> f64 {
        self.inner.config.filament.nominal_diameter
    }

    /// Measured filament diameter used for extrusion compensation
    pub fn adjusted_filament_diameter(&self) -> f64 {
        *self.inner.adjusted_filament_diameter.lock()
    }

    /// Set the measured filament diameter
    pub fn set_adjusted_filament_diameter(&self, diameter: f64) -> Result<()> {
        validate::validate_filament_diameter(diameter)?;
        *self.inner.adjusted_filament_diameter.lock() = diameter;
        Ok(())
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Event dispatcher
    pub fn events(&self) -> &EventDispatcher {
        &self.inner.events
    }

    /// Register a listener for session callbacks
    pub fn register_listener(&self, listener: Arc<dyn SessionListener>) -> SessionListenerHandle {
        let id = Uuid::new_v4().to_string();
        let handle = SessionListenerHandle(id.clone());
        self.inner.listeners.write().insert(id, listener);
        handle
    }

    /// Remove a listener; returns false if it was not registered
    pub fn unregister_listener(&self, handle: &SessionListenerHandle) -> bool {
        self.inner.listeners.write().remove(&handle.0).is_some()
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// Start or stop the periodic status schedule
    ///
    /// Outside a tokio runtime the start is deferred to the session's first
    /// round trip.
    pub fn set_auto_update(&self, enabled: bool) {
        self.inner.auto_update.store(enabled, Ordering::SeqCst);
        if enabled {
            self.ensure_poll_loop();
        } else if let Some(handle) = self.inner.poll_task.lock().take() {
            handle.abort();
            tracing::debug!(hostname = %self.hostname(), "Auto-update stopped");
        }
    }

    /// Whether the periodic schedule is enabled
    ///
    /// True also while a deferred start is waiting for a runtime.
    pub fn is_auto_updating(&self) -> bool {
        self.inner.auto_update.load(Ordering::SeqCst)
    }

    /// Spawn the poll loop if auto-update is enabled and it is not running
    fn ensure_poll_loop(&self) {
        if !self.inner.auto_update.load(Ordering::SeqCst) {
            return;
        }
        let mut task = self.inner.poll_task.lock();
        let running = task
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false);
        if running {
            return;
        }
        match Handle::try_current() {
            Ok(runtime) => {
                *task = Some(poll::spawn_poll_loop(&self.inner, &runtime));
                tracing::debug!(hostname = %self.hostname(), "Auto-update started");
            }
            Err(_) => {
                tracing::debug!(hostname = %self.hostname(), "No runtime yet, auto-update deferred");
            }
        }
    }

    /// Chunked transfer coordinator sharing this session's transport and
    /// path serialization
    pub fn file_transfers(&self) -> FileTransferCoordinator {
        FileTransferCoordinator::with_path_locks(
            Arc::clone(&self.inner.transport),
            &self.inner.config.transfer,
            self.inner.config.connection.timeout(),
            Arc::clone(&self.inner.path_locks),
        )
    }

    /// One round trip with the configured deadline
    async fn round_trip(&self, request: Request) -> Result<Payload> {
        self.ensure_poll_loop();
        send_with_deadline(
            self.inner.transport.as_ref(),
            self.inner.config.connection.timeout(),
            request,
        )
        .await
    }

    fn publish(&self, event: SessionEvent) {
        self.inner.events.publish(event);
    }

    fn listeners(&self) -> Vec<Arc<dyn SessionListener>> {
        self.inner.listeners.read().values().cloned().collect()
    }
}
