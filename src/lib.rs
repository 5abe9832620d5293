//! # DuetKit
//!
//! An async client for Duet-class networked 3D-printer controllers:
//! - Live status with a coherent cache, even when polls and commands race
//! - Heater warming/cooling progress and pending-heater tracking
//! - Directory listing, file metadata and file management
//! - Chunked uploads and downloads with progress and cancellation
//! - Print control, temperatures, speed/extrusion factors, babystepping
//!
//! ## Architecture
//!
//! DuetKit is organized as a workspace with multiple crates:
//!
//! 1. **duetkit-core** - Errors, status and file data model, events, cancellation
//! 2. **duetkit-settings** - Persisted session configuration
//! 3. **duetkit-communication** - Transport contract, Duet decoders, heating
//!    tracker, transfers, printer session
//! 4. **duetkit** - This facade
//!
//! The HTTP layer is not part of DuetKit: callers provide a [`Transport`]
//! that performs one round trip per request.

pub use duetkit_communication::{firmware, heating, session, transfer, transport};
pub use duetkit_core::data;

pub use duetkit_core::{
    with_cancellation, CancellationToken, CommandError, DecodeError, DirectoryItem, Error,
    EventDispatcher, FileInfo, HeaterId, HeaterState, HeaterStatus, HeatingProgressState,
    PendingHeaters, PrinterState, PrinterStatus, Result, SessionEvent, SessionListener,
    SessionListenerHandle, TransportError, ValidationError,
};

pub use duetkit_communication::{
    send_with_deadline, AtxPowerOutcome, ClearFaultOutcome, FactorKind, FileTransferCoordinator,
    HeaterProgress, HeatingTracker, NoOpTransport, Operation, Payload, PollFailure,
    PrinterSession, Request, Transport,
};

pub use duetkit_settings::{
    Config, ConfigError, ConnectionSettings, FilamentSettings, HeatingSettings, LimitSettings,
    SettingsError, TransferSettings,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support, `info` when unset
///
/// Fails if a global subscriber is already installed.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::prelude::*;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer())
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {}", err))?;

    tracing::debug!(version = VERSION, build_date = BUILD_DATE, "Logging initialized");
    Ok(())
}

/// Like [`init_logging`], but a no-op when a subscriber is already installed
///
/// Returns `true` if this call installed the subscriber.
pub fn try_init_logging() -> bool {
    init_logging().is_ok()
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

fn fmt_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty()
}
