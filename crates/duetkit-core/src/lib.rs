//! # DuetKit Core
//!
//! Core types, errors, and events for DuetKit.
//! Provides the data model decoded from printer status payloads, the error
//! taxonomy shared by every layer, and the session event plumbing.

pub mod core;
pub mod data;
pub mod error;
pub mod types;

pub use core::{
    with_cancellation, CancellationToken, EventDispatcher, SessionEvent, SessionListener,
    SessionListenerHandle,
};

pub use data::{
    display_name_for, DirectoryItem, FileInfo, HeaterId, HeaterState, HeaterStatus,
    HeatingProgressState, PendingHeaters, PrinterState, PrinterStatus,
};

pub use error::{
    CommandError, DecodeError, Error, Result, TransportError, ValidationError,
};

pub use types::{thread_safe_rw_map, ThreadSafeRwMap};
