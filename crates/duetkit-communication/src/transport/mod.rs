//! Transport gateway contract
//!
//! The session never talks to the network directly. It hands a named
//! [`Operation`] and a key/value [`Payload`] to a [`Transport`] and gets a
//! result payload or a [`TransportError`] back. The gateway does not
//! interpret payloads; decoding happens in the firmware modules.

mod payload;

pub use payload::Payload;

use crate::firmware::duet::{check_response, Request};
use async_trait::async_trait;
use duetkit_core::TransportError;
use std::fmt;
use std::time::Duration;

/// Remote operations understood by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Fetch the extended status record
    GetStatus,
    /// List a directory
    ListDirectory,
    /// Fetch metadata for a file (or the file being printed)
    GetFileInfo,
    /// Delete a file or empty directory
    Delete,
    /// Create a directory
    CreateDirectory,
    /// Move or rename a file
    Move,
    /// Write one chunk of an upload
    UploadChunk,
    /// Read one chunk of a download
    DownloadChunk,
    /// Run a macro file
    RunMacro,
    /// Start printing (or simulating) a file
    Print,
    /// Home all axes
    Home,
    /// Run bed probing
    Probe,
    /// Pause the print
    Pause,
    /// Resume a paused print
    Resume,
    /// Cancel the print
    Cancel,
    /// Set a heater target
    SetHeaterTarget,
    /// Set the speed or extrusion factor
    SetFactor,
    /// Switch the ATX power supply
    SetAtxPower,
    /// Clear a latched heater fault
    ClearFault,
    /// Adjust the Z babystep offset
    Babystep,
    /// Read the duration of the last simulated print
    GetSimulationTime,
}

impl Operation {
    /// Wire name of the operation
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetStatus => "get-status",
            Operation::ListDirectory => "list-directory",
            Operation::GetFileInfo => "get-file-info",
            Operation::Delete => "delete",
            Operation::CreateDirectory => "create-directory",
            Operation::Move => "move",
            Operation::UploadChunk => "upload-chunk",
            Operation::DownloadChunk => "download-chunk",
            Operation::RunMacro => "run-macro",
            Operation::Print => "print",
            Operation::Home => "home",
            Operation::Probe => "probe",
            Operation::Pause => "pause",
            Operation::Resume => "resume",
            Operation::Cancel => "cancel",
            Operation::SetHeaterTarget => "set-heater-target",
            Operation::SetFactor => "set-factor",
            Operation::SetAtxPower => "set-atx-power",
            Operation::ClearFault => "clear-fault",
            Operation::Babystep => "babystep",
            Operation::GetSimulationTime => "get-simulation-time",
        }
    }

    /// Operations that change the server filesystem
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Operation::Delete
                | Operation::CreateDirectory
                | Operation::Move
                | Operation::UploadChunk
        )
    }

    /// Operations that change printer state the status poll reports
    pub fn mutates_printer_state(&self) -> bool {
        matches!(
            self,
            Operation::RunMacro
                | Operation::Print
                | Operation::Home
                | Operation::Probe
                | Operation::Pause
                | Operation::Resume
                | Operation::Cancel
                | Operation::SetHeaterTarget
                | Operation::SetFactor
                | Operation::SetAtxPower
                | Operation::ClearFault
                | Operation::Babystep
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-send capability used by the session
///
/// Implementations may run several requests concurrently; ordering is the
/// session's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one remote operation
    async fn send(&self, operation: Operation, payload: Payload)
        -> Result<Payload, TransportError>;
}

/// Send one request with a deadline and check the device's verdict
///
/// Expiry is reported as [`TransportError::Timeout`]; a non-zero `err` in
/// the response becomes a command rejection.
pub async fn send_with_deadline(
    transport: &dyn Transport,
    deadline: Duration,
    request: Request,
) -> duetkit_core::Result<Payload> {
    let Request { operation, payload } = request;
    let response = match tokio::time::timeout(deadline, transport.send(operation, payload)).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::warn!(operation = %operation, timeout_ms = deadline.as_millis() as u64, "Round trip timed out");
            return Err(TransportError::Timeout {
                timeout_ms: deadline.as_millis() as u64,
            }
            .into());
        }
    };
    check_response(operation, &response)?;
    Ok(response)
}

/// No-op transport
///
/// Every request fails as unreachable. Useful to construct a session
/// before a real gateway is available.
#[derive(Debug, Clone, Default)]
pub struct NoOpTransport;

impl NoOpTransport {
    /// Create a new no-op transport
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for NoOpTransport {
    async fn send(
        &self,
        operation: Operation,
        _payload: Payload,
    ) -> Result<Payload, TransportError> {
        Err(TransportError::Unreachable {
            reason: format!("no transport configured for {}", operation),
        })
    }
}
