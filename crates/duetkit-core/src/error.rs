//! Error handling for DuetKit
//!
//! Provides error types for every layer of the printer session:
//! - Transport errors (network round trips, timeouts)
//! - Decode errors (malformed status and listing payloads)
//! - Command errors (rejections reported by the device)
//! - Validation errors (arguments rejected before any dispatch)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Transport error type
///
/// Represents a failed round trip to the printer. These are transient:
/// the cached state is preserved and the operation is safe to retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The endpoint could not be reached
    #[error("Printer unreachable: {reason}")]
    Unreachable {
        /// The reason the endpoint could not be reached.
        reason: String,
    },

    /// The round trip did not complete before its deadline
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },

    /// I/O failure while talking to the device
    #[error("I/O error: {reason}")]
    Io {
        /// The reason for the I/O error.
        reason: String,
    },

    /// Generic transport error
    #[error("Transport error: {message}")]
    Other {
        /// The error message.
        message: String,
    },
}

/// Decode error type
///
/// Raised when a payload returned by the device does not match the
/// expected schema. Callers treat it like a transport failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Payload (or a nested record) was not a key/value object
    #[error("Expected an object for {context}")]
    NotAnObject {
        /// Where the object was expected.
        context: String,
    },

    /// A field was present but had the wrong type or an out-of-range value
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Dotted path of the offending field.
        field: String,
        /// The reason the value was rejected.
        reason: String,
    },

    /// An enumerated state value was not recognised
    #[error("Unknown state '{value}' in field '{field}'")]
    UnknownState {
        /// Dotted path of the offending field.
        field: String,
        /// The unrecognised value.
        value: String,
    },

    /// Fields disagree with each other
    #[error("Inconsistent payload: {reason}")]
    Inconsistent {
        /// What was inconsistent.
        reason: String,
    },

    /// The same path appeared twice in a directory listing
    #[error("Duplicate path in listing: {path}")]
    DuplicatePath {
        /// The duplicated path.
        path: String,
    },
}

/// Command error type
///
/// The device received the command and refused it. Surfaced verbatim and
/// never retried automatically.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// The device rejected the command
    #[error("{operation} rejected by printer (code {code}): {reason}")]
    Rejected {
        /// The operation that was rejected.
        operation: String,
        /// The device-reported error code.
        code: i64,
        /// The device-reported message.
        reason: String,
    },
}

/// Validation error type
///
/// Arguments rejected locally; no network round trip was made.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Path argument was empty
    #[error("Path must not be empty")]
    EmptyPath,

    /// Path argument is not a server-relative path
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// The reason the path was rejected.
        reason: String,
    },

    /// Hostname or port unusable
    #[error("Invalid endpoint: {reason}")]
    InvalidEndpoint {
        /// The reason the endpoint was rejected.
        reason: String,
    },

    /// Heater target outside the accepted range
    #[error("Temperature {value} outside accepted range {min}..={max}")]
    TemperatureOutOfRange {
        /// The requested temperature.
        value: f64,
        /// Lowest accepted target (the "off" sentinel).
        min: f64,
        /// Highest accepted target.
        max: f64,
    },

    /// Speed or extrusion factor not a positive finite number
    #[error("Invalid {name} factor: {value}")]
    InvalidFactor {
        /// Which factor.
        name: String,
        /// The rejected value.
        value: f64,
    },

    /// Babystep offset not finite
    #[error("Invalid babystep offset: {value}")]
    InvalidOffset {
        /// The rejected value.
        value: f64,
    },

    /// Filament diameter not a positive finite number
    #[error("Invalid filament diameter: {value}")]
    InvalidFilamentDiameter {
        /// The rejected value.
        value: f64,
    },

    /// Heater does not exist in the cached status
    #[error("Unknown heater: {heater}")]
    UnknownHeater {
        /// The heater that was addressed.
        heater: String,
    },
}

/// Main error type for DuetKit
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Decode error
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Command error
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Validation error
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// Settings could not be loaded, saved, or validated
    #[error("Settings error: {0}")]
    Settings(String),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Transport and decode failures are both reported as transport failures
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Decode(_))
    }

    /// Check whether retrying the same operation can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        self.is_transport_failure()
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Timeout { .. }))
    }

    /// Check if the operation was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Check if the device rejected the command
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::Command(_))
    }

    /// Check if this was rejected locally before dispatch
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_counts_as_transport_failure() {
        let err: Error = DecodeError::InvalidField {
            field: "status".to_string(),
            reason: "expected string".to_string(),
        }
        .into();
        assert!(err.is_transport_failure());
        assert!(err.is_retryable());
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_rejection_not_retryable() {
        let err: Error = CommandError::Rejected {
            operation: "resume".to_string(),
            code: 1,
            reason: "not paused".to_string(),
        }
        .into();
        assert!(err.is_rejection());
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "resume rejected by printer (code 1): not paused"
        );
    }

    #[test]
    fn test_timeout_detection() {
        let err: Error = TransportError::Timeout { timeout_ms: 5000 }.into();
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Request timed out after 5000ms");
    }

    #[test]
    fn test_validation_display() {
        let err = ValidationError::TemperatureOutOfRange {
            value: -5.0,
            min: 0.0,
            max: 300.0,
        };
        assert_eq!(
            err.to_string(),
            "Temperature -5 outside accepted range 0..=300"
        );
        let err: Error = ValidationError::EmptyPath.into();
        assert!(err.is_validation_error());
    }
}
