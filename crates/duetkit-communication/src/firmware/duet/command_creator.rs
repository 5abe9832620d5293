//! Duet Command Creator
//!
//! Builds the operation and request payload for each remote command.
//! Arguments are assumed to be validated already.

use crate::transport::{Operation, Payload};

/// Which feed-rate multiplier a `set-factor` request changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorKind {
    /// Movement speed
    Speed,
    /// Extrusion amount
    Extrusion,
}

impl FactorKind {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorKind::Speed => "speed",
            FactorKind::Extrusion => "extrusion",
        }
    }
}

/// One request ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Remote operation
    pub operation: Operation,
    /// Request payload
    pub payload: Payload,
}

impl Request {
    /// Request without arguments
    pub fn bare(operation: Operation) -> Self {
        Self {
            operation,
            payload: Payload::new(),
        }
    }

    fn with_path(operation: Operation, path: &str) -> Self {
        Self {
            operation,
            payload: Payload::new().with("path", path),
        }
    }
}

/// Fetch the extended status record
pub fn status() -> Request {
    Request::bare(Operation::GetStatus)
}

/// List a directory
pub fn list_directory(path: &str) -> Request {
    Request::with_path(Operation::ListDirectory, path)
}

/// Fetch file metadata; `None` asks about the file being printed
pub fn file_info(path: Option<&str>) -> Request {
    match path {
        Some(path) => Request::with_path(Operation::GetFileInfo, path),
        None => Request::bare(Operation::GetFileInfo),
    }
}

/// Delete a file or empty directory
pub fn delete(path: &str) -> Request {
    Request::with_path(Operation::Delete, path)
}

/// Create a directory
pub fn create_directory(path: &str) -> Request {
    Request::with_path(Operation::CreateDirectory, path)
}

/// Move or rename a file
pub fn move_file(from: &str, to: &str) -> Request {
    Request {
        operation: Operation::Move,
        payload: Payload::new().with("from", from).with("to", to),
    }
}

/// Run a macro
pub fn run_macro(path: &str) -> Request {
    Request::with_path(Operation::RunMacro, path)
}

/// Print or simulate a file
pub fn print(path: &str, simulate: bool) -> Request {
    Request {
        operation: Operation::Print,
        payload: Payload::new().with("path", path).with("simulate", simulate),
    }
}

/// Set the target of firmware heater `heater` in °C (0 = off)
pub fn set_heater_target(heater: u64, target: f64) -> Request {
    Request {
        operation: Operation::SetHeaterTarget,
        payload: Payload::new()
            .with("heater", heater)
            .with("target", target),
    }
}

/// Set a feed-rate multiplier; `multiplier` 1.0 is sent as 100 percent
pub fn set_factor(kind: FactorKind, multiplier: f64) -> Request {
    Request {
        operation: Operation::SetFactor,
        payload: Payload::new()
            .with("factor", kind.as_str())
            .with("value", multiplier * 100.0),
    }
}

/// Switch the ATX power supply
pub fn set_atx_power(on: bool) -> Request {
    Request {
        operation: Operation::SetAtxPower,
        payload: Payload::new().with("on", on),
    }
}

/// Clear a latched fault on firmware heater `heater`
pub fn clear_fault(heater: u64) -> Request {
    Request {
        operation: Operation::ClearFault,
        payload: Payload::new().with("heater", heater),
    }
}

/// Adjust the Z babystep offset in mm
pub fn babystep(offset: f64) -> Request {
    Request {
        operation: Operation::Babystep,
        payload: Payload::new().with("offset", offset),
    }
}

/// Write one upload chunk at `offset` of a `total`-byte file
pub fn upload_chunk(path: &str, offset: u64, total: u64, data: Vec<u8>) -> Request {
    Request {
        operation: Operation::UploadChunk,
        payload: Payload::new()
            .with("path", path)
            .with("offset", offset)
            .with("total", total)
            .with_data(data),
    }
}

/// Read up to `length` bytes at `offset`
pub fn download_chunk(path: &str, offset: u64, length: u64) -> Request {
    Request {
        operation: Operation::DownloadChunk,
        payload: Payload::new()
            .with("path", path)
            .with("offset", offset)
            .with("length", length),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heater_target_uses_firmware_numbering() {
        let request = set_heater_target(0, 60.0);
        assert_eq!(request.operation, Operation::SetHeaterTarget);
        assert_eq!(request.payload.get_u64("heater"), Some(0));
        assert_eq!(request.payload.get_f64("target"), Some(60.0));

        let request = clear_fault(1);
        assert_eq!(request.payload.get_u64("heater"), Some(1));
    }

    #[test]
    fn test_factor_sent_as_percent() {
        let request = set_factor(FactorKind::Speed, 1.25);
        assert_eq!(request.payload.get_str("factor"), Some("speed"));
        assert_eq!(request.payload.get_f64("value"), Some(125.0));
    }

    #[test]
    fn test_file_info_without_path() {
        assert!(file_info(None).payload.get("path").is_none());
        assert_eq!(file_info(Some("0:/a.g")).payload.get_str("path"), Some("0:/a.g"));
    }

    #[test]
    fn test_print_carries_simulate_flag() {
        let request = print("0:/gcodes/a.g", true);
        assert_eq!(request.payload.get_bool("simulate"), Some(true));
    }
}
