//! Firmware implementations for networked printer controllers
//!
//! Supported controllers:
//! - Duet: RepRapFirmware boards with the extended status web interface

pub mod duet;

pub use duet::{check_response, parse_directory_listing, parse_file_info, parse_status};
