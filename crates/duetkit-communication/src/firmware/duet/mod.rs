//! Duet firmware (RepRapFirmware) support
//!
//! Request builders and decoders for the Duet web interface records.

pub mod command_creator;
pub mod fields;
pub mod response_parser;
pub mod status_parser;

pub use command_creator::{FactorKind, Request};
pub use fields::FieldPath;
pub use response_parser::{
    check_response, join_path, parse_directory_listing, parse_file_info, parse_simulation_time,
};
pub use status_parser::{parse_status, parse_status_fields, printer_state_from_letter};
