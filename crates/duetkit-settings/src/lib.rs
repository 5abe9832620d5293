//! DuetKit Settings Crate
//!
//! Handles session configuration, settings persistence, and validation.

pub mod config;
pub mod error;

pub use config::{
    Config, ConnectionSettings, FilamentSettings, HeatingSettings, LimitSettings,
    TransferSettings,
};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
