//! Settings error types.
//!
//! `SettingsError` covers reading and writing config files; `ConfigError`
//! covers values that fail validation. Both convert into
//! `duetkit_core::Error::Settings` so session constructors can use `?`.

use std::io;
use thiserror::Error;

/// Failure reading, writing or locating a config file
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The config file could not be read
    #[error("Failed to load settings from {0}")]
    LoadError(String),

    /// The config file could not be written
    #[error("Failed to save settings to {0}")]
    SaveError(String),

    /// No platform config directory is available
    #[error("Config directory unavailable: {0}")]
    ConfigDirectory(String),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Malformed JSON settings: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Malformed TOML settings: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Could not encode TOML settings: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// The file parsed but its values are invalid
    #[error("Invalid settings: {0}")]
    Config(#[from] ConfigError),
}

/// A config value that fails validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File extension is neither `.json` nor `.toml`
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("'{key}' is out of range: {value}")]
    ValueOutOfRange { key: String, value: String },

    #[error("'{0}' must not be empty")]
    MissingValue(String),
}

impl From<SettingsError> for duetkit_core::Error {
    fn from(err: SettingsError) -> Self {
        duetkit_core::Error::Settings(err.to_string())
    }
}

impl From<ConfigError> for duetkit_core::Error {
    fn from(err: ConfigError) -> Self {
        duetkit_core::Error::Settings(err.to_string())
    }
}

pub type SettingsResult<T> = Result<T, SettingsError>;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_names_the_key() {
        let err = ConfigError::ValueOutOfRange {
            key: "transfer.chunk_size".to_string(),
            value: "0".to_string(),
        };
        assert_eq!(err.to_string(), "'transfer.chunk_size' is out of range: 0");

        let err = ConfigError::MissingValue("connection.hostname".to_string());
        assert_eq!(err.to_string(), "'connection.hostname' must not be empty");
    }

    #[test]
    fn test_validation_failure_reaches_core_error() {
        let settings_err: SettingsError =
            ConfigError::UnsupportedFormat("yaml".to_string()).into();
        assert!(matches!(settings_err, SettingsError::Config(_)));

        let core_err: duetkit_core::Error = settings_err.into();
        assert!(matches!(core_err, duetkit_core::Error::Settings(ref msg) if msg.contains("yaml")));
    }

    #[test]
    fn test_io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "read-only");
        let settings_err: SettingsError = io_err.into();
        assert!(matches!(settings_err, SettingsError::IoError(_)));
    }
}
