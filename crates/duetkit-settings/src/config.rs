//! Configuration and settings management for DuetKit
//!
//! Provides configuration file handling and validation.
//! Supports JSON and TOML file formats stored in platform-specific directories.
//!
//! Configuration is organized into logical sections:
//! - Connection settings (endpoint, timeouts, polling)
//! - Heating progress tolerances
//! - Temperature limits enforced before dispatch
//! - File transfer chunking
//! - Filament diameter

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Printer hostname or IP address
    pub hostname: String,
    /// HTTP port
    pub port: u16,
    /// Per round-trip deadline in milliseconds
    pub timeout_ms: u64,
    /// Poll status periodically
    pub auto_update: bool,
    /// Interval between scheduled polls in milliseconds
    pub poll_interval_ms: u64,
    /// Refresh status right after an acknowledged command
    pub refresh_after_command: bool,
}

impl ConnectionSettings {
    /// Round-trip deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Scheduled poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            hostname: "duet.local".to_string(),
            port: 80,
            timeout_ms: 5000,
            auto_update: true,
            poll_interval_ms: 1000,
            refresh_after_command: true,
        }
    }
}

/// Heating progress settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatingSettings {
    /// Half-width of the at-target band in °C
    pub tolerance: f64,
    /// Ambient baseline in °C for warming progress
    pub ambient: f64,
}

impl Default for HeatingSettings {
    fn default() -> Self {
        Self {
            tolerance: 2.0,
            ambient: 20.0,
        }
    }
}

/// Temperature limits checked before dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Highest hotend target accepted, °C
    pub max_hotend_temperature: f64,
    /// Highest bed target accepted, °C
    pub max_bed_temperature: f64,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_hotend_temperature: 300.0,
            max_bed_temperature: 150.0,
        }
    }
}

/// File transfer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    /// Bytes per upload/download chunk
    pub chunk_size: usize,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self { chunk_size: 65_536 }
    }
}

/// Filament settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilamentSettings {
    /// Diameter the slicer assumed, mm
    pub nominal_diameter: f64,
}

impl Default for FilamentSettings {
    fn default() -> Self {
        Self {
            nominal_diameter: 1.75,
        }
    }
}

/// Complete session configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Connection settings
    pub connection: ConnectionSettings,
    /// Heating progress settings
    pub heating: HeatingSettings,
    /// Temperature limits
    pub limits: LimitSettings,
    /// File transfer settings
    pub transfer: TransferSettings,
    /// Filament settings
    pub filament: FilamentSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Config for one endpoint, other sections at their defaults
    pub fn for_endpoint(hostname: impl Into<String>, port: u16, auto_update: bool) -> Self {
        let mut config = Self::default();
        config.connection.hostname = hostname.into();
        config.connection.port = port;
        config.connection.auto_update = auto_update;
        config
    }

    /// Default config file location: `<config dir>/duetkit/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| {
            SettingsError::ConfigDirectory("no platform config directory".to_string())
        })?;
        Ok(base.join("duetkit").join("config.toml"))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?;

        let config: Self = match Format::from_path(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::from_path(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), "Saved settings");
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let c = &self.connection;
        if c.hostname.trim().is_empty() {
            return Err(ConfigError::MissingValue("connection.hostname".to_string()));
        }
        if c.port == 0 {
            return Err(out_of_range("connection.port", c.port));
        }
        if c.timeout_ms == 0 {
            return Err(out_of_range("connection.timeout_ms", c.timeout_ms));
        }
        if c.poll_interval_ms == 0 {
            return Err(out_of_range("connection.poll_interval_ms", c.poll_interval_ms));
        }

        if !(self.heating.tolerance > 0.0 && self.heating.tolerance.is_finite()) {
            return Err(out_of_range("heating.tolerance", self.heating.tolerance));
        }
        if !self.heating.ambient.is_finite() {
            return Err(out_of_range("heating.ambient", self.heating.ambient));
        }

        if !(self.limits.max_hotend_temperature > 0.0) {
            return Err(out_of_range(
                "limits.max_hotend_temperature",
                self.limits.max_hotend_temperature,
            ));
        }
        if !(self.limits.max_bed_temperature > 0.0) {
            return Err(out_of_range(
                "limits.max_bed_temperature",
                self.limits.max_bed_temperature,
            ));
        }

        if self.transfer.chunk_size == 0 {
            return Err(out_of_range("transfer.chunk_size", self.transfer.chunk_size));
        }

        let diameter = self.filament.nominal_diameter;
        if !(diameter > 0.0 && diameter.is_finite()) {
            return Err(out_of_range("filament.nominal_diameter", diameter));
        }

        Ok(())
    }
}

fn out_of_range(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::ValueOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}
