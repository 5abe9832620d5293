//! Data models for printer status, heaters, and files
//!
//! This module provides:
//! - Printer state and the immutable status snapshot decoded from a poll
//! - Heater state and per-heater temperature readings
//! - Heater identifiers and the pending-heater set
//! - Directory listing items and file metadata

pub mod files;
pub mod heater;

pub use files::{display_name_for, DirectoryItem, FileInfo};
pub use heater::{HeaterId, HeatingProgressState, PendingHeaters};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Operational state reported by the printer firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PrinterState {
    /// Ready for commands
    #[default]
    Idle,
    /// Executing a macro or other non-print work
    Busy,
    /// Printing a file
    Printing,
    /// Print paused
    Paused,
    /// Print is finishing queued moves before pausing
    Pausing,
    /// Print is resuming from a pause
    Resuming,
    /// Emergency stop; needs a reset
    Halted,
    /// Firmware is (re)reading its configuration
    ReadingConfig,
    /// Firmware update in progress
    FlashingFirmware,
}

impl PrinterState {
    /// Every state, in declaration order
    pub const ALL: [PrinterState; 9] = [
        PrinterState::Idle,
        PrinterState::Busy,
        PrinterState::Printing,
        PrinterState::Paused,
        PrinterState::Pausing,
        PrinterState::Resuming,
        PrinterState::Halted,
        PrinterState::ReadingConfig,
        PrinterState::FlashingFirmware,
    ];

    /// True while a print job exists, whether running or paused
    pub fn is_printing(&self) -> bool {
        matches!(
            self,
            PrinterState::Printing
                | PrinterState::Paused
                | PrinterState::Pausing
                | PrinterState::Resuming
        )
    }
}

impl fmt::Display for PrinterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrinterState::Idle => write!(f, "Idle"),
            PrinterState::Busy => write!(f, "Busy"),
            PrinterState::Printing => write!(f, "Printing"),
            PrinterState::Paused => write!(f, "Paused"),
            PrinterState::Pausing => write!(f, "Pausing"),
            PrinterState::Resuming => write!(f, "Resuming"),
            PrinterState::Halted => write!(f, "Halted"),
            PrinterState::ReadingConfig => write!(f, "Reading Config"),
            PrinterState::FlashingFirmware => write!(f, "Flashing Firmware"),
        }
    }
}

/// Heater state reported by the firmware
///
/// `Fault` is sticky: it stays until explicitly cleared, even if the
/// temperature recovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HeaterState {
    /// Heater off
    #[default]
    Off,
    /// Holding the standby temperature
    Standby,
    /// Holding the active temperature
    Active,
    /// Heater fault
    Fault,
    /// PID auto-tuning in progress
    Tuning,
}

impl HeaterState {
    /// Map a firmware heater state code
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(HeaterState::Off),
            1 => Some(HeaterState::Standby),
            2 => Some(HeaterState::Active),
            3 => Some(HeaterState::Fault),
            4 => Some(HeaterState::Tuning),
            _ => None,
        }
    }
}

impl fmt::Display for HeaterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaterState::Off => write!(f, "Off"),
            HeaterState::Standby => write!(f, "Standby"),
            HeaterState::Active => write!(f, "Active"),
            HeaterState::Fault => write!(f, "Fault"),
            HeaterState::Tuning => write!(f, "Tuning"),
        }
    }
}

/// One heater reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeaterStatus {
    /// Heater state
    pub state: HeaterState,
    /// Measured temperature in °C
    pub current_temperature: f64,
    /// Target temperature in °C (0 = off)
    pub target_temperature: f64,
}

impl HeaterStatus {
    /// Create a heater reading
    pub fn new(state: HeaterState, current_temperature: f64, target_temperature: f64) -> Self {
        Self {
            state,
            current_temperature,
            target_temperature,
        }
    }

    /// True when the heater is latched in a fault
    pub fn is_faulted(&self) -> bool {
        self.state == HeaterState::Fault
    }
}

/// Immutable printer status snapshot
///
/// Built once from a status payload and replaced wholesale by the next
/// applied poll. Shared with callers behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterStatus {
    /// Firmware state
    pub state: PrinterState,
    /// Configured printer name, when reported
    pub name: Option<String>,
    /// ATX power supply on
    pub atx_power: bool,
    /// Fraction of the current file printed, 0.0..=1.0
    pub fraction_printed: f64,
    /// Time spent on the current print
    pub print_duration: Duration,
    /// Estimated time remaining on the current print
    pub time_remaining: Duration,
    /// Current layer, `None` when unknown
    pub current_layer: Option<u32>,
    /// Speed factor multiplier (1.0 = 100%)
    pub speed_factor: f64,
    /// Extrusion factor multiplier (1.0 = 100%)
    pub extrusion_factor: f64,
    /// Babystepping Z offset in millimeters
    pub babystepping_offset: f64,
    /// Bed heater
    pub bed: HeaterStatus,
    /// Hotend heaters in tool order
    pub hotends: Vec<HeaterStatus>,
}

impl PrinterStatus {
    /// True iff the state is Printing, Paused, Pausing or Resuming
    pub fn printing(&self) -> bool {
        self.state.is_printing()
    }

    /// First hotend, if the printer has one
    pub fn primary_hotend(&self) -> Option<&HeaterStatus> {
        self.hotends.first()
    }

    /// Look up a heater by identifier
    pub fn heater(&self, id: HeaterId) -> Option<&HeaterStatus> {
        match id {
            HeaterId::Bed => Some(&self.bed),
            HeaterId::Hotend(index) => self.hotends.get(index),
        }
    }

    /// All heaters with their identifiers, bed first
    pub fn heaters(&self) -> impl Iterator<Item = (HeaterId, &HeaterStatus)> {
        std::iter::once((HeaterId::Bed, &self.bed)).chain(
            self.hotends
                .iter()
                .enumerate()
                .map(|(index, heater)| (HeaterId::Hotend(index), heater)),
        )
    }
}

impl Default for PrinterStatus {
    fn default() -> Self {
        Self {
            state: PrinterState::Idle,
            name: None,
            atx_power: false,
            fraction_printed: 0.0,
            print_duration: Duration::ZERO,
            time_remaining: Duration::ZERO,
            current_layer: None,
            speed_factor: 1.0,
            extrusion_factor: 1.0,
            babystepping_offset: 0.0,
            bed: HeaterStatus::default(),
            hotends: Vec::new(),
        }
    }
}

impl fmt::Display for PrinterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state)?;
        if self.printing() {
            write!(f, " {:.1}%", self.fraction_printed * 100.0)?;
        }
        write!(
            f,
            " bed {:.1}/{:.1}°C",
            self.bed.current_temperature, self.bed.target_temperature
        )?;
        if let Some(hotend) = self.primary_hotend() {
            write!(
                f,
                " hotend {:.1}/{:.1}°C",
                hotend.current_temperature, hotend.target_temperature
            )?;
        }
        Ok(())
    }
}
