//! Heater identifiers, derived heating progress, and the pending set

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifies one heater on the printer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeaterId {
    /// Heated bed
    Bed,
    /// Hotend by tool-order index (0 = primary)
    Hotend(usize),
}

impl HeaterId {
    /// Primary hotend
    pub const PRIMARY_HOTEND: HeaterId = HeaterId::Hotend(0);

    /// Firmware heater number: the bed is heater 0, hotends follow
    ///
    /// `None` when the hotend index has no firmware number.
    pub fn heater_number(&self) -> Option<u64> {
        match self {
            HeaterId::Bed => Some(0),
            HeaterId::Hotend(index) => u64::try_from(*index).ok()?.checked_add(1),
        }
    }
}

impl fmt::Display for HeaterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaterId::Bed => write!(f, "bed"),
            HeaterId::Hotend(index) => write!(f, "hotend {}", index),
        }
    }
}

/// Progress of a heater towards its target, derived from successive samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HeatingProgressState {
    /// No target set
    #[default]
    Off,
    /// Below the tolerance band, heating up
    Warming,
    /// Inside the tolerance band
    AtTarget,
    /// Above the tolerance band after the target was lowered
    Cooling,
}

impl HeatingProgressState {
    /// Warming and cooling are transitions; off and at-target are settled
    pub fn is_transitioning(&self) -> bool {
        matches!(
            self,
            HeatingProgressState::Warming | HeatingProgressState::Cooling
        )
    }
}

impl fmt::Display for HeatingProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeatingProgressState::Off => write!(f, "Off"),
            HeatingProgressState::Warming => write!(f, "Warming"),
            HeatingProgressState::AtTarget => write!(f, "At Target"),
            HeatingProgressState::Cooling => write!(f, "Cooling"),
        }
    }
}

/// Set of heaters currently mid-transition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingHeaters(BTreeSet<HeaterId>);

impl PendingHeaters {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a heater; returns false if it was already pending
    pub fn insert(&mut self, heater: HeaterId) -> bool {
        self.0.insert(heater)
    }

    /// Remove a heater; returns false if it was not pending
    pub fn remove(&mut self, heater: HeaterId) -> bool {
        self.0.remove(&heater)
    }

    /// Check membership
    pub fn contains(&self, heater: HeaterId) -> bool {
        self.0.contains(&heater)
    }

    /// True if the bed is pending
    pub fn bed(&self) -> bool {
        self.contains(HeaterId::Bed)
    }

    /// True if any hotend is pending
    pub fn any_hotend(&self) -> bool {
        self.0.iter().any(|h| matches!(h, HeaterId::Hotend(_)))
    }

    /// Number of pending heaters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in order, bed first
    pub fn iter(&self) -> impl Iterator<Item = HeaterId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<HeaterId> for PendingHeaters {
    fn from_iter<I: IntoIterator<Item = HeaterId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<HeaterId> for PendingHeaters {
    fn extend<I: IntoIterator<Item = HeaterId>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}
