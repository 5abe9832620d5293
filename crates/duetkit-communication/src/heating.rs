//! Heating progress tracking
//!
//! Derives warming / at-target / cooling transitions and a completion
//! fraction for every heater from successive status snapshots. The
//! classification itself is a pure function of the previous sample and the
//! new reading; the tracker only remembers what it needs between samples.

use duetkit_core::{
    HeaterId, HeaterStatus, HeatingProgressState, PendingHeaters, PrinterStatus,
};
use duetkit_settings::HeatingSettings;
use std::collections::HashMap;

/// Default half-width of the at-target band, °C
pub const DEFAULT_TOLERANCE: f64 = 2.0;

/// Default ambient baseline for warming progress, °C
pub const DEFAULT_AMBIENT: f64 = 20.0;

/// What the tracker remembers about one heater
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaterProgress {
    /// Derived state after the last sample
    pub state: HeatingProgressState,
    /// Last reading
    pub sample: HeaterStatus,
    /// Temperature the current transition started from
    pub baseline: Option<f64>,
    /// Completion of the current transition, 0.0..=1.0
    pub fraction: f64,
}

/// Classify one heater reading
///
/// `previous` is the tracker's record from the prior sample, if any.
/// Above the band the heater is cooling when its target was lowered, when
/// it was already cooling or off, or when there is no history; an
/// overshoot while warming or holding the same target stays at target.
pub fn classify(
    previous: Option<&HeaterProgress>,
    sample: &HeaterStatus,
    tolerance: f64,
) -> HeatingProgressState {
    let target = sample.target_temperature;
    let current = sample.current_temperature;

    if target <= 0.0 {
        return HeatingProgressState::Off;
    }
    if current < target - tolerance {
        return HeatingProgressState::Warming;
    }
    if current <= target + tolerance {
        return HeatingProgressState::AtTarget;
    }

    match previous {
        None => HeatingProgressState::Cooling,
        Some(prev) => {
            let lowered = target < prev.sample.target_temperature;
            let settled_or_heating = matches!(
                prev.state,
                HeatingProgressState::Warming | HeatingProgressState::AtTarget
            );
            if lowered || !settled_or_heating {
                HeatingProgressState::Cooling
            } else {
                HeatingProgressState::AtTarget
            }
        }
    }
}

/// Per-heater heating progress tracker
#[derive(Debug, Clone)]
pub struct HeatingTracker {
    tolerance: f64,
    ambient: f64,
    heaters: HashMap<HeaterId, HeaterProgress>,
}

impl HeatingTracker {
    /// Create a tracker with the given band and ambient baseline
    pub fn new(tolerance: f64, ambient: f64) -> Self {
        Self {
            tolerance,
            ambient,
            heaters: HashMap::new(),
        }
    }

    /// Create a tracker from settings
    pub fn from_settings(settings: &HeatingSettings) -> Self {
        Self::new(settings.tolerance, settings.ambient)
    }

    /// Half-width of the at-target band
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Ambient baseline
    pub fn ambient(&self) -> f64 {
        self.ambient
    }

    /// Feed one heater reading; returns the new state if it changed
    pub fn observe(
        &mut self,
        heater: HeaterId,
        sample: &HeaterStatus,
    ) -> Option<HeatingProgressState> {
        let previous = self.heaters.get(&heater).copied();
        let state = classify(previous.as_ref(), sample, self.tolerance);
        let previous_state = previous.map(|p| p.state).unwrap_or_default();

        let target = sample.target_temperature;
        let current = sample.current_temperature;
        let target_changed = previous
            .map(|p| p.sample.target_temperature != target)
            .unwrap_or(true);

        let baseline = match state {
            HeatingProgressState::Warming | HeatingProgressState::Cooling => {
                let restart = state != previous_state || target_changed;
                match previous.and_then(|p| p.baseline) {
                    Some(baseline) if !restart => Some(baseline),
                    _ if state == HeatingProgressState::Warming => Some(current.max(self.ambient)),
                    _ => Some(current),
                }
            }
            HeatingProgressState::AtTarget | HeatingProgressState::Off => None,
        };

        let fraction = match (state, baseline) {
            (HeatingProgressState::Off, _) => 0.0,
            (HeatingProgressState::AtTarget, _) => 1.0,
            (_, Some(baseline)) => progress_fraction(baseline, current, target),
            (_, None) => 0.0,
        };

        self.heaters.insert(
            heater,
            HeaterProgress {
                state,
                sample: *sample,
                baseline,
                fraction,
            },
        );

        if state != previous_state {
            tracing::debug!(heater = %heater, from = %previous_state, to = %state, "Heating state changed");
            Some(state)
        } else {
            None
        }
    }

    /// Feed a whole status snapshot; returns the heaters whose state changed
    pub fn update(&mut self, status: &PrinterStatus) -> Vec<(HeaterId, HeatingProgressState)> {
        self.heaters.retain(|heater, _| status.heater(*heater).is_some());
        status
            .heaters()
            .filter_map(|(heater, sample)| self.observe(heater, sample).map(|s| (heater, s)))
            .collect()
    }

    /// Derived state of a heater; `Off` before its first sample
    pub fn state(&self, heater: HeaterId) -> HeatingProgressState {
        self.heaters
            .get(&heater)
            .map(|p| p.state)
            .unwrap_or_default()
    }

    /// Completion fraction of the heater's current transition
    pub fn fraction(&self, heater: HeaterId) -> f64 {
        self.heaters.get(&heater).map(|p| p.fraction).unwrap_or(0.0)
    }

    /// Tracker record for a heater
    pub fn progress(&self, heater: HeaterId) -> Option<&HeaterProgress> {
        self.heaters.get(&heater)
    }

    /// Heaters currently warming or cooling
    pub fn transitioning(&self) -> PendingHeaters {
        self.heaters
            .iter()
            .filter(|(_, p)| p.state.is_transitioning())
            .map(|(heater, _)| *heater)
            .collect()
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.heaters.clear();
    }
}

impl Default for HeatingTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE, DEFAULT_AMBIENT)
    }
}

fn progress_fraction(baseline: f64, current: f64, target: f64) -> f64 {
    let span = target - baseline;
    if span.abs() < f64::EPSILON {
        return 1.0;
    }
    ((current - baseline) / span).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use duetkit_core::HeaterState;

    fn active(current: f64, target: f64) -> HeaterStatus {
        HeaterStatus::new(HeaterState::Active, current, target)
    }

    #[test]
    fn test_zero_target_is_always_off() {
        let mut tracker = HeatingTracker::default();
        for current in [-40.0, 0.0, 20.0, 250.0, 1000.0] {
            tracker.observe(HeaterId::Bed, &HeaterStatus::new(HeaterState::Off, current, 0.0));
            assert_eq!(tracker.state(HeaterId::Bed), HeatingProgressState::Off);
            assert_eq!(tracker.fraction(HeaterId::Bed), 0.0);
        }
    }

    #[test]
    fn test_warming_to_target_sequence() {
        let mut tracker = HeatingTracker::default();
        let hotend = HeaterId::PRIMARY_HOTEND;
        assert_eq!(tracker.state(hotend), HeatingProgressState::Off);

        let states: Vec<_> = [20.0, 120.0, 199.0, 200.0, 201.0]
            .iter()
            .map(|current| {
                tracker.observe(hotend, &active(*current, 200.0));
                tracker.state(hotend)
            })
            .collect();

        assert_eq!(
            states,
            vec![
                HeatingProgressState::Warming,
                HeatingProgressState::Warming,
                HeatingProgressState::AtTarget,
                HeatingProgressState::AtTarget,
                HeatingProgressState::AtTarget,
            ]
        );
    }

    #[test]
    fn test_warming_fraction_from_entry_sample() {
        let mut tracker = HeatingTracker::default();
        let hotend = HeaterId::PRIMARY_HOTEND;

        tracker.observe(hotend, &active(20.0, 220.0));
        assert_eq!(tracker.fraction(hotend), 0.0);
        tracker.observe(hotend, &active(120.0, 220.0));
        assert!((tracker.fraction(hotend) - 0.5).abs() < 1e-9);
        tracker.observe(hotend, &active(219.0, 220.0));
        assert_eq!(tracker.fraction(hotend), 1.0);
    }

    #[test]
    fn test_baseline_never_below_ambient() {
        let mut tracker = HeatingTracker::default();
        tracker.observe(HeaterId::Bed, &active(5.0, 60.0));
        assert_eq!(tracker.progress(HeaterId::Bed).and_then(|p| p.baseline), Some(20.0));
        assert_eq!(tracker.fraction(HeaterId::Bed), 0.0);
    }

    #[test]
    fn test_new_target_while_warming_resets_baseline() {
        let mut tracker = HeatingTracker::default();
        let hotend = HeaterId::PRIMARY_HOTEND;
        tracker.observe(hotend, &active(20.0, 200.0));
        tracker.observe(hotend, &active(110.0, 200.0));
        tracker.observe(hotend, &active(110.0, 250.0));
        assert_eq!(tracker.progress(hotend).and_then(|p| p.baseline), Some(110.0));
        assert_eq!(tracker.fraction(hotend), 0.0);
    }

    #[test]
    fn test_lowered_target_while_hot_is_cooling() {
        let mut tracker = HeatingTracker::default();
        let hotend = HeaterId::PRIMARY_HOTEND;
        tracker.observe(hotend, &active(210.0, 210.0));
        assert_eq!(tracker.state(hotend), HeatingProgressState::AtTarget);

        tracker.observe(hotend, &active(210.0, 170.0));
        assert_eq!(tracker.state(hotend), HeatingProgressState::Cooling);
        tracker.observe(hotend, &active(190.0, 170.0));
        assert_eq!(tracker.state(hotend), HeatingProgressState::Cooling);
        assert!((tracker.fraction(hotend) - 0.5).abs() < 1e-9);
        tracker.observe(hotend, &active(171.0, 170.0));
        assert_eq!(tracker.state(hotend), HeatingProgressState::AtTarget);
    }

    #[test]
    fn test_overshoot_with_same_target_stays_at_target() {
        let mut tracker = HeatingTracker::default();
        let bed = HeaterId::Bed;
        tracker.observe(bed, &active(58.5, 60.0));
        tracker.observe(bed, &active(63.0, 60.0));
        assert_eq!(tracker.state(bed), HeatingProgressState::AtTarget);
    }

    #[test]
    fn test_hot_with_no_history_is_cooling() {
        let mut tracker = HeatingTracker::default();
        tracker.observe(HeaterId::Bed, &active(90.0, 60.0));
        assert_eq!(tracker.state(HeaterId::Bed), HeatingProgressState::Cooling);
    }

    #[test]
    fn test_update_reports_changes_and_pending() {
        let mut tracker = HeatingTracker::default();
        let status = PrinterStatus {
            bed: active(20.0, 60.0),
            hotends: vec![HeaterStatus::default()],
            ..Default::default()
        };

        let changes = tracker.update(&status);
        assert_eq!(changes, vec![(HeaterId::Bed, HeatingProgressState::Warming)]);
        assert!(tracker.transitioning().bed());
        assert!(!tracker.transitioning().any_hotend());

        assert!(tracker.update(&status).is_empty());
    }

    #[test]
    fn test_removed_hotends_are_forgotten() {
        let mut tracker = HeatingTracker::default();
        let mut status = PrinterStatus {
            hotends: vec![active(20.0, 200.0), active(20.0, 200.0)],
            ..Default::default()
        };
        tracker.update(&status);
        assert!(tracker.progress(HeaterId::Hotend(1)).is_some());

        status.hotends.truncate(1);
        tracker.update(&status);
        assert!(tracker.progress(HeaterId::Hotend(1)).is_none());
    }
}
