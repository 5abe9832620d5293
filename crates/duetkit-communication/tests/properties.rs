use duetkit_communication::firmware::duet::parse_status_fields;
use duetkit_communication::HeatingTracker;
use duetkit_communication::session::sequence::{Offer, SnapshotCache};
use duetkit_core::{HeaterId, HeaterState, HeaterStatus, HeatingProgressState, PrinterState};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

const LETTERS: [&str; 13] = ["I", "O", "B", "T", "P", "M", "S", "A", "D", "R", "H", "C", "F"];

proptest! {
    #[test]
    fn snapshot_cache_keeps_highest_sequence(
        order in Just((1u64..=20).collect::<Vec<_>>()).prop_shuffle(),
        floor in 0u64..10,
    ) {
        let mut cache = SnapshotCache::new();
        for sequence in &order {
            let before = cache.sequence();
            let offer = cache.offer(*sequence, floor, Arc::new(*sequence));
            let expected = if *sequence > before && *sequence > floor {
                Offer::Applied
            } else {
                Offer::Stale
            };
            prop_assert_eq!(offer, expected);
            prop_assert!(cache.sequence() >= before);
        }
        prop_assert_eq!(cache.get().map(|value| *value), Some(20));
        prop_assert_eq!(cache.sequence(), 20);
    }

    #[test]
    fn printing_follows_job_states(index in 0usize..LETTERS.len()) {
        let record = json!({"status": LETTERS[index]});
        let status = parse_status_fields(record.as_object().unwrap()).unwrap();
        let job = matches!(
            status.state,
            PrinterState::Printing | PrinterState::Paused | PrinterState::Pausing | PrinterState::Resuming
        );
        prop_assert_eq!(status.printing(), job);
    }

    #[test]
    fn heating_fraction_stays_in_range(
        samples in prop::collection::vec((-50.0f64..400.0, 0.0f64..300.0), 1..30),
    ) {
        let mut tracker = HeatingTracker::default();
        for (current, target) in samples {
            let reading = HeaterStatus::new(HeaterState::Active, current, target);
            tracker.observe(HeaterId::Bed, &reading);
            let fraction = tracker.fraction(HeaterId::Bed);
            prop_assert!((0.0..=1.0).contains(&fraction));
            match tracker.state(HeaterId::Bed) {
                HeatingProgressState::AtTarget => prop_assert_eq!(fraction, 1.0),
                HeatingProgressState::Off => prop_assert_eq!(fraction, 0.0),
                _ => {}
            }
        }
    }
}
