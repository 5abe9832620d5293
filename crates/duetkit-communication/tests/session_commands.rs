mod common;

use common::{ack, payload, session, status_with, ScriptedTransport};
use duetkit_communication::{AtxPowerOutcome, ClearFaultOutcome, Operation, PrinterSession};
use duetkit_core::{HeaterId, SessionEvent, TransportError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_clear_fault_on_healthy_heater_is_a_no_op() {
    let transport = ScriptedTransport::new(|operation, _| match operation {
        Operation::GetStatus => Ok(status_with("I", (22.0, 0.0, 0), (180.0, 200.0, 2))),
        _ => Ok(ack()),
    });
    let session = session(Arc::clone(&transport));
    session.fetch_status().await.unwrap();

    let outcome = session.clear_fault(HeaterId::Bed).await.unwrap();
    assert_eq!(outcome, ClearFaultOutcome::NotFaulted);
    let outcome = session.clear_fault(HeaterId::PRIMARY_HOTEND).await.unwrap();
    assert_eq!(outcome, ClearFaultOutcome::NotFaulted);
    assert_eq!(transport.count(Operation::ClearFault), 0);
}

#[tokio::test]
async fn test_clear_fault_on_faulted_heater_is_sent() {
    let transport = ScriptedTransport::new(|operation, _| match operation {
        Operation::GetStatus => Ok(status_with("I", (22.0, 0.0, 0), (25.0, 200.0, 3))),
        _ => Ok(ack()),
    });
    let session = session(Arc::clone(&transport));
    session.fetch_status().await.unwrap();

    let outcome = session.clear_fault(HeaterId::PRIMARY_HOTEND).await.unwrap();
    assert_eq!(outcome, ClearFaultOutcome::Cleared);
    let sent = transport.calls_of(Operation::ClearFault);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].get_u64("heater"), Some(1));

    let err = session.clear_fault(HeaterId::Hotend(4)).await.unwrap_err();
    assert!(err.is_validation_error());
}

#[tokio::test]
async fn test_clear_fault_without_status_asks_the_printer() {
    let transport = ScriptedTransport::idle();
    let session = session(Arc::clone(&transport));
    let outcome = session.clear_fault(HeaterId::Bed).await.unwrap();
    assert_eq!(outcome, ClearFaultOutcome::Cleared);
    assert_eq!(transport.count(Operation::ClearFault), 1);
}

#[tokio::test]
async fn test_power_off_with_lost_confirmation() {
    let transport = ScriptedTransport::new(|operation, _| match operation {
        Operation::GetStatus => Ok(payload(json!({"status": "I", "params": {"atxPower": 1}}))),
        Operation::SetAtxPower => Err(TransportError::Unreachable {
            reason: "connection reset".to_string(),
        }),
        _ => Ok(ack()),
    });
    let session = session(Arc::clone(&transport));
    let before = session.fetch_status().await.unwrap();
    let mut events = session.subscribe();

    let outcome = session.set_atx_power(false).await.unwrap();
    assert!(matches!(outcome, AtxPowerOutcome::ConfirmationLost(TransportError::Unreachable { .. })));
    assert!(session.confirmation_lost());
    assert!(Arc::ptr_eq(&session.status().unwrap(), &before));
    assert!(session.last_poll_failure().is_none());

    let mut published = Vec::new();
    while let Ok(event) = events.try_recv() {
        published.push(event);
    }
    assert!(published.iter().any(|event| matches!(event, SessionEvent::ConfirmationLost)));
    assert!(!published
        .iter()
        .any(|event| matches!(event, SessionEvent::CommandFailed { .. })));

    session.fetch_status().await.unwrap();
    assert!(!session.confirmation_lost());
}

#[tokio::test]
async fn test_power_on_failure_is_an_error() {
    let transport = ScriptedTransport::new(|_, _| {
        Err(TransportError::Unreachable {
            reason: "no route".to_string(),
        })
    });
    let session = session(transport);
    let err = session.set_atx_power(true).await.unwrap_err();
    assert!(err.is_transport_failure());
    assert!(!session.confirmation_lost());
}

#[tokio::test]
async fn test_power_on_confirmed() {
    let transport = ScriptedTransport::idle();
    let session = session(Arc::clone(&transport));
    let outcome = session.set_atx_power(true).await.unwrap();
    assert_eq!(outcome, AtxPowerOutcome::Confirmed);
    assert_eq!(transport.calls_of(Operation::SetAtxPower)[0].get_bool("on"), Some(true));
}

#[tokio::test]
async fn test_rejection_is_surfaced_verbatim() {
    let transport = ScriptedTransport::new(|operation, _| match operation {
        Operation::Resume => Ok(payload(json!({"err": 1, "message": "printer is not paused"}))),
        _ => Ok(ack()),
    });
    let session = session(Arc::clone(&transport));

    let err = session.resume_print().await.unwrap_err();
    assert!(err.is_rejection());
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("printer is not paused"));
    assert_eq!(transport.count(Operation::Resume), 1);
}

#[tokio::test]
async fn test_invalid_targets_rejected_before_dispatch() {
    let transport = ScriptedTransport::idle();
    let session = session(Arc::clone(&transport));

    for target in [-5.0, f64::NAN, 151.0] {
        let err = session.set_bed_temperature(target).await.unwrap_err();
        assert!(err.is_validation_error(), "target {}", target);
    }
    assert!(session.set_hotend_temperature(400.0).await.unwrap_err().is_validation_error());
    assert!(session.set_speed_factor(0.0).await.unwrap_err().is_validation_error());
    assert!(session.set_extrusion_factor(-1.0).await.unwrap_err().is_validation_error());
    assert!(session.babystep(f64::INFINITY).await.unwrap_err().is_validation_error());
    assert!(session.run_macro("").await.unwrap_err().is_validation_error());
    assert!(session.set_adjusted_filament_diameter(0.0).is_err());

    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_out_of_range_heater_rejected_before_dispatch() {
    let transport = ScriptedTransport::idle();
    let session = session(Arc::clone(&transport));
    let heater = HeaterId::Hotend(usize::MAX);

    let err = session.set_heater_temperature(heater, 100.0).await.unwrap_err();
    assert!(err.is_validation_error());
    let err = session.clear_fault(heater).await.unwrap_err();
    assert!(err.is_validation_error());

    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_zero_target_turns_heater_off() {
    let transport = ScriptedTransport::idle();
    let session = session(Arc::clone(&transport));
    session.set_hotend_temperature(0.0).await.unwrap();

    let sent = transport.calls_of(Operation::SetHeaterTarget);
    assert_eq!(sent[0].get_u64("heater"), Some(1));
    assert_eq!(sent[0].get_f64("target"), Some(0.0));
}

#[tokio::test]
async fn test_extrusion_factor_compensates_filament_diameter() {
    let transport = ScriptedTransport::idle();
    let session = session(Arc::clone(&transport));
    assert_eq!(session.nominal_filament_diameter(), 1.75);

    session.set_extrusion_factor(1.0).await.unwrap();
    session.set_adjusted_filament_diameter(1.85).unwrap();
    session.set_extrusion_factor(1.0).await.unwrap();
    session.set_speed_factor(1.5).await.unwrap();

    let sent = transport.calls_of(Operation::SetFactor);
    assert_eq!(sent[0].get_str("factor"), Some("extrusion"));
    assert!((sent[0].get_f64("value").unwrap() - 100.0).abs() < 1e-9);

    let expected = 100.0 * (1.75f64 / 1.85).powi(2);
    assert!((sent[1].get_f64("value").unwrap() - expected).abs() < 1e-9);

    assert_eq!(sent[2].get_str("factor"), Some("speed"));
    assert!((sent[2].get_f64("value").unwrap() - 150.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_simulation_mode_and_duration() {
    let transport = ScriptedTransport::new(|operation, _| match operation {
        Operation::GetSimulationTime => Ok(payload(json!({"err": 0, "seconds": 3725.0}))),
        _ => Ok(ack()),
    });
    let session = session(Arc::clone(&transport));

    session.print_file("0:/gcodes/cube.gcode").await.unwrap();
    session.set_simulation_mode(true);
    assert!(session.simulation_mode());
    session.print_file("0:/gcodes/cube.gcode").await.unwrap();

    let prints = transport.calls_of(Operation::Print);
    assert_eq!(prints[0].get_bool("simulate"), Some(false));
    assert_eq!(prints[1].get_bool("simulate"), Some(true));
    assert_eq!(prints[1].get_str("path"), Some("0:/gcodes/cube.gcode"));

    let duration = session.fetch_simulation_duration().await.unwrap();
    assert_eq!(duration, Duration::from_secs(3725));
}

#[tokio::test]
async fn test_state_commands_are_forwarded() {
    let transport = ScriptedTransport::idle();
    let session = session(Arc::clone(&transport));

    session.home().await.unwrap();
    session.probe().await.unwrap();
    session.pause_print().await.unwrap();
    session.resume_print().await.unwrap();
    session.cancel_print().await.unwrap();
    session.run_macro("0:/macros/Load Filament").await.unwrap();
    session.babystep(-0.02).await.unwrap();

    let operations: Vec<_> = transport.calls().into_iter().map(|(op, _)| op).collect();
    assert_eq!(
        operations,
        vec![
            Operation::Home,
            Operation::Probe,
            Operation::Pause,
            Operation::Resume,
            Operation::Cancel,
            Operation::RunMacro,
            Operation::Babystep,
        ]
    );
}

#[tokio::test]
async fn test_refresh_after_command() {
    let transport = ScriptedTransport::idle();
    let mut config = common::test_config(false);
    config.connection.refresh_after_command = true;
    let session = PrinterSession::with_config(config, Arc::clone(&transport) as _).unwrap();

    session.home().await.unwrap();
    transport.wait_for_calls(Operation::GetStatus, 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(session.status().is_some());
}

#[tokio::test]
async fn test_open_validates_endpoint() {
    let transport = ScriptedTransport::idle();
    assert!(PrinterSession::open("", 80, false, Arc::clone(&transport) as _)
        .unwrap_err()
        .is_validation_error());
    assert!(PrinterSession::open("duet.local", 0, false, Arc::clone(&transport) as _).is_err());

    let session = PrinterSession::open("duet.local", 8080, false, transport as _).unwrap();
    assert_eq!(session.hostname(), "duet.local");
    assert_eq!(session.port(), 8080);
    assert!(!session.is_auto_updating());
}
