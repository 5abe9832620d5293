//! Printer commands
//!
//! State-transition commands are always forwarded; the printer decides
//! whether they are valid and its rejection is surfaced as a command error.
//! Parameter commands are range-checked locally first.

use super::validate::{
    validate_factor, validate_heater, validate_offset, validate_path, validate_temperature,
};
use super::PrinterSession;
use crate::firmware::duet::{command_creator, parse_simulation_time, FactorKind, Request};
use crate::transport::{Operation, Payload};
use duetkit_core::{Error, HeaterId, Result, SessionEvent, TransportError, ValidationError};
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Outcome of a fault-clear request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearFaultOutcome {
    /// The printer acknowledged the clear
    Cleared,
    /// The heater was not faulted; nothing was sent
    NotFaulted,
}

/// Outcome of a power-supply switch
#[derive(Debug, Clone, PartialEq)]
pub enum AtxPowerOutcome {
    /// The printer acknowledged the switch
    Confirmed,
    /// Power-off was sent but the acknowledgement never arrived, most
    /// likely because the board lost power
    ConfirmationLost(TransportError),
}

impl PrinterSession {
    /// Dispatch a command and record its acknowledgement
    pub(super) async fn command(&self, request: Request) -> Result<Payload> {
        self.command_for_heater(request, None).await
    }

    /// Dispatch a command; on acknowledgement `heater` is marked as awaiting
    /// a fresh status
    async fn command_for_heater(
        &self,
        request: Request,
        heater: Option<HeaterId>,
    ) -> Result<Payload> {
        let operation = request.operation;
        let (sequence, outcome) = self.dispatch(request, heater).await;
        if let Err(err) = &outcome {
            self.report_failure(operation, sequence, err);
        }
        outcome
    }

    /// One command round trip, acknowledged on success; failures are left
    /// to the caller to report
    async fn dispatch(&self, request: Request, heater: Option<HeaterId>) -> (u64, Result<Payload>) {
        let operation = request.operation;
        let sequence = self.inner.sequencer.next();
        tracing::debug!(operation = %operation, sequence, "Dispatching command");

        let outcome = self.round_trip(request).await;
        if outcome.is_ok() {
            self.acknowledge(operation, sequence, heater);
        }
        (sequence, outcome)
    }

    fn report_failure(&self, operation: Operation, sequence: u64, err: &Error) {
        if err.is_rejection() {
            tracing::warn!(operation = %operation, sequence, error = %err, "Command rejected");
        } else {
            tracing::warn!(operation = %operation, sequence, error = %err, "Command failed");
        }
        self.publish(SessionEvent::CommandFailed {
            operation: operation.to_string(),
            error: err.to_string(),
        });
    }

    fn acknowledge(&self, operation: Operation, sequence: u64, heater: Option<HeaterId>) {
        let mutates = operation.mutates_printer_state();
        if mutates || heater.is_some() {
            let mut state = self.inner.state.write();
            if mutates {
                state.mutation_sequence = state.mutation_sequence.max(sequence);
            }
            if let Some(heater) = heater {
                // Only statuses dispatched after this point can reflect the new target
                let mark = self.inner.sequencer.current();
                state.awaiting_heaters.insert(heater, mark);
            }
        }

        tracing::debug!(operation = %operation, sequence, "Command acknowledged");
        self.publish(SessionEvent::CommandCompleted {
            operation: operation.to_string(),
            sequence,
        });
        for listener in self.listeners() {
            tokio::spawn(async move {
                listener.on_command_complete(operation.as_str()).await;
            });
        }

        if mutates && self.inner.config.connection.refresh_after_command {
            self.refresh_status();
        }
    }

    /// Run a macro file
    pub async fn run_macro(&self, path: &str) -> Result<()> {
        validate_path(path)?;
        self.command(command_creator::run_macro(path)).await?;
        Ok(())
    }

    /// Print a file, or simulate it when simulation mode is on
    pub async fn print_file(&self, path: &str) -> Result<()> {
        validate_path(path)?;
        let simulate = self.simulation_mode();
        self.command(command_creator::print(path, simulate)).await?;
        Ok(())
    }

    /// Home all axes
    pub async fn home(&self) -> Result<()> {
        self.command(Request::bare(Operation::Home)).await?;
        Ok(())
    }

    /// Probe the bed
    pub async fn probe(&self) -> Result<()> {
        self.command(Request::bare(Operation::Probe)).await?;
        Ok(())
    }

    /// Cancel the print
    pub async fn cancel_print(&self) -> Result<()> {
        self.command(Request::bare(Operation::Cancel)).await?;
        Ok(())
    }

    /// Pause the print
    pub async fn pause_print(&self) -> Result<()> {
        self.command(Request::bare(Operation::Pause)).await?;
        Ok(())
    }

    /// Resume a paused print
    pub async fn resume_print(&self) -> Result<()> {
        self.command(Request::bare(Operation::Resume)).await?;
        Ok(())
    }

    /// Set the bed target in °C; 0 turns the bed off
    pub async fn set_bed_temperature(&self, target: f64) -> Result<()> {
        self.set_heater_temperature(HeaterId::Bed, target).await
    }

    /// Set the primary hotend target in °C; 0 turns it off
    pub async fn set_hotend_temperature(&self, target: f64) -> Result<()> {
        self.set_heater_temperature(HeaterId::PRIMARY_HOTEND, target)
            .await
    }

    /// Set any heater's target in °C
    ///
    /// The heater stays pending until a status dispatched after the
    /// acknowledgement has been applied.
    pub async fn set_heater_temperature(&self, heater: HeaterId, target: f64) -> Result<()> {
        let number = validate_heater(heater)?;
        validate_temperature(heater, target, &self.inner.config.limits)?;
        self.ensure_heater_exists(heater)?;

        self.command_for_heater(command_creator::set_heater_target(number, target), Some(heater))
            .await?;
        Ok(())
    }

    /// Set the speed factor (1.0 = 100%)
    pub async fn set_speed_factor(&self, factor: f64) -> Result<()> {
        validate_factor("speed", factor)?;
        self.command(command_creator::set_factor(FactorKind::Speed, factor))
            .await?;
        Ok(())
    }

    /// Set the extrusion factor (1.0 = 100%)
    ///
    /// The value sent is compensated for the difference between the nominal
    /// and the measured filament diameter.
    pub async fn set_extrusion_factor(&self, factor: f64) -> Result<()> {
        validate_factor("extrusion", factor)?;
        let compensated = factor * self.filament_compensation();
        self.command(command_creator::set_factor(FactorKind::Extrusion, compensated))
            .await?;
        Ok(())
    }

    /// Extrusion multiplier for the measured filament diameter
    pub fn filament_compensation(&self) -> f64 {
        let ratio = self.nominal_filament_diameter() / self.adjusted_filament_diameter();
        ratio * ratio
    }

    /// Adjust the Z babystep offset in mm
    pub async fn babystep(&self, offset: f64) -> Result<()> {
        validate_offset(offset)?;
        self.command(command_creator::babystep(offset)).await?;
        Ok(())
    }

    /// Clear a latched heater fault
    ///
    /// When the cached status shows the heater is not faulted nothing is
    /// sent and `NotFaulted` is returned. Without a cached status the
    /// request goes to the printer.
    pub async fn clear_fault(&self, heater: HeaterId) -> Result<ClearFaultOutcome> {
        let number = validate_heater(heater)?;
        if let Some(status) = self.status() {
            match status.heater(heater) {
                None => return Err(unknown_heater(heater)),
                Some(reading) if !reading.is_faulted() => {
                    tracing::debug!(heater = %heater, "Heater not faulted, nothing to clear");
                    return Ok(ClearFaultOutcome::NotFaulted);
                }
                Some(_) => {}
            }
        }

        self.command(command_creator::clear_fault(number)).await?;
        Ok(ClearFaultOutcome::Cleared)
    }

    /// Switch the ATX power supply
    ///
    /// The board may drop off the network as soon as power is cut, so a
    /// transport failure after a power-off request is reported as
    /// `ConfirmationLost` rather than an error. The cached status is left
    /// untouched.
    pub async fn set_atx_power(&self, on: bool) -> Result<AtxPowerOutcome> {
        let (sequence, outcome) = self.dispatch(command_creator::set_atx_power(on), None).await;
        match outcome {
            Ok(_) => Ok(AtxPowerOutcome::Confirmed),
            Err(Error::Transport(err)) if !on => {
                tracing::warn!(sequence, error = %err, "Power-off sent but not confirmed");
                self.inner.confirmation_lost.store(true, Ordering::SeqCst);
                self.publish(SessionEvent::ConfirmationLost);
                Ok(AtxPowerOutcome::ConfirmationLost(err))
            }
            Err(err) => {
                self.report_failure(Operation::SetAtxPower, sequence, &err);
                Err(err)
            }
        }
    }

    /// Duration of the last simulated print
    pub async fn fetch_simulation_duration(&self) -> Result<Duration> {
        let payload = self
            .round_trip(Request::bare(Operation::GetSimulationTime))
            .await?;
        Ok(parse_simulation_time(&payload)?)
    }

    fn ensure_heater_exists(&self, heater: HeaterId) -> Result<()> {
        match self.status() {
            Some(status) if status.heater(heater).is_none() => Err(unknown_heater(heater)),
            _ => Ok(()),
        }
    }
}

fn unknown_heater(heater: HeaterId) -> Error {
    ValidationError::UnknownHeater {
        heater: heater.to_string(),
    }
    .into()
}
