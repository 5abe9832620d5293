//! Duet Extended Status Parsing
//!
//! Decodes the extended status record returned by `get-status` into a
//! [`PrinterStatus`]. Decoding is strict: a field that is present but has
//! the wrong type or an out-of-range value fails the whole decode, and
//! defaults are only substituted for fields that are absent.

use super::fields::{self, FieldPath};
use crate::transport::Payload;
use duetkit_core::{DecodeError, HeaterState, HeaterStatus, PrinterState, PrinterStatus};
use serde_json::{Map, Value};

/// Map a firmware status letter to a printer state
pub fn printer_state_from_letter(letter: &str) -> Option<PrinterState> {
    match letter {
        "I" | "O" => Some(PrinterState::Idle),
        "B" | "T" => Some(PrinterState::Busy),
        "P" | "M" => Some(PrinterState::Printing),
        "S" | "A" => Some(PrinterState::Paused),
        "D" => Some(PrinterState::Pausing),
        "R" => Some(PrinterState::Resuming),
        "H" => Some(PrinterState::Halted),
        "C" => Some(PrinterState::ReadingConfig),
        "F" => Some(PrinterState::FlashingFirmware),
        _ => None,
    }
}

/// Decode an extended status payload
pub fn parse_status(payload: &Payload) -> Result<PrinterStatus, DecodeError> {
    parse_status_fields(payload.fields())
}

/// Decode an extended status record held as a JSON object
pub fn parse_status_fields(record: &Map<String, Value>) -> Result<PrinterStatus, DecodeError> {
    let root = FieldPath::root();
    let mut status = PrinterStatus::default();

    if let Some(value) = record.get("status") {
        let path = root.key("status");
        let letter = fields::string(value, &path)?;
        status.state =
            printer_state_from_letter(letter).ok_or_else(|| DecodeError::UnknownState {
                field: path.to_string(),
                value: letter.to_string(),
            })?;
    }

    if let Some(value) = record.get("name") {
        status.name = Some(fields::string(value, &root.key("name"))?.to_string());
    }

    if let Some(value) = record.get("fractionPrinted") {
        let path = root.key("fractionPrinted");
        let percent = fields::number(value, &path)?;
        if !(0.0..=100.0).contains(&percent) {
            return Err(fields::invalid(&path, format!("{} is not a percentage", percent)));
        }
        status.fraction_printed = percent / 100.0;
    }

    if let Some(value) = record.get("printDuration") {
        status.print_duration = fields::seconds(value, &root.key("printDuration"))?;
    }

    if let Some(value) = record.get("timesLeft") {
        let path = root.key("timesLeft");
        let times = fields::object(value, &path)?;
        let estimate = ["file", "filament", "layer"]
            .iter()
            .find_map(|key| times.get(*key).map(|v| (*key, v)));
        if let Some((key, value)) = estimate {
            status.time_remaining = fields::seconds(value, &path.key(key))?;
        }
    }

    if let Some(value) = record.get("currentLayer") {
        let path = root.key("currentLayer");
        let layer = fields::integer(value, &path)?;
        status.current_layer = match layer {
            -1 => None,
            n if n >= 0 => Some(
                u32::try_from(n).map_err(|_| fields::invalid(&path, "layer out of range"))?,
            ),
            n => return Err(fields::invalid(&path, format!("{} is below -1", n))),
        };
    }

    if let Some(value) = record.get("params") {
        parse_params(fields::object(value, &root.key("params"))?, &root.key("params"), &mut status)?;
    }

    if let Some(value) = record.get("temps") {
        let path = root.key("temps");
        let temps = fields::object(value, &path)?;
        if let Some(bed) = temps.get("bed") {
            status.bed = parse_bed(fields::object(bed, &path.key("bed"))?, &path.key("bed"))?;
        }
        if let Some(heads) = temps.get("heads") {
            status.hotends =
                parse_heads(fields::object(heads, &path.key("heads"))?, &path.key("heads"))?;
        }
    }

    Ok(status)
}

fn parse_params(
    params: &Map<String, Value>,
    path: &FieldPath,
    status: &mut PrinterStatus,
) -> Result<(), DecodeError> {
    if let Some(value) = params.get("atxPower") {
        let field = path.key("atxPower");
        status.atx_power = match value {
            Value::Bool(on) => *on,
            _ => match fields::integer(value, &field)? {
                1 => true,
                0 | -1 => false,
                other => return Err(fields::invalid(&field, format!("unexpected value {}", other))),
            },
        };
    }

    if let Some(value) = params.get("speedFactor") {
        status.speed_factor = percent_factor(value, &path.key("speedFactor"))?;
    }

    if let Some(value) = params.get("extrFactors") {
        let field = path.key("extrFactors");
        let factors = fields::array(value, &field)?;
        if let Some(first) = factors.first() {
            status.extrusion_factor = percent_factor(first, &field.index(0))?;
        }
    }

    if let Some(value) = params.get("babystep") {
        let field = path.key("babystep");
        let offset = fields::number(value, &field)?;
        if !offset.is_finite() {
            return Err(fields::invalid(&field, "offset is not finite"));
        }
        status.babystepping_offset = offset;
    }

    Ok(())
}

fn percent_factor(value: &Value, path: &FieldPath) -> Result<f64, DecodeError> {
    let percent = fields::number(value, path)?;
    if !(percent > 0.0 && percent.is_finite()) {
        return Err(fields::invalid(path, format!("factor {} must be positive", percent)));
    }
    Ok(percent / 100.0)
}

fn heater_state(value: &Value, path: &FieldPath) -> Result<HeaterState, DecodeError> {
    let code = fields::integer(value, path)?;
    HeaterState::from_code(code).ok_or_else(|| DecodeError::UnknownState {
        field: path.to_string(),
        value: code.to_string(),
    })
}

fn target_for(state: HeaterState, active: f64, standby: f64) -> f64 {
    match state {
        HeaterState::Active | HeaterState::Tuning | HeaterState::Fault => active,
        HeaterState::Standby => standby,
        HeaterState::Off => 0.0,
    }
}

fn parse_bed(bed: &Map<String, Value>, path: &FieldPath) -> Result<HeaterStatus, DecodeError> {
    let temperature = |key: &str| -> Result<f64, DecodeError> {
        match bed.get(key) {
            Some(value) => fields::temperature(value, &path.key(key)),
            None => Ok(0.0),
        }
    };

    let state = match bed.get("state") {
        Some(value) => heater_state(value, &path.key("state"))?,
        None => HeaterState::Off,
    };
    let current = temperature("current")?;
    let active = temperature("active")?;
    let standby = temperature("standby")?;

    Ok(HeaterStatus::new(state, current, target_for(state, active, standby)))
}

fn parse_heads(
    heads: &Map<String, Value>,
    path: &FieldPath,
) -> Result<Vec<HeaterStatus>, DecodeError> {
    let column = |key: &str| -> Result<Option<&Vec<Value>>, DecodeError> {
        heads
            .get(key)
            .map(|value| fields::array(value, &path.key(key)))
            .transpose()
    };

    let current = column("current")?;
    let active = column("active")?;
    let standby = column("standby")?;
    let state = column("state")?;

    let lengths: Vec<(&str, usize)> = [
        ("current", current),
        ("active", active),
        ("standby", standby),
        ("state", state),
    ]
    .into_iter()
    .filter_map(|(key, column)| column.map(|c| (key, c.len())))
    .collect();

    let count = lengths.first().map(|(_, len)| *len).unwrap_or(0);
    if let Some((key, len)) = lengths.iter().find(|(_, len)| *len != count) {
        return Err(DecodeError::Inconsistent {
            reason: format!(
                "{}.{} has {} entries, expected {}",
                path, key, len, count
            ),
        });
    }

    let temperature_at = |column: Option<&Vec<Value>>, key: &str, index: usize| {
        match column.and_then(|c| c.get(index)) {
            Some(value) => fields::temperature(value, &path.key(key).index(index)),
            None => Ok(0.0),
        }
    };

    (0..count)
        .map(|index| {
            let heater_state = match state.and_then(|c| c.get(index)) {
                Some(value) => heater_state(value, &path.key("state").index(index))?,
                None => HeaterState::Off,
            };
            let current = temperature_at(current, "current", index)?;
            let active = temperature_at(active, "active", index)?;
            let standby = temperature_at(standby, "standby", index)?;
            Ok(HeaterStatus::new(
                heater_state,
                current,
                target_for(heater_state, active, standby),
            ))
        })
        .collect()
}
