//! Typed field access for Duet JSON records
//!
//! Every accessor takes the dotted path of the field so a decode error
//! names exactly which value was wrong.

use duetkit_core::DecodeError;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// Dotted path of a field inside a payload, e.g. `temps.heads.state[1]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(String);

impl FieldPath {
    /// Path of the payload itself
    pub fn root() -> Self {
        Self::default()
    }

    /// Path of a named member
    pub fn key(&self, key: &str) -> Self {
        if self.0.is_empty() {
            Self(key.to_string())
        } else {
            Self(format!("{}.{}", self.0, key))
        }
    }

    /// Path of an array element
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("payload")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Build an invalid-field error
pub fn invalid(path: &FieldPath, reason: impl Into<String>) -> DecodeError {
    DecodeError::InvalidField {
        field: path.to_string(),
        reason: reason.into(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn expected(path: &FieldPath, what: &str, value: &Value) -> DecodeError {
    invalid(path, format!("expected {}, found {}", what, type_name(value)))
}

/// Nested record
pub fn object<'a>(value: &'a Value, path: &FieldPath) -> Result<&'a Map<String, Value>, DecodeError> {
    value.as_object().ok_or_else(|| DecodeError::NotAnObject {
        context: path.to_string(),
    })
}

/// Array
pub fn array<'a>(value: &'a Value, path: &FieldPath) -> Result<&'a Vec<Value>, DecodeError> {
    value.as_array().ok_or_else(|| expected(path, "an array", value))
}

/// String
pub fn string<'a>(value: &'a Value, path: &FieldPath) -> Result<&'a str, DecodeError> {
    value.as_str().ok_or_else(|| expected(path, "a string", value))
}

/// Any JSON number
pub fn number(value: &Value, path: &FieldPath) -> Result<f64, DecodeError> {
    value.as_f64().ok_or_else(|| expected(path, "a number", value))
}

/// Integer; whole floats such as `2.0` are accepted
pub fn integer(value: &Value, path: &FieldPath) -> Result<i64, DecodeError> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        Some(f) => Err(invalid(path, format!("expected an integer, found {}", f))),
        None => Err(expected(path, "an integer", value)),
    }
}

/// Non-negative byte count or similar
pub fn unsigned(value: &Value, path: &FieldPath) -> Result<u64, DecodeError> {
    let n = integer(value, path)?;
    u64::try_from(n).map_err(|_| invalid(path, format!("{} is negative", n)))
}

/// Finite temperature in °C
pub fn temperature(value: &Value, path: &FieldPath) -> Result<f64, DecodeError> {
    let t = number(value, path)?;
    if !t.is_finite() {
        return Err(invalid(path, "temperature is not finite"));
    }
    Ok(t)
}

/// Finite non-negative length in mm
pub fn length(value: &Value, path: &FieldPath) -> Result<f64, DecodeError> {
    let mm = number(value, path)?;
    if !(mm >= 0.0 && mm.is_finite()) {
        return Err(invalid(path, format!("{} is not a valid length", mm)));
    }
    Ok(mm)
}

/// Finite non-negative number of seconds
pub fn seconds(value: &Value, path: &FieldPath) -> Result<Duration, DecodeError> {
    let secs = number(value, path)?;
    if !(secs >= 0.0 && secs.is_finite()) {
        return Err(invalid(path, format!("{} is not a valid duration", secs)));
    }
    Duration::try_from_secs_f64(secs).map_err(|err| invalid(path, err.to_string()))
}
