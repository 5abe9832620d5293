//! Argument checks made before anything is dispatched

use duetkit_core::{HeaterId, ValidationError};
use duetkit_settings::LimitSettings;

/// Check a server-relative path
pub fn validate_path(path: &str) -> Result<(), ValidationError> {
    if path.trim().is_empty() {
        return Err(ValidationError::EmptyPath);
    }
    let invalid = |reason: &str| ValidationError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    if path.contains("://") {
        return Err(invalid("must be server-relative"));
    }
    if path.chars().any(char::is_control) {
        return Err(invalid("contains control characters"));
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(invalid("parent directory references are not allowed"));
    }
    Ok(())
}

/// Check a hostname and port
pub fn validate_endpoint(hostname: &str, port: u16) -> Result<(), ValidationError> {
    if hostname.trim().is_empty() {
        return Err(ValidationError::InvalidEndpoint {
            reason: "hostname is empty".to_string(),
        });
    }
    if hostname.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(ValidationError::InvalidEndpoint {
            reason: format!("'{}' is not a hostname", hostname),
        });
    }
    if port == 0 {
        return Err(ValidationError::InvalidEndpoint {
            reason: "port must be non-zero".to_string(),
        });
    }
    Ok(())
}

/// Check a heater target; 0 turns the heater off
pub fn validate_temperature(
    heater: HeaterId,
    target: f64,
    limits: &LimitSettings,
) -> Result<(), ValidationError> {
    let max = match heater {
        HeaterId::Bed => limits.max_bed_temperature,
        HeaterId::Hotend(_) => limits.max_hotend_temperature,
    };
    if !target.is_finite() || target < 0.0 || target > max {
        return Err(ValidationError::TemperatureOutOfRange {
            value: target,
            min: 0.0,
            max,
        });
    }
    Ok(())
}

/// Resolve the firmware number of a heater
pub fn validate_heater(heater: HeaterId) -> Result<u64, ValidationError> {
    heater
        .heater_number()
        .ok_or_else(|| ValidationError::UnknownHeater {
            heater: heater.to_string(),
        })
}

/// Check a speed or extrusion multiplier
pub fn validate_factor(name: &str, factor: f64) -> Result<(), ValidationError> {
    if !(factor > 0.0 && factor.is_finite()) {
        return Err(ValidationError::InvalidFactor {
            name: name.to_string(),
            value: factor,
        });
    }
    Ok(())
}

/// Check a babystep offset
pub fn validate_offset(offset: f64) -> Result<(), ValidationError> {
    if !offset.is_finite() {
        return Err(ValidationError::InvalidOffset { value: offset });
    }
    Ok(())
}

/// Check a filament diameter
pub fn validate_filament_diameter(diameter: f64) -> Result<(), ValidationError> {
    if !(diameter > 0.0 && diameter.is_finite()) {
        return Err(ValidationError::InvalidFilamentDiameter { value: diameter });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert!(validate_path("0:/gcodes/part.gcode").is_ok());
        assert!(validate_path("/macros/Home All").is_ok());
        assert_eq!(validate_path("  "), Err(ValidationError::EmptyPath));
        assert!(validate_path("http://printer/gcodes").is_err());
        assert!(validate_path("0:/gcodes/../sys/config.g").is_err());
        assert!(validate_path("0:/gcodes/a\n.g").is_err());
    }

    #[test]
    fn test_endpoints() {
        assert!(validate_endpoint("duet.local", 80).is_ok());
        assert!(validate_endpoint("", 80).is_err());
        assert!(validate_endpoint("duet local", 80).is_err());
        assert!(validate_endpoint("duet.local", 0).is_err());
    }

    #[test]
    fn test_temperatures() {
        let limits = LimitSettings::default();
        assert!(validate_temperature(HeaterId::Bed, 0.0, &limits).is_ok());
        assert!(validate_temperature(HeaterId::Bed, 150.0, &limits).is_ok());
        assert!(validate_temperature(HeaterId::Bed, 151.0, &limits).is_err());
        assert!(validate_temperature(HeaterId::PRIMARY_HOTEND, 280.0, &limits).is_ok());
        assert!(validate_temperature(HeaterId::PRIMARY_HOTEND, -1.0, &limits).is_err());
        assert!(validate_temperature(HeaterId::PRIMARY_HOTEND, f64::NAN, &limits).is_err());
    }

    #[test]
    fn test_heater_numbers() {
        assert_eq!(validate_heater(HeaterId::Bed), Ok(0));
        assert_eq!(validate_heater(HeaterId::Hotend(1)), Ok(2));
        assert!(matches!(
            validate_heater(HeaterId::Hotend(usize::MAX)),
            Err(ValidationError::UnknownHeater { .. })
        ));
    }

    #[test]
    fn test_factors_and_offsets() {
        assert!(validate_factor("speed", 1.2).is_ok());
        assert!(validate_factor("speed", 0.0).is_err());
        assert!(validate_offset(-0.05).is_ok());
        assert!(validate_offset(f64::INFINITY).is_err());
        assert!(validate_filament_diameter(2.85).is_ok());
        assert!(validate_filament_diameter(0.0).is_err());
    }
}
