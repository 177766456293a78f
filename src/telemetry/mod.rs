//! Device telemetry attached to every report.
//!
//! Only the device temperature is collected. Which sensor is used comes from
//! [`TelemetryConfig::source`]; `auto` tries the Raspberry Pi firmware tool
//! first and falls back to the Linux thermal zone.

pub mod sensor;

pub use sensor::{AutoSensor, NoSensor, TelemetrySource, ThermalZoneSensor, VcgencmdSensor};

#[cfg(test)]
pub use sensor::FixedTemperature;

use crate::config::{SensorKind, TelemetryConfig};

/// Build the configured temperature source.
pub fn from_config(config: &TelemetryConfig) -> Box<dyn TelemetrySource> {
    match config.source {
        SensorKind::Auto => Box::new(AutoSensor::platform_default()),
        SensorKind::Vcgencmd => Box::new(VcgencmdSensor::new()),
        SensorKind::ThermalZone => Box::new(ThermalZoneSensor::new(&config.thermal_zone_path)),
        SensorKind::None => Box::new(NoSensor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_source_is_always_absent() {
        let config = TelemetryConfig {
            source: SensorKind::None,
            ..TelemetryConfig::default()
        };
        assert_eq!(from_config(&config).read_temperature(), None);
    }

    #[test]
    fn thermal_zone_source_uses_configured_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("temp");
        std::fs::write(&path, "51000").unwrap();

        let config = TelemetryConfig {
            source: SensorKind::ThermalZone,
            thermal_zone_path: path,
        };
        assert_eq!(from_config(&config).read_temperature(), Some(51.0));
    }
}
