//! Device temperature sensors.
//!
//! Absence is a normal outcome (desktop dev machines, containers, boards
//! without a thermal zone), so every source returns `Option<f32>` and never
//! an error.

use std::path::PathBuf;
use std::process::Command;

// ---------------------------------------------------------------------------
// TelemetrySource trait
// ---------------------------------------------------------------------------

/// On-demand device temperature in degrees Celsius.
pub trait TelemetrySource: Send + Sync {
    /// `None` when the sensor is missing or unreadable.
    fn read_temperature(&self) -> Option<f32>;
}

// ---------------------------------------------------------------------------
// VcgencmdSensor
// ---------------------------------------------------------------------------

/// Raspberry Pi firmware readout via `vcgencmd measure_temp`.
#[derive(Debug, Clone)]
pub struct VcgencmdSensor {
    program: String,
}

impl VcgencmdSensor {
    pub fn new() -> Self {
        Self {
            program: "vcgencmd".into(),
        }
    }
}

impl Default for VcgencmdSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySource for VcgencmdSensor {
    fn read_temperature(&self) -> Option<f32> {
        let output = match Command::new(&self.program).arg("measure_temp").output() {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                log::debug!("telemetry: {} exited with {}", self.program, output.status);
                return None;
            }
            Err(e) => {
                log::debug!("telemetry: {} unavailable: {e}", self.program);
                return None;
            }
        };

        parse_vcgencmd(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extract the number from `temp=54.9'C`.
pub(crate) fn parse_vcgencmd(output: &str) -> Option<f32> {
    let rest = &output[output.find("temp=")? + "temp=".len()..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

// ---------------------------------------------------------------------------
// ThermalZoneSensor
// ---------------------------------------------------------------------------

/// Linux sysfs readout (millidegrees Celsius).
#[derive(Debug, Clone)]
pub struct ThermalZoneSensor {
    path: PathBuf,
}

impl ThermalZoneSensor {
    pub const DEFAULT_PATH: &'static str = "/sys/class/thermal/thermal_zone0/temp";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ThermalZoneSensor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PATH)
    }
}

impl TelemetrySource for ThermalZoneSensor {
    fn read_temperature(&self) -> Option<f32> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let millidegrees: i64 = content.trim().parse().ok()?;
        Some(millidegrees as f32 / 1000.0)
    }
}

// ---------------------------------------------------------------------------
// AutoSensor / NoSensor
// ---------------------------------------------------------------------------

/// Tries each source in order and returns the first reading.
pub struct AutoSensor {
    sources: Vec<Box<dyn TelemetrySource>>,
}

impl AutoSensor {
    pub fn new(sources: Vec<Box<dyn TelemetrySource>>) -> Self {
        Self { sources }
    }

    /// `vcgencmd` first, then the default thermal zone.
    pub fn platform_default() -> Self {
        Self::new(vec![
            Box::new(VcgencmdSensor::new()),
            Box::new(ThermalZoneSensor::default()),
        ])
    }
}

impl TelemetrySource for AutoSensor {
    fn read_temperature(&self) -> Option<f32> {
        self.sources.iter().find_map(|s| s.read_temperature())
    }
}

/// A source that is never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSensor;

impl TelemetrySource for NoSensor {
    fn read_temperature(&self) -> Option<f32> {
        None
    }
}

// ---------------------------------------------------------------------------
// FixedTemperature  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub struct FixedTemperature(pub Option<f32>);

#[cfg(test)]
impl TelemetrySource for FixedTemperature {
    fn read_temperature(&self) -> Option<f32> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
