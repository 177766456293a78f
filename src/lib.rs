//! Urban Sounds — unattended ambient-audio classification for edge devices.
//!
//! Records fixed-length audio windows, scores each against a label
//! vocabulary, attaches a peak-to-peak amplitude metric and the device
//! temperature, and publishes a JSON report per window over MQTT.

pub mod audio;
pub mod classify;
pub mod config;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod telemetry;
