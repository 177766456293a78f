//! Configuration for the urban sound pipeline.
//!
//! Provides `AppConfig` (top-level settings), one sub-config per subsystem,
//! `AppPaths` for the platform config directory, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, CaptureConfig, ClassifierConfig, DeviceConfig, OverflowPolicy, ProcessingConfig,
    PublishConfig, QueueConfig, RetryConfig, SensorKind, TelemetryConfig, MAX_CAPTURE_SECS,
    MAX_DEQUEUE_TIMEOUT_MS,
};
