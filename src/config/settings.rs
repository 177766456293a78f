//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every section is `#[serde(default)]`: a file that sets only
//! `[device] dev_id = "OE-012"` is a complete configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::classify::{LabelVocabulary, VocabularyError, DEFAULT_LABELS};

/// Longest accepted capture window.
pub const MAX_CAPTURE_SECS: f32 = 3_600.0;

/// Longest accepted dequeue wait; bounds how late a stop request is noticed.
pub const MAX_DEQUEUE_TIMEOUT_MS: u64 = 60_000;

// ---------------------------------------------------------------------------
// DeviceConfig
// ---------------------------------------------------------------------------

/// Identity stamped onto every published report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Application identifier (`app_id` in the wire message).
    pub app_id: String,
    /// Device identifier (`dev_id` in the wire message).
    pub dev_id: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            app_id: "urbansounds".into(),
            dev_id: "OE-007".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Settings for the capture loop and the input device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Length of one capture window in seconds.
    pub duration_secs: f32,
    /// Requested sample rate in Hz. The device's native rate is used (and
    /// recorded on the sample) when this one is unsupported.
    pub sample_rate: u32,
    /// Audio input device name — `None` means the system default.
    pub device_name: Option<String>,
    /// Pause after a failed capture before trying again.
    pub error_backoff_ms: u64,
}

impl CaptureConfig {
    /// Capture window, clamped to `0..=MAX_CAPTURE_SECS`. NaN yields zero.
    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.duration_secs.clamp(0.0, MAX_CAPTURE_SECS))
            .unwrap_or_default()
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            duration_secs: 5.0,
            sample_rate: 48_000,
            device_name: None,
            error_backoff_ms: 1_000,
        }
    }
}

// ---------------------------------------------------------------------------
// ClassifierConfig
// ---------------------------------------------------------------------------

/// Settings for the zero-shot classification service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// URL the audio is POSTed to.
    pub endpoint: String,
    /// Maximum seconds to wait for a classification before timing out.
    pub timeout_secs: u64,
    /// Bearer token — `None` for services on the local network.
    pub api_key: Option<String>,
    /// Candidate labels, in the order they are sent to the service.
    pub labels: Vec<String>,
}

impl ClassifierConfig {
    /// Validated vocabulary built from [`labels`](Self::labels).
    pub fn vocabulary(&self) -> Result<LabelVocabulary, VocabularyError> {
        LabelVocabulary::new(&self.labels)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/classify".into(),
            timeout_secs: 30,
            api_key: None,
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// QueueConfig
// ---------------------------------------------------------------------------

/// What a bounded queue does when a sample arrives and it is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued sample to make room.
    #[default]
    DropOldest,
    /// Discard the incoming sample.
    DropNewest,
    /// Make the capture loop wait for free space.
    Block,
}

/// Settings for the hand-off queue between the two loops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum queued samples — `None` means unbounded.
    pub capacity: Option<usize>,
    /// Applied only when `capacity` is set.
    pub overflow: OverflowPolicy,
}

// ---------------------------------------------------------------------------
// ProcessingConfig
// ---------------------------------------------------------------------------

/// Settings for the processing loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// How long one dequeue waits before re-checking the lifecycle signal.
    pub dequeue_timeout_ms: u64,
    /// Number of top-scoring labels included in each report.
    pub top_n: usize,
}

impl ProcessingConfig {
    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            dequeue_timeout_ms: 250,
            top_n: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// TelemetryConfig
// ---------------------------------------------------------------------------

/// Which temperature source to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// `vcgencmd` if present, otherwise the thermal zone.
    #[default]
    Auto,
    /// Raspberry Pi firmware tool only.
    Vcgencmd,
    /// Linux sysfs thermal zone only.
    ThermalZone,
    /// Never report a temperature.
    None,
}

/// Device telemetry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub source: SensorKind,
    /// File holding the temperature in millidegrees Celsius.
    pub thermal_zone_path: PathBuf,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            source: SensorKind::default(),
            thermal_zone_path: PathBuf::from(crate::telemetry::ThermalZoneSensor::DEFAULT_PATH),
        }
    }
}

// ---------------------------------------------------------------------------
// PublishConfig
// ---------------------------------------------------------------------------

/// Store-and-forward settings for failed deliveries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum undelivered messages kept — `0` disables retrying.
    pub capacity: usize,
    /// Back-off after the first failure; doubles per consecutive failure.
    pub initial_backoff_ms: u64,
    /// Upper bound for the back-off.
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            capacity: 0,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
        }
    }
}

/// MQTT broker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// MQTT client id — `None` derives `{app_id}-{dev_id}`.
    pub client_id: Option<String>,
    /// Topic override — `None` derives `pipeline/{app_id}/{dev_id}`.
    pub topic: Option<String>,
    pub keep_alive_secs: u64,
    /// Maximum seconds to wait for the broker's acknowledgement.
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

impl PublishConfig {
    /// The topic reports are published to.
    pub fn resolved_topic(&self, device: &DeviceConfig) -> String {
        match self.topic.as_deref().filter(|t| !t.is_empty()) {
            Some(topic) => topic.to_string(),
            None => format!("pipeline/{}/{}", device.app_id, device.dev_id),
        }
    }

    pub fn resolved_client_id(&self, device: &DeviceConfig) -> String {
        match self.client_id.as_deref().filter(|c| !c.is_empty()) {
            Some(id) => id.to_string(),
            None => format!("{}-{}", device.app_id, device.dev_id),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            username: None,
            password: None,
            client_id: None,
            topic: None,
            keep_alive_secs: 30,
            timeout_secs: 10,
            retry: RetryConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use urban_sounds::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// config.validate().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub device: DeviceConfig,
    pub capture: CaptureConfig,
    pub classifier: ClassifierConfig,
    pub queue: QueueConfig,
    pub processing: ProcessingConfig,
    pub telemetry: TelemetryConfig,
    pub publish: PublishConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.device.app_id.trim().is_empty(), "device.app_id is empty");
        ensure!(!self.device.dev_id.trim().is_empty(), "device.dev_id is empty");

        ensure!(
            self.capture.duration_secs.is_finite() && self.capture.duration_secs > 0.0,
            "capture.duration_secs must be positive, got {}",
            self.capture.duration_secs
        );
        ensure!(
            self.capture.duration_secs <= MAX_CAPTURE_SECS,
            "capture.duration_secs must be at most {MAX_CAPTURE_SECS}, got {}",
            self.capture.duration_secs
        );
        ensure!(self.capture.sample_rate > 0, "capture.sample_rate must be positive");

        ensure!(
            !self.classifier.endpoint.trim().is_empty(),
            "classifier.endpoint is empty"
        );
        ensure!(self.classifier.timeout_secs > 0, "classifier.timeout_secs must be positive");
        self.classifier
            .vocabulary()
            .context("classifier.labels is invalid")?;

        ensure!(
            self.queue.capacity != Some(0),
            "queue.capacity must be at least 1 when set"
        );

        ensure!(self.processing.top_n > 0, "processing.top_n must be at least 1");
        ensure!(
            self.processing.dequeue_timeout_ms > 0,
            "processing.dequeue_timeout_ms must be positive"
        );
        ensure!(
            self.processing.dequeue_timeout_ms <= MAX_DEQUEUE_TIMEOUT_MS,
            "processing.dequeue_timeout_ms must be at most {MAX_DEQUEUE_TIMEOUT_MS}, got {}",
            self.processing.dequeue_timeout_ms
        );

        ensure!(!self.publish.host.trim().is_empty(), "publish.host is empty");
        ensure!(self.publish.timeout_secs > 0, "publish.timeout_secs must be positive");
        ensure!(
            !self.publish.resolved_topic(&self.device).contains(['+', '#']),
            "publish topic must not contain MQTT wildcards"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
