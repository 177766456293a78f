//! Typed report assembly.
//!
//! [`ReportBuilder`] holds everything that is fixed for the process lifetime
//! (identifiers, topic, how many labels to keep) and turns one cycle's
//! classification, metric and telemetry into an immutable [`Report`].

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::classify::{ClassificationResult, LabelScore};
use crate::config::{DeviceConfig, ProcessingConfig, PublishConfig};
use crate::report::wire::{
    f32_to_json, WireMessage, AMPLITUDE_KEY, CAPTURED_AT_KEY, TEMPERATURE_KEY,
};

// ---------------------------------------------------------------------------
// ReportError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialise report: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One processing cycle's outcome, ready to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub app_id: String,
    pub device_id: String,
    pub captured_at: SystemTime,
    /// At most `top_n` entries, descending by score.
    pub top_labels: Vec<LabelScore>,
    pub amplitude_metric: f32,
    pub device_temperature: Option<f32>,
    pub topic: String,
}

impl Report {
    /// Wire representation, stamped with `now` as the message time.
    pub fn to_wire(&self, now: SystemTime) -> WireMessage {
        let mut fields = Map::new();
        for entry in &self.top_labels {
            fields.insert(entry.label.clone(), f32_to_json(entry.score));
        }
        if let Some(t) = self.device_temperature {
            fields.insert(TEMPERATURE_KEY.into(), f32_to_json(t));
        }
        fields.insert(AMPLITUDE_KEY.into(), f32_to_json(self.amplitude_metric));
        fields.insert(
            CAPTURED_AT_KEY.into(),
            Value::from(epoch_secs(self.captured_at)),
        );

        WireMessage {
            app_id: self.app_id.clone(),
            dev_id: self.device_id.clone(),
            payload_fields: fields,
            time: epoch_millis(now),
        }
    }

    /// Serialised JSON bytes for the publisher.
    pub fn to_payload(&self, now: SystemTime) -> Result<Vec<u8>, ReportError> {
        Ok(serde_json::to_vec(&self.to_wire(now))?)
    }
}

// ---------------------------------------------------------------------------
// ReportBuilder
// ---------------------------------------------------------------------------

/// Builds [`Report`]s with fixed identifiers and a configurable top-N.
///
/// ```rust
/// use std::time::SystemTime;
/// use urban_sounds::classify::{ClassificationResult, LabelScore};
/// use urban_sounds::report::ReportBuilder;
///
/// let builder = ReportBuilder::new("urbansounds", "OE-007", "pipeline/urbansounds/OE-007", 2);
/// let result = ClassificationResult::new(vec![
///     LabelScore::new("Alarm", 0.81),
///     LabelScore::new("Talking", 0.40),
///     LabelScore::new("Silence", 0.05),
/// ]);
/// let report = builder.build(SystemTime::now(), &result, 0.19, None);
/// assert_eq!(report.top_labels.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    app_id: String,
    device_id: String,
    topic: String,
    top_n: usize,
}

impl ReportBuilder {
    pub fn new(
        app_id: impl Into<String>,
        device_id: impl Into<String>,
        topic: impl Into<String>,
        top_n: usize,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            device_id: device_id.into(),
            topic: topic.into(),
            top_n,
        }
    }

    pub fn from_config(
        device: &DeviceConfig,
        processing: &ProcessingConfig,
        publish: &PublishConfig,
    ) -> Self {
        Self::new(
            device.app_id.clone(),
            device.dev_id.clone(),
            publish.resolved_topic(device),
            processing.top_n,
        )
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Assemble a report. Results shorter than `top_n` are used in full.
    pub fn build(
        &self,
        captured_at: SystemTime,
        result: &ClassificationResult,
        amplitude_metric: f32,
        device_temperature: Option<f32>,
    ) -> Report {
        Report {
            app_id: self.app_id.clone(),
            device_id: self.device_id.clone(),
            captured_at,
            top_labels: result.top(self.top_n).to_vec(),
            amplitude_metric,
            device_temperature,
            topic: self.topic.clone(),
        }
    }
}

fn epoch_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn epoch_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn builder(n: usize) -> ReportBuilder {
        ReportBuilder::new("urbansounds", "OE-007", "pipeline/urbansounds/OE-007", n)
    }

    fn alarm_result() -> ClassificationResult {
        ClassificationResult::new(vec![
            LabelScore::new("Alarm", 0.81),
            LabelScore::new("Talking", 0.40),
            LabelScore::new("Silence", 0.05),
        ])
    }

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn payload_fields_hold_exactly_labels_and_enrichment() {
        let report = builder(3).build(at(1_718_000_000), &alarm_result(), 0.19, Some(54.9));
        let wire = report.to_wire(at(1_718_000_005));

        let mut keys: Vec<&str> = wire.payload_fields.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "Alarm",
                "Silence",
                "Talking",
                "amplitude_metric",
                "captured_at",
                "device_temperature"
            ]
        );
        assert_eq!(wire.payload_fields["Alarm"], serde_json::json!(0.81));
        assert_eq!(wire.payload_fields["Talking"], serde_json::json!(0.4));
        assert_eq!(wire.payload_fields["Silence"], serde_json::json!(0.05));
        assert_eq!(wire.payload_fields["device_temperature"], serde_json::json!(54.9));
        assert_eq!(wire.payload_fields["amplitude_metric"], serde_json::json!(0.19));
        assert_eq!(wire.payload_fields["captured_at"], serde_json::json!(1_718_000_000u64));
        assert_eq!(wire.time, 1_718_000_005_000);
        assert_eq!(wire.app_id, "urbansounds");
        assert_eq!(wire.dev_id, "OE-007");
    }

    #[test]
    fn missing_temperature_is_omitted() {
        let report = builder(3).build(at(10), &alarm_result(), 0.0, None);
        let wire = report.to_wire(at(10));
        assert!(!wire.payload_fields.contains_key(TEMPERATURE_KEY));
        assert!(wire.payload_fields.contains_key(AMPLITUDE_KEY));
    }

    #[test]
    fn result_shorter_than_n_is_used_in_full() {
        let report = builder(5).build(at(10), &alarm_result(), 0.0, None);
        assert_eq!(report.top_labels.len(), 3);
    }

    #[test]
    fn top_n_truncates_in_score_order() {
        let report = builder(1).build(at(10), &alarm_result(), 0.0, None);
        assert_eq!(report.top_labels, vec![LabelScore::new("Alarm", 0.81)]);
    }

    #[test]
    fn empty_result_still_reports_metric() {
        let report = builder(5).build(at(10), &ClassificationResult::default(), 0.5, Some(40.0));
        let wire = report.to_wire(at(10));
        assert_eq!(wire.payload_fields.len(), 3);
    }

    #[test]
    fn payload_is_valid_json() {
        let report = builder(3).build(at(10), &alarm_result(), 0.19, None);
        let bytes = report.to_payload(at(11)).unwrap();
        let parsed: WireMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.time, 11_000);
        assert_eq!(report.topic, "pipeline/urbansounds/OE-007");
    }
}
