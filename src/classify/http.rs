//! `HttpClassifier` — zero-shot audio classification over HTTP.
//!
//! The heavy model (e.g. a CLAP checkpoint) runs in a separate inference
//! service on the device or the local network. Each call encodes the sample
//! as an in-memory 32-bit float WAV and POSTs it as multipart form data:
//!
//! | Part               | Content                                    |
//! |--------------------|--------------------------------------------|
//! | `audio`            | `sample.wav` (`audio/wav`)                 |
//! | `candidate_labels` | JSON array of label strings                |
//!
//! The service answers with `[{"label": "...", "score": 0.81}, ...]`.
//! All connection details come from [`ClassifierConfig`].

use std::io::Cursor;
use std::time::Duration;

use crate::audio::AudioSample;
use crate::classify::engine::{ClassificationError, Classifier};
use crate::classify::labels::LabelVocabulary;
use crate::classify::result::{ClassificationResult, LabelScore};
use crate::config::ClassifierConfig;

impl From<reqwest::Error> for ClassificationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClassificationError::Timeout
        } else {
            ClassificationError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// HttpClassifier
// ---------------------------------------------------------------------------

/// Calls a zero-shot audio classification endpoint.
///
/// Uses the blocking `reqwest` client: it is built on the main thread before
/// the runtime starts and only ever called from the processing thread.
pub struct HttpClassifier {
    client: reqwest::blocking::Client,
    config: ClassifierConfig,
}

impl HttpClassifier {
    /// Build an `HttpClassifier` from application config.
    ///
    /// # Errors
    ///
    /// Returns [`ClassificationError::Request`] if the HTTP client cannot be
    /// constructed (e.g. the TLS backend fails to initialise).
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassificationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

impl Classifier for HttpClassifier {
    /// The `Authorization: Bearer …` header is attached only when
    /// `config.api_key` is a non-empty string.
    fn classify(
        &self,
        sample: &AudioSample,
        labels: &LabelVocabulary,
    ) -> Result<ClassificationResult, ClassificationError> {
        if sample.is_empty() {
            return Err(ClassificationError::EmptySample);
        }

        let wav = encode_wav(sample)?;
        let candidate_labels = serde_json::to_string(labels.labels())
            .map_err(|e| ClassificationError::Encode(e.to_string()))?;

        let audio_part = reqwest::blocking::multipart::Part::bytes(wav)
            .file_name("sample.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::blocking::multipart::Form::new()
            .part("audio", audio_part)
            .text("candidate_labels", candidate_labels);

        let mut req = self.client.post(&self.config.endpoint).multipart(form);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(ClassificationError::Backend {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        parse_response(&body)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Encode a mono sample as a 32-bit float WAV file in memory.
pub(crate) fn encode_wav(sample: &AudioSample) -> Result<Vec<u8>, ClassificationError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| ClassificationError::Encode(e.to_string()))?;
        for &s in sample.samples() {
            writer
                .write_sample(s)
                .map_err(|e| ClassificationError::Encode(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| ClassificationError::Encode(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Parse `[{"label": ..., "score": ...}, ...]` into a sorted result.
pub(crate) fn parse_response(body: &str) -> Result<ClassificationResult, ClassificationError> {
    let scores: Vec<LabelScore> =
        serde_json::from_str(body).map_err(|e| ClassificationError::Parse(e.to_string()))?;
    Ok(ClassificationResult::new(scores))
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
