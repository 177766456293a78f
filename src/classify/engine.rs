//! Core classifier trait.
//!
//! # Overview
//!
//! [`Classifier`] is the interface the processing loop calls once per
//! sample. It is object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn Classifier>`.
//!
//! [`HttpClassifier`](crate::classify::HttpClassifier) is the production
//! implementation. [`MockClassifier`] (available under `#[cfg(test)]`) returns
//! a scripted response and records every sample it sees, which is how the
//! pipeline tests check ordering and fault isolation.

use thiserror::Error;

use crate::audio::AudioSample;
use crate::classify::labels::LabelVocabulary;
use crate::classify::result::ClassificationResult;

// ---------------------------------------------------------------------------
// ClassificationError
// ---------------------------------------------------------------------------

/// All errors that can arise while classifying one sample.
#[derive(Debug, Clone, Error)]
pub enum ClassificationError {
    /// The sample contained no audio.
    #[error("cannot classify an empty sample")]
    EmptySample,

    /// The sample could not be encoded for the backend.
    #[error("failed to encode sample: {0}")]
    Encode(String),

    /// Transport-level failure reaching the backend.
    #[error("classifier request failed: {0}")]
    Request(String),

    /// The backend did not answer within the configured timeout.
    #[error("classifier request timed out")]
    Timeout,

    /// The backend answered with a non-success status.
    #[error("classifier backend returned HTTP {status}: {body}")]
    Backend { status: u16, body: String },

    /// The backend response could not be parsed.
    #[error("failed to parse classifier response: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// Classifier trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for audio event classifiers.
///
/// # Contract
///
/// - Blocking; may take several seconds.
/// - Returns scores for a subset (possibly all) of `labels`, in any order;
///   callers receive them sorted through [`ClassificationResult::new`].
pub trait Classifier: Send + Sync {
    fn classify(
        &self,
        sample: &AudioSample,
        labels: &LabelVocabulary,
    ) -> Result<ClassificationResult, ClassificationError>;
}

// Compile-time assertion: Box<dyn Classifier> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Classifier>) {}
};

// ---------------------------------------------------------------------------
// MockClassifier  (test-only)
// ---------------------------------------------------------------------------

/// A test double with a scripted response per call.
///
/// Responses are consumed in order; when the script runs out the fallback
/// response is used. Every classified sample's first PCM value is recorded
/// so tests can assert which samples reached the classifier, and in what
/// order.
#[cfg(test)]
pub struct MockClassifier {
    script: std::sync::Mutex<std::collections::VecDeque<Result<ClassificationResult, ClassificationError>>>,
    fallback: Result<ClassificationResult, ClassificationError>,
    delay: std::time::Duration,
    seen: std::sync::Mutex<Vec<f32>>,
}

#[cfg(test)]
impl MockClassifier {
    /// Always return `result`.
    pub fn ok(result: ClassificationResult) -> Self {
        Self::scripted(Vec::new(), Ok(result))
    }

    /// Always fail with `error`.
    pub fn err(error: ClassificationError) -> Self {
        Self::scripted(Vec::new(), Err(error))
    }

    pub fn scripted(
        script: Vec<Result<ClassificationResult, ClassificationError>>,
        fallback: Result<ClassificationResult, ClassificationError>,
    ) -> Self {
        Self {
            script: std::sync::Mutex::new(script.into()),
            fallback,
            delay: std::time::Duration::ZERO,
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Simulate a slow model.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    /// First PCM value of every sample classified so far.
    pub fn seen(&self) -> Vec<f32> {
        self.seen.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Classifier for MockClassifier {
    fn classify(
        &self,
        sample: &AudioSample,
        _labels: &LabelVocabulary,
    ) -> Result<ClassificationResult, ClassificationError> {
        std::thread::sleep(self.delay);
        if sample.is_empty() {
            return Err(ClassificationError::EmptySample);
        }
        self.seen.lock().unwrap().push(sample.samples()[0]);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::classify::LabelScore;

    fn sample(first: f32) -> AudioSample {
        AudioSample::new(SystemTime::now(), vec![first, 0.0, 0.0], 16_000)
    }

    #[test]
    fn mock_ok_returns_configured_result() {
        let expected = ClassificationResult::new(vec![LabelScore::new("Car", 0.7)]);
        let classifier = MockClassifier::ok(expected.clone());
        let got = classifier.classify(&sample(0.0), &LabelVocabulary::urban()).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn mock_err_returns_configured_error() {
        let classifier = MockClassifier::err(ClassificationError::Timeout);
        let err = classifier
            .classify(&sample(0.0), &LabelVocabulary::urban())
            .unwrap_err();
        assert!(matches!(err, ClassificationError::Timeout));
    }

    #[test]
    fn mock_script_then_fallback() {
        let classifier = MockClassifier::scripted(
            vec![Err(ClassificationError::Request("boom".into()))],
            Ok(ClassificationResult::default()),
        );
        let vocab = LabelVocabulary::urban();
        assert!(classifier.classify(&sample(1.0), &vocab).is_err());
        assert!(classifier.classify(&sample(2.0), &vocab).is_ok());
        assert_eq!(classifier.seen(), vec![1.0, 2.0]);
    }

    #[test]
    fn empty_sample_is_rejected() {
        let classifier = MockClassifier::ok(ClassificationResult::default());
        let empty = AudioSample::new(SystemTime::now(), Vec::new(), 16_000);
        assert!(matches!(
            classifier.classify(&empty, &LabelVocabulary::urban()),
            Err(ClassificationError::EmptySample)
        ));
    }

    #[test]
    fn box_dyn_classifier_compiles() {
        let classifier: Box<dyn Classifier> =
            Box::new(MockClassifier::ok(ClassificationResult::default()));
        let _ = classifier.classify(&sample(0.0), &LabelVocabulary::urban());
    }

    #[test]
    fn backend_error_display_includes_status() {
        let e = ClassificationError::Backend {
            status: 503,
            body: "model loading".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("503") && msg.contains("model loading"));
    }
}
