//! The fixed set of candidate labels every sample is scored against.
//!
//! [`LabelVocabulary`] is built once at startup and shared read-only (via
//! `Arc`) with the processing loop. Construction validates the list so a bad
//! configuration fails at startup instead of producing malformed reports.

use std::sync::Arc;

use thiserror::Error;

use crate::report::RESERVED_PAYLOAD_KEYS;

// ---------------------------------------------------------------------------
// Default urban vocabulary
// ---------------------------------------------------------------------------

/// Event labels used by the street-level deployment.
pub const DEFAULT_LABELS: &[&str] = &[
    "Gunshot",
    "Alarm",
    "Moped",
    "Car",
    "Motorcycle",
    "Airplane",
    "Helicopter",
    "Claxon",
    "Slamming door",
    "Screaming",
    "Talking",
    "Music",
    "Birds",
    "Airco",
    "Noise",
    "Silence",
];

// ---------------------------------------------------------------------------
// VocabularyError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VocabularyError {
    #[error("label vocabulary is empty")]
    Empty,

    #[error("label at position {0} is blank")]
    Blank(usize),

    #[error("duplicate label: {0:?}")]
    Duplicate(String),

    #[error("label {0:?} collides with a reserved report field")]
    Reserved(String),
}

// ---------------------------------------------------------------------------
// LabelVocabulary
// ---------------------------------------------------------------------------

/// Ordered, distinct, non-empty list of label strings.
///
/// Cloning is cheap: the labels live behind an `Arc`.
///
/// ```rust
/// use urban_sounds::classify::LabelVocabulary;
///
/// let vocab = LabelVocabulary::new(["Alarm", "Talking", "Silence"]).unwrap();
/// assert_eq!(vocab.len(), 3);
/// assert!(vocab.contains("Alarm"));
/// assert!(LabelVocabulary::new(["Alarm", "Alarm"]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVocabulary {
    labels: Arc<[String]>,
}

impl LabelVocabulary {
    pub fn new<I, S>(labels: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: Vec<String> = Vec::new();
        for (i, label) in labels.into_iter().enumerate() {
            let label: String = label.into().trim().to_string();
            if label.is_empty() {
                return Err(VocabularyError::Blank(i));
            }
            if RESERVED_PAYLOAD_KEYS.contains(&label.as_str()) {
                return Err(VocabularyError::Reserved(label));
            }
            if seen.contains(&label) {
                return Err(VocabularyError::Duplicate(label));
            }
            seen.push(label);
        }

        if seen.is_empty() {
            return Err(VocabularyError::Empty);
        }

        Ok(Self {
            labels: seen.into(),
        })
    }

    /// The built-in urban vocabulary ([`DEFAULT_LABELS`]).
    pub fn urban() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        Self::urban()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urban_vocabulary_is_valid() {
        let vocab = LabelVocabulary::new(DEFAULT_LABELS.iter().copied()).unwrap();
        assert_eq!(vocab, LabelVocabulary::urban());
        assert_eq!(vocab.len(), 16);
    }

    #[test]
    fn order_is_preserved() {
        let vocab = LabelVocabulary::new(["Silence", "Alarm", "Car"]).unwrap();
        let labels: Vec<&str> = vocab.iter().collect();
        assert_eq!(labels, ["Silence", "Alarm", "Car"]);
    }

    #[test]
    fn empty_list_is_rejected() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(LabelVocabulary::new(empty), Err(VocabularyError::Empty));
    }

    #[test]
    fn blank_label_is_rejected() {
        assert_eq!(
            LabelVocabulary::new(["Alarm", "   "]),
            Err(VocabularyError::Blank(1))
        );
    }

    #[test]
    fn duplicates_are_rejected_after_trimming() {
        assert_eq!(
            LabelVocabulary::new(["Alarm", " Alarm "]),
            Err(VocabularyError::Duplicate("Alarm".into()))
        );
    }

    #[test]
    fn reserved_field_names_are_rejected() {
        assert!(matches!(
            LabelVocabulary::new(["Car", "amplitude_metric"]),
            Err(VocabularyError::Reserved(_))
        ));
    }

    #[test]
    fn clones_share_storage() {
        let a = LabelVocabulary::urban();
        let b = a.clone();
        assert!(Arc::ptr_eq(&a.labels, &b.labels));
    }
}
