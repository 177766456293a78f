//! Audio event classification.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 Classifier (trait)                   │
//! │                                                      │
//! │   ┌─────────────────┐    ┌──────────────────┐        │
//! │   │ LabelVocabulary │    │  HttpClassifier  │        │
//! │   │ - validated     │───▶│ - WAV encode     │        │
//! │   │ - Arc-shared    │    │ - multipart POST │        │
//! │   └─────────────────┘    └────────┬─────────┘        │
//! │                                   │                  │
//! │                                   ▼                  │
//! │                    ┌──────────────────────────┐      │
//! │                    │  ClassificationResult    │      │
//! │                    │  (label, score) ranked   │      │
//! │                    └──────────────────────────┘      │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::time::SystemTime;
//! use urban_sounds::audio::AudioSample;
//! use urban_sounds::classify::{Classifier, HttpClassifier, LabelVocabulary};
//! use urban_sounds::config::ClassifierConfig;
//!
//! let classifier = HttpClassifier::from_config(&ClassifierConfig::default()).unwrap();
//! let sample = AudioSample::new(SystemTime::now(), vec![0.0; 48_000], 48_000);
//! let result = classifier.classify(&sample, &LabelVocabulary::urban()).unwrap();
//! for s in result.top(3) {
//!     println!("{}: {:.4}", s.label, s.score);
//! }
//! ```

pub mod engine;
pub mod http;
pub mod labels;
pub mod result;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{ClassificationError, Classifier};
pub use http::HttpClassifier;
pub use labels::{LabelVocabulary, VocabularyError, DEFAULT_LABELS};
pub use result::{ClassificationResult, LabelScore};

#[cfg(test)]
pub use engine::MockClassifier;
