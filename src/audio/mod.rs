//! Audio capture and signal-level analysis.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → Vec<f32> chunks (mpsc) → downmix_to_mono
//!           → AudioSample { capture_time, samples, sample_rate }
//!           → peak_to_peak (amplitude metric)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use urban_sounds::audio::{peak_to_peak, CaptureProvider, CpalRecorder};
//!
//! let mut recorder = CpalRecorder::new(None);
//! let sample = recorder.record(Duration::from_secs(5), 48_000).unwrap();
//! println!("p2p = {:.4}", peak_to_peak(sample.samples()));
//! ```

pub mod capture;
pub mod level;
pub mod mix;
pub mod sample;

pub use capture::{CaptureError, CaptureProvider, CpalRecorder};
pub use level::peak_to_peak;
pub use mix::{downmix_to_mono, i16_to_f32, i32_to_f32};
pub use sample::AudioSample;

#[cfg(test)]
pub use capture::ScriptedCapture;
