//! The unit of work handed from the capture loop to the processing loop.
//!
//! An [`AudioSample`] is moved, never shared: the recorder owns it until it
//! is enqueued, the [`SampleQueue`](crate::pipeline::SampleQueue) owns it
//! while buffered, and the processing loop owns it after dequeue.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// AudioSample
// ---------------------------------------------------------------------------

/// A fixed-length mono recording stamped with the moment capture started.
///
/// Samples are `f32` in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSample {
    capture_time: SystemTime,
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSample {
    pub fn new(capture_time: SystemTime, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            capture_time,
            samples,
            sample_rate,
        }
    }

    /// Re-stamp the sample with the wall-clock time its capture cycle began.
    ///
    /// Consumes `self`, so a stamped sample is never observable in two states.
    pub fn captured_at(mut self, capture_time: SystemTime) -> Self {
        self.capture_time = capture_time;
        self
    }

    pub fn capture_time(&self) -> SystemTime {
        self.capture_time
    }

    /// Capture time as whole seconds since the Unix epoch.
    ///
    /// Clock values before the epoch collapse to `0`.
    pub fn capture_epoch_secs(&self) -> u64 {
        self.capture_time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length of the recording, assuming mono audio at [`sample_rate`](Self::sample_rate).
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
