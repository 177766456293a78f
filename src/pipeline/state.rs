//! Per-cycle stages of the two run loops.
//!
//! The loops do not keep a stored state machine; a [`Stage`] names where a
//! cycle is so every contained error can be logged with it.
//!
//! ```text
//! capture:     Idle ─▶ Capturing ─▶ Enqueuing ─▶ Idle ... ─▶ Stopped
//! processing:  WaitForSample ─▶ Classifying ─▶ MetricComputation
//!                  ▲                               │
//!                  └── Publishing ◀── Enrichment ◀─┘      ... ─▶ Stopped
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Between capture cycles.
    Idle,
    /// Recording one buffer from the device.
    Capturing,
    /// Handing the buffer to the sample queue.
    Enqueuing,
    /// Blocked on the sample queue.
    WaitForSample,
    /// The classifier is running.
    Classifying,
    /// Computing the amplitude metric.
    MetricComputation,
    /// Reading device telemetry.
    Enrichment,
    /// Building and publishing the report.
    Publishing,
    /// The lifecycle signal was cleared; the loop has exited.
    Stopped,
}

impl Stage {
    /// Short label used as log context.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Capturing => "capturing",
            Stage::Enqueuing => "enqueuing",
            Stage::WaitForSample => "wait-for-sample",
            Stage::Classifying => "classifying",
            Stage::MetricComputation => "metric",
            Stage::Enrichment => "enrichment",
            Stage::Publishing => "publishing",
            Stage::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
