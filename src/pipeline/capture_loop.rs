//! Producer loop: record → stamp → enqueue, until the signal clears.
//!
//! Capture failures never end the loop. A failed cycle sleeps for the
//! configured back-off through [`LifecycleSignal::wait_for_stop`], so a
//! permanently broken device costs one attempt per back-off period and a stop
//! request still ends the loop immediately.
//!
//! [`LifecycleSignal::wait_for_stop`]: crate::pipeline::LifecycleSignal::wait_for_stop

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::audio::{AudioSample, CaptureProvider};
use crate::config::CaptureConfig;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::queue::Enqueued;
use crate::pipeline::state::Stage;

// ---------------------------------------------------------------------------
// CaptureSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    pub duration: Duration,
    pub sample_rate: u32,
    pub error_backoff: Duration,
}

impl CaptureSettings {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            duration: config.duration(),
            sample_rate: config.sample_rate,
            error_backoff: config.error_backoff(),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self::from_config(&CaptureConfig::default())
    }
}

// ---------------------------------------------------------------------------
// CaptureStats
// ---------------------------------------------------------------------------

/// Counters returned when the capture loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Cycles started.
    pub cycles: u64,
    /// Samples that made it into the queue.
    pub captured: u64,
    /// Cycles whose recording failed.
    pub failed: u64,
    /// Samples lost to the queue's overflow policy.
    pub dropped: u64,
}

// ---------------------------------------------------------------------------
// run_capture_loop
// ---------------------------------------------------------------------------

/// Run capture cycles until `ctx`'s lifecycle signal clears.
///
/// The signal is checked at cycle boundaries only; a recording in progress
/// always completes (or fails) before the loop notices a stop.
pub fn run_capture_loop(
    ctx: &PipelineContext,
    provider: &mut dyn CaptureProvider,
    settings: &CaptureSettings,
) -> CaptureStats {
    let mut stats = CaptureStats::default();
    let mut rate_mismatch_logged = false;

    log::info!(
        "capture: started ({:?} @ {} Hz)",
        settings.duration,
        settings.sample_rate
    );

    while ctx.is_active() {
        stats.cycles += 1;
        let started = SystemTime::now();

        let sample = match provider.record(settings.duration, settings.sample_rate) {
            Ok(sample) => sample.captured_at(started),
            Err(e) => {
                stats.failed += 1;
                log::warn!(
                    "capture: [{}] cycle started at {} failed: {e}",
                    Stage::Capturing,
                    epoch_secs(started)
                );
                if ctx.signal().wait_for_stop(settings.error_backoff) {
                    break;
                }
                continue;
            }
        };

        if sample.sample_rate() != settings.sample_rate && !rate_mismatch_logged {
            log::warn!(
                "capture: device delivers {} Hz instead of the requested {} Hz",
                sample.sample_rate(),
                settings.sample_rate
            );
            rate_mismatch_logged = true;
        }

        log::debug!(
            "capture: recorded {:?} ({} frames) at {}",
            sample.duration(),
            sample.len(),
            sample.capture_epoch_secs()
        );
        enqueue(ctx, sample, &mut stats);
        log::trace!("capture: [{}] cycle {} complete", Stage::Idle, stats.cycles);
    }

    log::info!(
        "capture: {} after {} cycle(s) ({} captured, {} failed, {} dropped)",
        Stage::Stopped,
        stats.cycles,
        stats.captured,
        stats.failed,
        stats.dropped
    );
    stats
}

/// Hand `sample` to the queue, retrying a blocked enqueue while the
/// pipeline is still active.
fn enqueue(ctx: &PipelineContext, mut sample: AudioSample, stats: &mut CaptureStats) {
    let captured_at = sample.capture_epoch_secs();
    loop {
        match ctx.queue().enqueue(sample) {
            Enqueued::Accepted => {
                stats.captured += 1;
                return;
            }
            Enqueued::Evicted(old) => {
                stats.captured += 1;
                stats.dropped += 1;
                log::warn!(
                    "capture: [{}] queue full, dropped oldest sample captured at {}",
                    Stage::Enqueuing,
                    old.capture_epoch_secs()
                );
                return;
            }
            Enqueued::Rejected(_) => {
                stats.dropped += 1;
                log::warn!(
                    "capture: [{}] queue full, dropped sample captured at {captured_at}",
                    Stage::Enqueuing
                );
                return;
            }
            Enqueued::Full(returned) => {
                if !ctx.is_active() {
                    stats.dropped += 1;
                    log::debug!(
                        "capture: [{}] stopping with queue full, sample captured at {captured_at} discarded",
                        Stage::Enqueuing
                    );
                    return;
                }
                sample = returned;
            }
        }
    }
}

fn epoch_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
