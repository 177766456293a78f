//! The continuous capture → classify → publish pipeline.
//!
//! # Architecture
//!
//! ```text
//!  thread "capture"                      thread "processing"
//!  ────────────────                      ───────────────────
//!  CaptureProvider::record               SampleQueue::dequeue_blocking
//!        │ stamp capture time                  │
//!        ▼                                     ▼
//!  SampleQueue::enqueue ──── FIFO ────▶  Classifier::classify
//!                                              │ peak_to_peak
//!                                              │ TelemetrySource::read_temperature
//!                                              ▼
//!                                        ReportBuilder::build ─▶ Publisher::publish
//!
//!              PipelineContext { SampleQueue, LifecycleSignal }
//!                  shared by both threads behind an Arc
//! ```
//!
//! The two loops run at independent cadences and only meet at the queue.
//! Both check the [`LifecycleSignal`] at cycle boundaries; [`Pipeline`] clears
//! it and joins them.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use urban_sounds::audio::CpalRecorder;
//! use urban_sounds::classify::HttpClassifier;
//! use urban_sounds::config::AppConfig;
//! use urban_sounds::pipeline::{
//!     run_until_interrupted, CaptureSettings, PipelineContext, PipelineParts, ProcessingLoop,
//! };
//! use urban_sounds::report::ReportBuilder;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = AppConfig::default();
//! // The blocking HTTP client is built before any runtime exists.
//! let processing = ProcessingLoop::new(
//!     Arc::new(HttpClassifier::from_config(&config.classifier)?),
//!     config.classifier.vocabulary()?,
//!     urban_sounds::telemetry::from_config(&config.telemetry),
//!     urban_sounds::publish::from_config(&config),
//!     ReportBuilder::from_config(&config.device, &config.processing, &config.publish),
//! );
//! let parts = PipelineParts {
//!     context: Arc::new(PipelineContext::from_config(&config.queue)),
//!     capture: Box::new(CpalRecorder::new(config.capture.device_name.clone())),
//!     capture_settings: CaptureSettings::from_config(&config.capture),
//!     processing,
//! };
//! let rt = tokio::runtime::Runtime::new()?;
//! let summary = rt.block_on(run_until_interrupted(parts))?;
//! summary.log();
//! # Ok(())
//! # }
//! ```

pub mod capture_loop;
pub mod context;
pub mod processing_loop;
pub mod queue;
pub mod signal;
pub mod state;
pub mod supervisor;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use capture_loop::{run_capture_loop, CaptureSettings, CaptureStats};
pub use context::PipelineContext;
pub use processing_loop::{CycleOutcome, ProcessingLoop, ProcessingStats};
pub use queue::{Enqueued, SampleQueue};
pub use signal::LifecycleSignal;
pub use state::Stage;
pub use supervisor::{
    run_until, run_until_interrupted, Pipeline, PipelineError, PipelineParts, PipelineSummary,
};
