//! Starts both loops on named OS threads and stops them on request.
//!
//! ```text
//! run_until_interrupted ──▶ Pipeline::start ──┬─▶ thread "capture"    run_capture_loop
//!        │                                     └─▶ thread "processing" ProcessingLoop::run
//!        ▼
//!   Ctrl-C / SIGTERM (or injected future)
//!        │
//!        ▼
//! spawn_blocking(Pipeline::request_stop) ──▶ signal_stop ─▶ join both ─▶ PipelineSummary
//! ```

use std::future::Future;
use std::sync::Arc;
use std::thread::JoinHandle;

use thiserror::Error;

use crate::audio::CaptureProvider;
use crate::pipeline::capture_loop::{run_capture_loop, CaptureSettings, CaptureStats};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::processing_loop::{ProcessingLoop, ProcessingStats};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to spawn {thread} thread: {source}")]
    Spawn {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("supervisor task failed: {0}")]
    Join(String),
}

// ---------------------------------------------------------------------------
// PipelineParts / PipelineSummary
// ---------------------------------------------------------------------------

/// Everything [`Pipeline::start`] moves onto the two worker threads.
pub struct PipelineParts {
    pub context: Arc<PipelineContext>,
    pub capture: Box<dyn CaptureProvider>,
    pub capture_settings: CaptureSettings,
    pub processing: ProcessingLoop,
}

/// Final counters, returned once both loops have been joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub capture: CaptureStats,
    pub processing: ProcessingStats,
    /// Samples still queued at teardown, never processed.
    pub discarded: usize,
}

impl PipelineSummary {
    pub fn log(&self) {
        log::info!(
            "pipeline: summary: {} captured, {} capture failures, {} dropped on overflow, \
             {} classified, {} classification failures, {} published, {} not delivered, \
             {} discarded at shutdown",
            self.capture.captured,
            self.capture.failed,
            self.capture.dropped,
            self.processing.classified,
            self.processing.classification_failures,
            self.processing.published,
            self.processing.publish_failures,
            self.discarded
        );
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Handle to a running pipeline.
///
/// Dropping a running handle stops it, blocking until both threads exit.
pub struct Pipeline {
    context: Arc<PipelineContext>,
    capture: Option<JoinHandle<CaptureStats>>,
    processing: Option<JoinHandle<ProcessingStats>>,
    summary: Option<PipelineSummary>,
}

impl Pipeline {
    /// Spawn the capture and processing threads.
    ///
    /// If the second thread cannot be spawned the first is stopped and
    /// joined before the error is returned.
    pub fn start(parts: PipelineParts) -> Result<Self, PipelineError> {
        let PipelineParts {
            context,
            mut capture,
            capture_settings,
            processing,
        } = parts;

        let capture_handle = {
            let ctx = Arc::clone(&context);
            std::thread::Builder::new()
                .name("capture".into())
                .spawn(move || run_capture_loop(&ctx, capture.as_mut(), &capture_settings))
                .map_err(|source| PipelineError::Spawn {
                    thread: "capture",
                    source,
                })?
        };

        let processing_handle = {
            let ctx = Arc::clone(&context);
            std::thread::Builder::new()
                .name("processing".into())
                .spawn(move || processing.run(&ctx))
        };

        let processing_handle = match processing_handle {
            Ok(handle) => handle,
            Err(source) => {
                context.signal().signal_stop();
                let _ = capture_handle.join();
                return Err(PipelineError::Spawn {
                    thread: "processing",
                    source,
                });
            }
        };

        log::info!("pipeline: running");
        Ok(Self {
            context,
            capture: Some(capture_handle),
            processing: Some(processing_handle),
            summary: None,
        })
    }

    pub fn context(&self) -> &Arc<PipelineContext> {
        &self.context
    }

    pub fn is_running(&self) -> bool {
        self.summary.is_none()
    }

    /// Clear the lifecycle signal and block until both loops have exited.
    ///
    /// Waits for at most one in-flight cycle per loop. Samples still queued
    /// afterwards are discarded and counted. Calling it again returns the
    /// same summary without side effects.
    pub fn request_stop(&mut self) -> PipelineSummary {
        if let Some(summary) = self.summary {
            return summary;
        }

        if self.context.signal().signal_stop() {
            log::info!("pipeline: stop requested, waiting for in-flight cycles");
        }

        let capture = join("capture", self.capture.take());
        let processing = join("processing", self.processing.take());
        let discarded = self.context.queue().discard_remaining();
        if discarded > 0 {
            log::warn!("pipeline: discarded {discarded} unprocessed sample(s) at shutdown");
        }

        let summary = PipelineSummary {
            capture,
            processing,
            discarded,
        };
        self.summary = Some(summary);
        log::info!("pipeline: stopped");
        summary
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.is_running() {
            self.request_stop();
        }
    }
}

/// Join a worker, treating a panicked thread as having done no work.
fn join<T: Default>(name: &str, handle: Option<JoinHandle<T>>) -> T {
    match handle.map(JoinHandle::join) {
        Some(Ok(stats)) => stats,
        Some(Err(_)) => {
            log::error!("pipeline: {name} thread panicked");
            T::default()
        }
        None => T::default(),
    }
}

// ---------------------------------------------------------------------------
// Async entry points
// ---------------------------------------------------------------------------

/// Start the pipeline and run it until SIGINT or SIGTERM.
pub async fn run_until_interrupted(parts: PipelineParts) -> Result<PipelineSummary, PipelineError> {
    run_until(parts, shutdown_signal()).await
}

/// Start the pipeline and run it until `shutdown` completes.
///
/// Start-up and the blocking stop-and-join both run on tokio's blocking
/// pool: the runtime's worker threads stay free, and collaborators holding
/// blocking clients are never dropped on an async worker.
pub async fn run_until<F>(parts: PipelineParts, shutdown: F) -> Result<PipelineSummary, PipelineError>
where
    F: Future<Output = ()>,
{
    let mut pipeline = tokio::task::spawn_blocking(move || Pipeline::start(parts))
        .await
        .map_err(|e| PipelineError::Join(e.to_string()))??;
    shutdown.await;
    log::info!("pipeline: shutdown requested");

    tokio::task::spawn_blocking(move || pipeline.request_stop())
        .await
        .map_err(|e| PipelineError::Join(e.to_string()))
}

async fn shutdown_signal() {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => log::info!("pipeline: received SIGINT"),
            Err(e) => {
                log::error!("pipeline: cannot listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        },
        _ = terminate() => log::info!("pipeline: received SIGTERM"),
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            log::error!("pipeline: cannot listen for SIGTERM: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
