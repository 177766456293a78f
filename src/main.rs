//! Application entry point — Urban Sounds.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] (first argument, or the platform settings file) and
//!    validate it.
//! 3. Build the collaborators: cpal recorder, HTTP classifier, temperature
//!    source, MQTT publisher.
//! 4. Create the [`tokio`] runtime.
//! 5. Run the pipeline until SIGINT / SIGTERM, then log the summary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use urban_sounds::{
    audio::CpalRecorder,
    classify::HttpClassifier,
    config::AppConfig,
    pipeline::{run_until_interrupted, CaptureSettings, PipelineContext, PipelineParts, ProcessingLoop},
    publish,
    report::ReportBuilder,
    telemetry,
};

fn load_config() -> Result<AppConfig> {
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            log::info!("Loading settings from {}", path.display());
            AppConfig::load_from(&path)?
        }
        None => AppConfig::load()?,
    };
    config.validate().context("invalid settings")?;
    Ok(config)
}

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Urban Sounds starting up");

    // 2. Configuration
    let config = load_config()?;
    log::info!(
        "Device {}/{}: {} s windows @ {} Hz, broker {}:{}",
        config.device.app_id,
        config.device.dev_id,
        config.capture.duration_secs,
        config.capture.sample_rate,
        config.publish.host,
        config.publish.port
    );

    // 3. Collaborators. The blocking HTTP client must be created outside the
    //    async runtime.
    let vocabulary = config.classifier.vocabulary()?;
    let classifier = HttpClassifier::from_config(&config.classifier)
        .context("failed to build classifier client")?;

    let processing = ProcessingLoop::new(
        Arc::new(classifier),
        vocabulary,
        telemetry::from_config(&config.telemetry),
        publish::from_config(&config),
        ReportBuilder::from_config(&config.device, &config.processing, &config.publish),
    )
    .with_dequeue_timeout(config.processing.dequeue_timeout());

    let parts = PipelineParts {
        context: Arc::new(PipelineContext::from_config(&config.queue)),
        capture: Box::new(CpalRecorder::new(config.capture.device_name.clone())),
        capture_settings: CaptureSettings::from_config(&config.capture),
        processing,
    };

    // 4. Tokio runtime (signal handling + blocking join only)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 5. Run until interrupted
    let summary = rt.block_on(run_until_interrupted(parts))?;
    summary.log();
    log::info!("Urban Sounds stopped");
    Ok(())
}
