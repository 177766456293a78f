//! Fixed-duration microphone capture.
//!
//! [`CaptureProvider`] is the seam the capture loop records through. The
//! production implementation, [`CpalRecorder`], opens the input device for
//! each recording, collects callback buffers over an mpsc channel until the
//! requested number of frames has arrived, and closes the stream again, so a
//! device that disappears between cycles is simply retried on the next one.

use std::sync::mpsc;
use std::time::{Duration, Instant, SystemTime};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::audio::mix::{downmix_to_mono, i16_to_f32, i32_to_f32};
use crate::audio::sample::AudioSample;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while recording one buffer.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("audio stream error: {0}")]
    Stream(#[from] cpal::StreamError),

    #[error("audio stream closed before the recording completed")]
    StreamClosed,

    #[error("recording stalled: {collected} of {expected} frames after deadline")]
    Timeout { collected: usize, expected: usize },

    #[error("capture failed: {0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// CaptureProvider trait
// ---------------------------------------------------------------------------

/// Blocking source of fixed-length mono recordings.
///
/// Implementations are moved onto the capture thread, hence `Send`.
pub trait CaptureProvider: Send {
    /// Record `duration` of mono audio, requesting `sample_rate` Hz.
    ///
    /// The returned sample reports the rate actually delivered by the device,
    /// which may differ when the requested rate is unsupported.
    fn record(&mut self, duration: Duration, sample_rate: u32) -> Result<AudioSample, CaptureError>;
}

// ---------------------------------------------------------------------------
// CpalRecorder
// ---------------------------------------------------------------------------

/// Grace period on top of the recording length before a silent device is
/// reported as stalled.
const STALL_GRACE: Duration = Duration::from_secs(2);

type ChunkResult = Result<Vec<f32>, cpal::StreamError>;

/// [`CaptureProvider`] backed by `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use urban_sounds::audio::{CaptureProvider, CpalRecorder};
///
/// let mut recorder = CpalRecorder::new(None);
/// let sample = recorder.record(Duration::from_secs(5), 48_000).unwrap();
/// println!("{} frames @ {} Hz", sample.len(), sample.sample_rate());
/// ```
#[derive(Debug, Clone)]
pub struct CpalRecorder {
    /// Input device name; `None` selects the host default.
    device_name: Option<String>,
}

impl CpalRecorder {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }

    fn open_device(&self) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        match &self.device_name {
            None => host.default_input_device().ok_or(CaptureError::NoDevice),
            Some(wanted) => host
                .input_devices()?
                .find(|d| d.name().map(|n| &n == wanted).unwrap_or(false))
                .ok_or_else(|| CaptureError::DeviceNotFound(wanted.clone())),
        }
    }
}

impl CaptureProvider for CpalRecorder {
    fn record(&mut self, duration: Duration, sample_rate: u32) -> Result<AudioSample, CaptureError> {
        let started = SystemTime::now();
        let device = self.open_device()?;
        let supported = select_config(&device, sample_rate)?;

        let channels = supported.channels();
        let actual_rate = supported.sample_rate().0;
        if actual_rate != sample_rate {
            log::debug!("capture: device does not offer {sample_rate} Hz, recording at {actual_rate} Hz");
        }

        let config: cpal::StreamConfig = supported.config();
        let (tx, rx) = mpsc::channel::<ChunkResult>();

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => {
                build_stream::<f32, _>(&device, &config, tx, |data: &[f32]| data.to_vec())?
            }
            cpal::SampleFormat::I16 => build_stream::<i16, _>(&device, &config, tx, i16_to_f32)?,
            cpal::SampleFormat::I32 => build_stream::<i32, _>(&device, &config, tx, i32_to_f32)?,
            other => return Err(CaptureError::UnsupportedFormat(format!("{other:?}"))),
        };
        stream.play()?;

        let expected = (duration.as_secs_f64() * actual_rate as f64).round() as usize;
        let deadline = Instant::now() + duration + STALL_GRACE;
        let mut mono: Vec<f32> = Vec::with_capacity(expected);

        while mono.len() < expected {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(Ok(chunk)) => mono.extend(downmix_to_mono(&chunk, channels)),
                Ok(Err(err)) => return Err(CaptureError::Stream(err)),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    return Err(CaptureError::Timeout {
                        collected: mono.len(),
                        expected,
                    })
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => return Err(CaptureError::StreamClosed),
            }
        }

        // Dropping the stream stops the hardware before the buffer is handed on.
        drop(stream);
        mono.truncate(expected);

        Ok(AudioSample::new(started, mono, actual_rate))
    }
}

/// Prefer a config that offers `sample_rate` exactly (fewest channels, float
/// first); otherwise fall back to the device default.
fn select_config(
    device: &cpal::Device,
    sample_rate: u32,
) -> Result<cpal::SupportedStreamConfig, CaptureError> {
    if let Ok(ranges) = device.supported_input_configs() {
        let mut candidates: Vec<cpal::SupportedStreamConfigRange> = ranges
            .filter(|r| {
                r.min_sample_rate().0 <= sample_rate
                    && sample_rate <= r.max_sample_rate().0
                    && format_rank(r.sample_format()).is_some()
            })
            .collect();
        candidates.sort_by_key(|r| (r.channels(), format_rank(r.sample_format())));

        if let Some(range) = candidates.into_iter().next() {
            return Ok(range.with_sample_rate(cpal::SampleRate(sample_rate)));
        }
    }

    Ok(device.default_input_config()?)
}

fn format_rank(format: cpal::SampleFormat) -> Option<u8> {
    match format {
        cpal::SampleFormat::F32 => Some(0),
        cpal::SampleFormat::I32 => Some(1),
        cpal::SampleFormat::I16 => Some(2),
        _ => None,
    }
}

fn build_stream<T, F>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    tx: mpsc::Sender<ChunkResult>,
    convert: F,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::SizedSample,
    F: Fn(&[T]) -> Vec<f32> + Send + 'static,
{
    let err_tx = tx.clone();
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            // The receiver is gone once the recording is complete.
            let _ = tx.send(Ok(convert(data)));
        },
        move |err: cpal::StreamError| {
            log::error!("capture: cpal stream error: {err}");
            let _ = err_tx.send(Err(err));
        },
        None,
    )?;
    Ok(stream)
}

// ---------------------------------------------------------------------------
// ScriptedCapture  (test-only)
// ---------------------------------------------------------------------------

/// A test double that replays a fixed script of recordings and failures.
///
/// Each `record` call pops the next step after sleeping `delay`. Once the
/// script is exhausted every call fails with [`CaptureError::Other`].
#[cfg(test)]
pub struct ScriptedCapture {
    steps: std::collections::VecDeque<Result<Vec<f32>, CaptureError>>,
    delay: Duration,
    sample_rate: Option<u32>,
}

#[cfg(test)]
impl ScriptedCapture {
    pub fn new(steps: Vec<Result<Vec<f32>, CaptureError>>) -> Self {
        Self {
            steps: steps.into(),
            delay: Duration::ZERO,
            sample_rate: None,
        }
    }

    /// Recordings whose first sample is the step index, for FIFO checks.
    pub fn numbered(count: usize, len: usize) -> Self {
        Self::new(
            (0..count)
                .map(|i| {
                    let mut buf = vec![0.0_f32; len.max(1)];
                    buf[0] = i as f32;
                    Ok(buf)
                })
                .collect(),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Pretend the device only offers `rate`.
    pub fn with_device_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }
}

#[cfg(test)]
impl CaptureProvider for ScriptedCapture {
    fn record(&mut self, _duration: Duration, sample_rate: u32) -> Result<AudioSample, CaptureError> {
        std::thread::sleep(self.delay);
        let rate = self.sample_rate.unwrap_or(sample_rate);
        match self.steps.pop_front() {
            Some(Ok(samples)) => Ok(AudioSample::new(SystemTime::now(), samples, rate)),
            Some(Err(e)) => Err(e),
            None => Err(CaptureError::Other("script exhausted".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
