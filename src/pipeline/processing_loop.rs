//! Consumer loop: dequeue → classify → metric → enrich → publish.
//!
//! Every failure is contained at the cycle level. A classification error
//! drops the sample without a report; a publish error loses (or, with the
//! retrying publisher, defers) that one report. Either way the next sample
//! is processed normally and nothing is re-classified.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::audio::{peak_to_peak, AudioSample};
use crate::classify::{Classifier, LabelVocabulary};
use crate::config::ProcessingConfig;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::state::Stage;
use crate::publish::{PublishError, Publisher};
use crate::report::ReportBuilder;
use crate::telemetry::TelemetrySource;

// ---------------------------------------------------------------------------
// ProcessingStats / CycleOutcome
// ---------------------------------------------------------------------------

/// Counters returned when the processing loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    pub dequeued: u64,
    pub classified: u64,
    pub classification_failures: u64,
    pub published: u64,
    pub publish_failures: u64,
}

/// How one processing cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Published,
    ClassificationFailed,
    PublishFailed,
}

// ---------------------------------------------------------------------------
// ProcessingLoop
// ---------------------------------------------------------------------------

/// Owns every collaborator the consumer thread needs.
///
/// Built on the main thread, then moved onto the processing thread by
/// [`Pipeline::start`](crate::pipeline::Pipeline::start).
pub struct ProcessingLoop {
    classifier: Arc<dyn Classifier>,
    vocabulary: LabelVocabulary,
    telemetry: Box<dyn TelemetrySource>,
    publisher: Box<dyn Publisher>,
    reports: ReportBuilder,
    dequeue_timeout: Duration,
    stats: ProcessingStats,
}

impl ProcessingLoop {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        vocabulary: LabelVocabulary,
        telemetry: Box<dyn TelemetrySource>,
        publisher: Box<dyn Publisher>,
        reports: ReportBuilder,
    ) -> Self {
        Self {
            classifier,
            vocabulary,
            telemetry,
            publisher,
            reports,
            dequeue_timeout: ProcessingConfig::default().dequeue_timeout(),
            stats: ProcessingStats::default(),
        }
    }

    /// How long each dequeue waits before re-checking the lifecycle signal.
    pub fn with_dequeue_timeout(mut self, timeout: Duration) -> Self {
        self.dequeue_timeout = timeout;
        self
    }

    pub fn stats(&self) -> ProcessingStats {
        self.stats
    }

    /// Process samples until `ctx`'s lifecycle signal clears.
    ///
    /// A sample that has been dequeued is always carried through to the end
    /// of its cycle; the signal is only checked before the next dequeue.
    pub fn run(mut self, ctx: &PipelineContext) -> ProcessingStats {
        log::info!(
            "processing: started ({} labels, top {}, topic {})",
            self.vocabulary.len(),
            self.reports.top_n(),
            self.reports.topic()
        );

        while ctx.is_active() {
            let Some(sample) = ctx.queue().dequeue_blocking(self.dequeue_timeout) else {
                log::trace!(
                    "processing: [{}] queue empty for {:?}",
                    Stage::WaitForSample,
                    self.dequeue_timeout
                );
                continue;
            };
            self.stats.dequeued += 1;
            self.process_sample(sample);
        }

        let s = self.stats;
        log::info!(
            "processing: {} after {} sample(s) ({} classified, {} failed; {} published, {} not delivered)",
            Stage::Stopped,
            s.dequeued,
            s.classified,
            s.classification_failures,
            s.published,
            s.publish_failures
        );
        s
    }

    /// Run one full cycle on an already-dequeued sample.
    pub fn process_sample(&mut self, sample: AudioSample) -> CycleOutcome {
        let captured_at = sample.capture_time();
        let ts = sample.capture_epoch_secs();

        // ── Classifying ──────────────────────────────────────────────────
        let result = match self.classifier.classify(&sample, &self.vocabulary) {
            Ok(result) => result,
            Err(e) => {
                self.stats.classification_failures += 1;
                log::warn!(
                    "processing: [{}] sample captured at {ts} dropped: {e}",
                    Stage::Classifying
                );
                return CycleOutcome::ClassificationFailed;
            }
        };
        self.stats.classified += 1;
        if let Some(best) = result.best() {
            log::debug!(
                "processing: sample {ts} best match {} ({:.2})",
                best.label,
                best.score
            );
        }

        // ── MetricComputation ────────────────────────────────────────────
        let amplitude = peak_to_peak(sample.samples());
        drop(sample);
        log::trace!(
            "processing: [{}] amplitude {amplitude:.3} for sample {ts}",
            Stage::MetricComputation
        );

        // ── Enrichment ───────────────────────────────────────────────────
        let temperature = self.telemetry.read_temperature();
        if temperature.is_none() {
            log::debug!(
                "processing: [{}] no device temperature for sample {ts}",
                Stage::Enrichment
            );
        }

        // ── Publishing ───────────────────────────────────────────────────
        let report = self.reports.build(captured_at, &result, amplitude, temperature);
        let outcome = report
            .to_payload(SystemTime::now())
            .map_err(PublishError::from)
            .and_then(|payload| self.publisher.publish(&report.topic, &payload));

        match outcome {
            Ok(()) => {
                self.stats.published += 1;
                log::info!(
                    "publish: report for sample {ts} sent to {} ({} label(s), amplitude {:.3})",
                    report.topic,
                    report.top_labels.len(),
                    report.amplitude_metric
                );
                CycleOutcome::Published
            }
            Err(e @ PublishError::Deferred { .. }) => {
                self.stats.publish_failures += 1;
                log::warn!(
                    "publish: [{}] report for sample {ts} held back: {e}",
                    Stage::Publishing
                );
                CycleOutcome::PublishFailed
            }
            Err(e) => {
                self.stats.publish_failures += 1;
                log::warn!(
                    "publish: [{}] report for sample {ts} not delivered: {e}",
                    Stage::Publishing
                );
                CycleOutcome::PublishFailed
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use super::*;
    use crate::classify::{ClassificationError, ClassificationResult, LabelScore, MockClassifier};
    use crate::publish::{MockPublisher, PublishLog};
    use crate::report::{AMPLITUDE_KEY, CAPTURED_AT_KEY, TEMPERATURE_KEY};
    use crate::telemetry::FixedTemperature;

    const TOPIC: &str = "pipeline/urbansounds/OE-007";

    fn alarm() -> ClassificationResult {
        ClassificationResult::new(vec![
            LabelScore::new("Alarm", 0.81),
            LabelScore::new("Talking", 0.40),
            LabelScore::new("Silence", 0.05),
        ])
    }

    fn build(
        classifier: Arc<dyn Classifier>,
        temperature: Option<f32>,
        publisher: MockPublisher,
    ) -> ProcessingLoop {
        ProcessingLoop::new(
            classifier,
            LabelVocabulary::new(["Alarm", "Talking", "Silence"]).unwrap(),
            Box::new(FixedTemperature(temperature)),
            Box::new(publisher),
            ReportBuilder::new("urbansounds", "OE-007", TOPIC, 3),
        )
        .with_dequeue_timeout(Duration::from_millis(5))
    }

    fn sample_at(secs: u64, samples: Vec<f32>) -> AudioSample {
        AudioSample::new(UNIX_EPOCH + Duration::from_secs(secs), samples, 48_000)
    }

    #[test]
    fn publishes_report_with_labels_metric_and_temperature() {
        let (publisher, log) = MockPublisher::ok();
        let mut pipeline = build(Arc::new(MockClassifier::ok(alarm())), Some(54.9), publisher);

        let outcome = pipeline.process_sample(sample_at(1_718_000_000, vec![-1.0, 0.3, 0.9]));
        assert_eq!(outcome, CycleOutcome::Published);

        let delivered = log.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, TOPIC);

        let msg = &log.messages()[0];
        let fields = &msg.payload_fields;
        assert_eq!(fields.len(), 6);
        assert_eq!(fields["Alarm"], serde_json::json!(0.81));
        assert_eq!(fields[TEMPERATURE_KEY], serde_json::json!(54.9));
        assert_eq!(fields[AMPLITUDE_KEY], serde_json::json!(1.9));
        assert_eq!(fields[CAPTURED_AT_KEY], serde_json::json!(1_718_000_000u64));
    }

    #[test]
    fn absent_temperature_still_publishes() {
        let (publisher, log) = MockPublisher::ok();
        let mut pipeline = build(Arc::new(MockClassifier::ok(alarm())), None, publisher);

        assert_eq!(
            pipeline.process_sample(sample_at(10, vec![0.5; 16])),
            CycleOutcome::Published
        );
        let msg = &log.messages()[0];
        assert!(!msg.payload_fields.contains_key(TEMPERATURE_KEY));
        assert_eq!(msg.payload_fields[AMPLITUDE_KEY], serde_json::json!(0.0));
    }

    #[test]
    fn classification_failure_drops_sample_and_continues() {
        let classifier = Arc::new(MockClassifier::scripted(
            vec![Err(ClassificationError::Timeout)],
            Ok(alarm()),
        ));
        let (publisher, log) = MockPublisher::ok();
        let mut pipeline = build(classifier.clone(), Some(40.0), publisher);

        assert_eq!(
            pipeline.process_sample(sample_at(1, vec![1.0])),
            CycleOutcome::ClassificationFailed
        );
        assert_eq!(
            pipeline.process_sample(sample_at(2, vec![2.0])),
            CycleOutcome::Published
        );

        assert_eq!(log.attempts(), 1);
        assert_eq!(log.messages()[0].payload_fields[CAPTURED_AT_KEY], serde_json::json!(2u64));
        assert_eq!(classifier.seen(), vec![1.0, 2.0]);

        let stats = pipeline.stats();
        assert_eq!(stats.classification_failures, 1);
        assert_eq!(stats.classified, 1);
        assert_eq!(stats.published, 1);
    }

    #[test]
    fn publish_failure_does_not_reclassify() {
        let classifier = Arc::new(MockClassifier::ok(alarm()));
        let (publisher, log) = MockPublisher::scripted(vec![true]);
        let mut pipeline = build(classifier.clone(), None, publisher);

        assert_eq!(
            pipeline.process_sample(sample_at(1, vec![1.0])),
            CycleOutcome::PublishFailed
        );
        assert_eq!(
            pipeline.process_sample(sample_at(2, vec![2.0])),
            CycleOutcome::Published
        );

        assert_eq!(classifier.seen(), vec![1.0, 2.0]);
        assert_eq!(log.attempts(), 2);
        assert_eq!(pipeline.stats().publish_failures, 1);
    }

    #[test]
    fn empty_sample_is_a_classification_failure() {
        let (publisher, log) = MockPublisher::ok();
        let mut pipeline = build(Arc::new(MockClassifier::ok(alarm())), None, publisher);
        assert_eq!(
            pipeline.process_sample(sample_at(1, Vec::new())),
            CycleOutcome::ClassificationFailed
        );
        assert_eq!(log.attempts(), 0);
    }

    #[test]
    fn run_processes_in_fifo_order_until_stopped() {
        let ctx = Arc::new(PipelineContext::default());
        for i in 0..5 {
            let _ = ctx.queue().enqueue(sample_at(100 + i, vec![i as f32]));
        }

        let classifier = Arc::new(MockClassifier::ok(alarm()));
        let (publisher, log): (MockPublisher, PublishLog) = MockPublisher::ok();
        let pipeline = build(classifier.clone(), None, publisher);

        let handle = {
            let ctx = Arc::clone(&ctx);
            std::thread::spawn(move || pipeline.run(&ctx))
        };
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while log.attempts() < 5 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        ctx.signal().signal_stop();
        let stats = handle.join().unwrap();

        assert_eq!(stats.dequeued, 5);
        assert_eq!(stats.published, 5);
        assert_eq!(classifier.seen(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let stamps: Vec<u64> = log
            .messages()
            .iter()
            .map(|m| m.payload_fields[CAPTURED_AT_KEY].as_u64().unwrap())
            .collect();
        assert_eq!(stamps, [100, 101, 102, 103, 104]);
    }
}
