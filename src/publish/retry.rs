//! Retrying publisher — wraps any [`Publisher`] with a bounded local backlog.
//!
//! When a delivery fails the message is kept in a FIFO backlog instead of
//! being discarded. On the next call the backlog is flushed oldest-first
//! before the new message, so the broker still sees reports in capture
//! order. While a back-off window is open no network attempt is made; new
//! messages simply join the backlog.
//!
//! Once the backlog holds `capacity` messages the oldest is evicted.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::RetryConfig;
use crate::publish::publisher::{PublishError, Publisher};

// ---------------------------------------------------------------------------
// RetryingPublisher
// ---------------------------------------------------------------------------

/// Store-and-forward wrapper around an inner [`Publisher`].
///
/// Returns `Ok(())` only when the new message (and everything queued ahead
/// of it) reached the broker. Any other outcome returns an error; if the
/// message was retained, the error is [`PublishError::Deferred`] or the
/// inner error that caused the deferral.
pub struct RetryingPublisher<P: Publisher> {
    inner: P,
    backlog: VecDeque<(String, Vec<u8>)>,
    capacity: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
    next_backoff: Duration,
    retry_at: Option<Instant>,
    evicted: u64,
}

impl<P: Publisher> RetryingPublisher<P> {
    pub fn new(inner: P, capacity: usize, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            inner,
            backlog: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
            next_backoff: initial_backoff,
            retry_at: None,
            evicted: 0,
        }
    }

    pub fn from_config(inner: P, config: &RetryConfig) -> Self {
        Self::new(
            inner,
            config.capacity,
            Duration::from_millis(config.initial_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
        )
    }

    /// Messages waiting for redelivery.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Messages dropped because the backlog was full.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    fn enqueue(&mut self, topic: &str, payload: &[u8]) {
        if self.backlog.len() >= self.capacity {
            self.backlog.pop_front();
            self.evicted += 1;
            log::warn!(
                "publish: retry backlog full ({}), evicted oldest message",
                self.capacity
            );
        }
        self.backlog.push_back((topic.to_string(), payload.to_vec()));
    }

    fn record_failure(&mut self, now: Instant) {
        self.retry_at = Some(now + self.next_backoff);
        log::debug!(
            "publish: backing off for {:?} ({} queued)",
            self.next_backoff,
            self.backlog.len()
        );
        self.next_backoff = (self.next_backoff * 2).min(self.max_backoff);
    }

    fn record_success(&mut self) {
        self.retry_at = None;
        self.next_backoff = self.initial_backoff;
    }

    /// Deliver queued messages oldest-first until one fails.
    fn flush(&mut self) -> Result<(), PublishError> {
        while let Some((topic, payload)) = self.backlog.front() {
            self.inner.publish(topic, payload)?;
            self.backlog.pop_front();
        }
        Ok(())
    }
}

impl<P: Publisher> Publisher for RetryingPublisher<P> {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let now = Instant::now();

        if self.retry_at.is_some_and(|at| now < at) {
            self.enqueue(topic, payload);
            return Err(PublishError::Deferred {
                backlog: self.backlog.len(),
            });
        }

        if !self.backlog.is_empty() {
            let queued = self.backlog.len();
            if let Err(e) = self.flush() {
                self.enqueue(topic, payload);
                self.record_failure(now);
                return Err(e);
            }
            log::info!("publish: redelivered {queued} queued message(s)");
        }

        match self.inner.publish(topic, payload) {
            Ok(()) => {
                self.record_success();
                Ok(())
            }
            Err(e) => {
                self.enqueue(topic, payload);
                self.record_failure(now);
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::publisher::MockPublisher;

    const NO_WAIT: Duration = Duration::ZERO;
    const FOREVER: Duration = Duration::from_secs(3600);

    fn payloads(log: &crate::publish::publisher::PublishLog) -> Vec<Vec<u8>> {
        log.delivered().into_iter().map(|(_, p)| p).collect()
    }

    #[test]
    fn passes_through_success() {
        let (mock, log) = MockPublisher::ok();
        let mut publisher = RetryingPublisher::new(mock, 4, NO_WAIT, NO_WAIT);
        publisher.publish("t", b"a").unwrap();
        assert_eq!(payloads(&log), vec![b"a".to_vec()]);
        assert_eq!(publisher.backlog_len(), 0);
    }

    #[test]
    fn failed_message_is_redelivered_before_next() {
        let (mock, log) = MockPublisher::scripted(vec![true]);
        let mut publisher = RetryingPublisher::new(mock, 4, NO_WAIT, NO_WAIT);

        assert!(publisher.publish("t", b"first").is_err());
        assert_eq!(publisher.backlog_len(), 1);

        publisher.publish("t", b"second").unwrap();
        assert_eq!(payloads(&log), vec![b"first".to_vec(), b"second".to_vec()]);
        assert_eq!(publisher.backlog_len(), 0);
    }

    #[test]
    fn full_backlog_evicts_oldest() {
        let (mock, log) = MockPublisher::scripted(vec![true, true, true]);
        let mut publisher = RetryingPublisher::new(mock, 2, NO_WAIT, NO_WAIT);

        // Each call first retries the head of the backlog, which fails.
        assert!(publisher.publish("t", b"1").is_err());
        assert!(publisher.publish("t", b"2").is_err());
        assert!(publisher.publish("t", b"3").is_err());
        assert_eq!(publisher.backlog_len(), 2);
        assert_eq!(publisher.evicted(), 1);

        publisher.publish("t", b"4").unwrap();
        assert_eq!(
            payloads(&log),
            vec![b"2".to_vec(), b"3".to_vec(), b"4".to_vec()]
        );
    }

    #[test]
    fn backoff_window_defers_without_network_attempt() {
        let (mock, log) = MockPublisher::scripted(vec![true]);
        let mut publisher = RetryingPublisher::new(mock, 4, FOREVER, FOREVER);

        assert!(matches!(
            publisher.publish("t", b"a"),
            Err(PublishError::Connection(_))
        ));
        assert!(matches!(
            publisher.publish("t", b"b"),
            Err(PublishError::Deferred { backlog: 2 })
        ));
        assert_eq!(log.attempts(), 1);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let (mock, _log) = MockPublisher::failing();
        let initial = Duration::from_millis(10);
        let max = Duration::from_millis(25);
        let mut publisher = RetryingPublisher::new(mock, 4, initial, max);

        let now = Instant::now();
        publisher.record_failure(now);
        assert_eq!(publisher.next_backoff, Duration::from_millis(20));
        publisher.record_failure(now);
        assert_eq!(publisher.next_backoff, max);
        publisher.record_failure(now);
        assert_eq!(publisher.next_backoff, max);

        publisher.record_success();
        assert_eq!(publisher.next_backoff, initial);
        assert!(publisher.retry_at.is_none());
    }

    #[test]
    fn topic_is_preserved_for_queued_messages() {
        let (mock, log) = MockPublisher::scripted(vec![true]);
        let mut publisher = RetryingPublisher::new(mock, 4, NO_WAIT, NO_WAIT);
        let _ = publisher.publish("a/topic", b"x");
        publisher.publish("b/topic", b"y").unwrap();

        let topics: Vec<String> = log.delivered().into_iter().map(|(t, _)| t).collect();
        assert_eq!(topics, vec!["a/topic", "b/topic"]);
    }
}
