//! Core `Publisher` trait and error type.
//!
//! A publisher delivers one serialised report to one topic. Each call is a
//! self-contained connect → send → disconnect sequence: no connection state
//! survives between calls, so the processing loop never has to reason about
//! a half-open session.

use thiserror::Error;

use crate::report::ReportError;

// ---------------------------------------------------------------------------
// PublishError
// ---------------------------------------------------------------------------

/// Errors that can occur while publishing one report.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Broker unreachable, connection refused, or the session dropped.
    #[error("broker connection failed: {0}")]
    Connection(String),

    /// The client refused to queue the message.
    #[error("failed to send message: {0}")]
    Send(String),

    /// No acknowledgement within the configured timeout.
    #[error("broker did not acknowledge within {0:?}")]
    Timeout(std::time::Duration),

    /// The report could not be serialised.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Not delivered yet; held in the local retry buffer.
    #[error("delivery deferred, {backlog} message(s) awaiting retry")]
    Deferred { backlog: usize },
}

// ---------------------------------------------------------------------------
// Publisher trait
// ---------------------------------------------------------------------------

/// Delivers serialised reports to the message bus.
///
/// Implementations are owned by the processing thread, hence `Send` and
/// `&mut self`.
pub trait Publisher: Send {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError>;
}

// Compile-time assertion: Box<dyn Publisher> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Publisher>) {}
};

// ---------------------------------------------------------------------------
// MockPublisher  (test-only)
// ---------------------------------------------------------------------------

/// Shared record of what a [`MockPublisher`] delivered.
///
/// Cloned into the mock before it is moved onto the processing thread so the
/// test can inspect deliveries afterwards.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct PublishLog {
    inner: std::sync::Arc<std::sync::Mutex<PublishLogInner>>,
}

#[cfg(test)]
#[derive(Debug, Default)]
struct PublishLogInner {
    delivered: Vec<(String, Vec<u8>)>,
    attempts: usize,
}

#[cfg(test)]
impl PublishLog {
    /// Successfully delivered `(topic, payload)` pairs in delivery order.
    pub fn delivered(&self) -> Vec<(String, Vec<u8>)> {
        self.inner.lock().unwrap().delivered.clone()
    }

    /// Delivered payloads parsed back into wire messages.
    pub fn messages(&self) -> Vec<crate::report::WireMessage> {
        self.delivered()
            .iter()
            .map(|(_, p)| serde_json::from_slice(p).unwrap())
            .collect()
    }

    /// Every call to `publish`, successful or not.
    pub fn attempts(&self) -> usize {
        self.inner.lock().unwrap().attempts
    }
}

/// A test double that fails according to a script and logs deliveries.
///
/// `script[i] == true` makes the i-th call fail; calls past the end of the
/// script succeed unless the mock was built with [`MockPublisher::failing`].
#[cfg(test)]
pub struct MockPublisher {
    script: std::collections::VecDeque<bool>,
    fail_by_default: bool,
    log: PublishLog,
}

#[cfg(test)]
impl MockPublisher {
    pub fn ok() -> (Self, PublishLog) {
        Self::scripted(Vec::new())
    }

    pub fn failing() -> (Self, PublishLog) {
        let (mut mock, log) = Self::scripted(Vec::new());
        mock.fail_by_default = true;
        (mock, log)
    }

    pub fn scripted(script: Vec<bool>) -> (Self, PublishLog) {
        let log = PublishLog::default();
        let mock = Self {
            script: script.into(),
            fail_by_default: false,
            log: log.clone(),
        };
        (mock, log)
    }
}

#[cfg(test)]
impl Publisher for MockPublisher {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let fail = self.script.pop_front().unwrap_or(self.fail_by_default);
        let mut log = self.log.inner.lock().unwrap();
        log.attempts += 1;
        if fail {
            return Err(PublishError::Connection("mock broker unreachable".into()));
        }
        log.delivered.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_follows_script() {
        let (mut publisher, log) = MockPublisher::scripted(vec![false, true]);
        assert!(publisher.publish("t", b"a").is_ok());
        assert!(publisher.publish("t", b"b").is_err());
        assert!(publisher.publish("t", b"c").is_ok());

        assert_eq!(log.attempts(), 3);
        let payloads: Vec<Vec<u8>> = log.delivered().into_iter().map(|(_, p)| p).collect();
        assert_eq!(payloads, vec![b"a".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn failing_mock_never_delivers() {
        let (mut publisher, log) = MockPublisher::failing();
        for _ in 0..3 {
            assert!(matches!(
                publisher.publish("t", b"x"),
                Err(PublishError::Connection(_))
            ));
        }
        assert!(log.delivered().is_empty());
        assert_eq!(log.attempts(), 3);
    }

    #[test]
    fn deferred_display_mentions_backlog() {
        let e = PublishError::Deferred { backlog: 4 };
        assert!(e.to_string().contains('4'));
    }
}
