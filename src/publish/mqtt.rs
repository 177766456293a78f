//! MQTT publisher built on `rumqttc`.
//!
//! Every [`publish`](Publisher::publish) call opens a fresh session, sends
//! one QoS 1 message, waits for the broker's `PubAck`, and disconnects.
//! Nothing is shared across calls, so a broker restart between cycles needs
//! no reconnect logic.

use std::time::{Duration, Instant};

use rumqttc::{Client, Event, MqttOptions, Outgoing, Packet, QoS};

use crate::config::PublishConfig;
use crate::publish::publisher::{PublishError, Publisher};

/// Minimum keep-alive accepted by `rumqttc`.
const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);

/// How long to wait for the outgoing `DISCONNECT` to flush.
const DISCONNECT_GRACE: Duration = Duration::from_millis(500);

/// Request-queue depth of the per-message client.
const CLIENT_CAPACITY: usize = 10;

/// Publishes reports to an MQTT broker.
///
/// All connection details come from [`PublishConfig`].
#[derive(Debug, Clone)]
pub struct MqttPublisher {
    config: PublishConfig,
    client_id: String,
}

impl MqttPublisher {
    pub fn new(config: &PublishConfig, client_id: impl Into<String>) -> Self {
        Self {
            config: config.clone(),
            client_id: client_id.into(),
        }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.config.host, self.config.port);
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs).max(MIN_KEEP_ALIVE));

        if let Some(user) = self.config.username.as_deref().filter(|u| !u.is_empty()) {
            options.set_credentials(user, self.config.password.clone().unwrap_or_default());
        }
        options
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

impl Publisher for MqttPublisher {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let (client, mut connection) = Client::new(self.options(), CLIENT_CAPACITY);

        client
            .publish(topic, QoS::AtLeastOnce, false, payload.to_vec())
            .map_err(|e| PublishError::Send(e.to_string()))?;

        let timeout = self.timeout();
        let deadline = Instant::now() + timeout;

        // ── Drive the event loop until the broker acknowledges ───────────
        let outcome = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break Err(PublishError::Timeout(timeout));
            }
            match connection.recv_timeout(remaining) {
                Ok(Ok(Event::Incoming(Packet::PubAck(_)))) => break Ok(()),
                Ok(Ok(event)) => log::trace!("publish: mqtt event {event:?}"),
                Ok(Err(e)) => break Err(PublishError::Connection(e.to_string())),
                Err(_) => break Err(PublishError::Timeout(timeout)),
            }
        };

        // ── Always tear the session down ─────────────────────────────────
        if let Err(e) = client.disconnect() {
            log::debug!("publish: disconnect request failed: {e}");
        } else if outcome.is_ok() {
            loop {
                match connection.recv_timeout(DISCONNECT_GRACE) {
                    Ok(Ok(Event::Outgoing(Outgoing::Disconnect))) => break,
                    Ok(Ok(_)) => continue,
                    Ok(Err(_)) | Err(_) => break,
                }
            }
        }

        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PublishConfig {
        PublishConfig {
            host: "127.0.0.1".into(),
            // Reserved port; nothing should be listening.
            port: 1,
            timeout_secs: 2,
            ..PublishConfig::default()
        }
    }

    #[test]
    fn publisher_is_object_safe() {
        let publisher: Box<dyn Publisher> = Box::new(MqttPublisher::new(&config(), "test"));
        drop(publisher);
    }

    #[test]
    fn keep_alive_is_clamped_to_minimum() {
        let mut cfg = config();
        cfg.keep_alive_secs = 1;
        let publisher = MqttPublisher::new(&cfg, "test");
        assert_eq!(publisher.options().keep_alive(), MIN_KEEP_ALIVE);
    }

    #[test]
    fn unreachable_broker_fails_without_panicking() {
        let mut publisher = MqttPublisher::new(&config(), "test");
        let err = publisher.publish("pipeline/test", b"{}").unwrap_err();
        assert!(
            matches!(err, PublishError::Connection(_) | PublishError::Timeout(_)),
            "unexpected error: {err:?}"
        );
    }
}
