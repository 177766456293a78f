//! Report delivery to the message bus.
//!
//! [`Publisher`] is the seam the processing loop talks to. The production
//! implementation is [`MqttPublisher`]; [`RetryingPublisher`] optionally
//! wraps it with a bounded store-and-forward backlog.

pub mod mqtt;
pub mod publisher;
pub mod retry;

pub use mqtt::MqttPublisher;
pub use publisher::{PublishError, Publisher};
pub use retry::RetryingPublisher;

#[cfg(test)]
pub use publisher::{MockPublisher, PublishLog};

use crate::config::AppConfig;

/// Build the configured publisher, wrapping it for retries when
/// `publish.retry.capacity` is non-zero.
pub fn from_config(config: &AppConfig) -> Box<dyn Publisher> {
    let mqtt = MqttPublisher::new(&config.publish, config.publish.resolved_client_id(&config.device));
    if config.publish.retry.capacity > 0 {
        log::info!(
            "publish: retry backlog enabled (capacity {})",
            config.publish.retry.capacity
        );
        Box::new(RetryingPublisher::from_config(mqtt, &config.publish.retry))
    } else {
        Box::new(mqtt)
    }
}
