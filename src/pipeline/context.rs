//! The only state shared between the capture and processing threads.

use crate::config::QueueConfig;
use crate::pipeline::queue::SampleQueue;
use crate::pipeline::signal::LifecycleSignal;

/// Sample queue plus lifecycle signal, shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct PipelineContext {
    queue: SampleQueue,
    signal: LifecycleSignal,
}

impl PipelineContext {
    pub fn new(queue: SampleQueue) -> Self {
        Self {
            queue,
            signal: LifecycleSignal::new(),
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(SampleQueue::from_config(config))
    }

    pub fn queue(&self) -> &SampleQueue {
        &self.queue
    }

    pub fn signal(&self) -> &LifecycleSignal {
        &self.signal
    }

    pub fn is_active(&self) -> bool {
        self.signal.is_active()
    }
}
