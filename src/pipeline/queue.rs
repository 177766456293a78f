//! FIFO hand-off between the capture and processing loops.
//!
//! Unbounded by default. When a capacity is configured the
//! [`OverflowPolicy`] decides what happens to a sample that arrives while the
//! queue is full. `Block` waits at most [`SampleQueue::block_wait`] and then
//! hands the sample back, so the producer can re-check the lifecycle signal
//! instead of blocking forever.
//!
//! Lock poisoning is recovered with `PoisonError::into_inner`: the deque is
//! always left structurally valid, so a panic elsewhere does not invalidate it.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::audio::AudioSample;
use crate::config::{OverflowPolicy, QueueConfig};

/// How long a `Block` enqueue waits for space before returning
/// [`Enqueued::Full`].
const DEFAULT_BLOCK_WAIT: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Enqueued
// ---------------------------------------------------------------------------

/// Outcome of [`SampleQueue::enqueue`].
#[derive(Debug)]
#[must_use]
pub enum Enqueued {
    /// Appended without displacing anything.
    Accepted,
    /// Appended; the returned oldest sample was evicted to make room.
    Evicted(AudioSample),
    /// Refused; the queue was full and the policy drops new samples.
    Rejected(AudioSample),
    /// Still full after the bounded wait; the sample is handed back.
    Full(AudioSample),
}

impl Enqueued {
    /// `true` when the new sample is now in the queue.
    pub fn is_queued(&self) -> bool {
        matches!(self, Enqueued::Accepted | Enqueued::Evicted(_))
    }
}

// ---------------------------------------------------------------------------
// SampleQueue
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SampleQueue {
    items: Mutex<VecDeque<AudioSample>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
    policy: OverflowPolicy,
    block_wait: Duration,
}

impl SampleQueue {
    pub fn unbounded() -> Self {
        Self::with_limit(None, OverflowPolicy::default())
    }

    /// A queue holding at most `capacity` samples (minimum 1).
    pub fn bounded(capacity: usize, policy: OverflowPolicy) -> Self {
        Self::with_limit(Some(capacity.max(1)), policy)
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        match config.capacity {
            Some(capacity) => Self::bounded(capacity, config.overflow),
            None => Self::unbounded(),
        }
    }

    fn with_limit(capacity: Option<usize>, policy: OverflowPolicy) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            policy,
            block_wait: DEFAULT_BLOCK_WAIT,
        }
    }

    /// Override how long a `Block` enqueue waits for space.
    pub fn with_block_wait(mut self, wait: Duration) -> Self {
        self.block_wait = wait;
        self
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn block_wait(&self) -> Duration {
        self.block_wait
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AudioSample>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `sample`, applying the overflow policy when bounded and full.
    pub fn enqueue(&self, sample: AudioSample) -> Enqueued {
        let mut items = self.lock();

        let Some(capacity) = self.capacity else {
            items.push_back(sample);
            self.not_empty.notify_one();
            return Enqueued::Accepted;
        };

        if items.len() < capacity {
            items.push_back(sample);
            self.not_empty.notify_one();
            return Enqueued::Accepted;
        }

        match self.policy {
            OverflowPolicy::DropOldest => {
                // Full and capacity >= 1, so there is a front to evict.
                let evicted = items.pop_front();
                items.push_back(sample);
                self.not_empty.notify_one();
                match evicted {
                    Some(old) => Enqueued::Evicted(old),
                    None => Enqueued::Accepted,
                }
            }
            OverflowPolicy::DropNewest => Enqueued::Rejected(sample),
            OverflowPolicy::Block => {
                let (mut items, _) = self
                    .not_full
                    .wait_timeout_while(items, self.block_wait, |q| q.len() >= capacity)
                    .unwrap_or_else(PoisonError::into_inner);
                if items.len() < capacity {
                    items.push_back(sample);
                    self.not_empty.notify_one();
                    Enqueued::Accepted
                } else {
                    Enqueued::Full(sample)
                }
            }
        }
    }

    /// Remove the oldest sample, waiting up to `timeout` for one to arrive.
    pub fn dequeue_blocking(&self, timeout: Duration) -> Option<AudioSample> {
        let items = self.lock();
        let (mut items, _) = self
            .not_empty
            .wait_timeout_while(items, timeout, |q| q.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        let sample = items.pop_front();
        if sample.is_some() {
            self.not_full.notify_one();
        }
        sample
    }

    /// Snapshot length; may be stale as soon as it returns.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Snapshot emptiness; may be stale as soon as it returns.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every queued sample and return how many there were.
    pub fn discard_remaining(&self) -> usize {
        let mut items = self.lock();
        let n = items.len();
        items.clear();
        self.not_full.notify_all();
        n
    }
}

impl Default for SampleQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Instant, SystemTime};

    use super::*;

    fn sample(tag: f32) -> AudioSample {
        AudioSample::new(SystemTime::now(), vec![tag], 48_000)
    }

    fn tag(sample: &AudioSample) -> f32 {
        sample.samples()[0]
    }

    const SHORT: Duration = Duration::from_millis(10);

    #[test]
    fn preserves_insertion_order() {
        let queue = SampleQueue::unbounded();
        for i in 0..5 {
            assert!(queue.enqueue(sample(i as f32)).is_queued());
        }
        let order: Vec<f32> = std::iter::from_fn(|| queue.dequeue_blocking(SHORT))
            .map(|s| tag(&s))
            .collect();
        assert_eq!(order, [0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn dequeue_times_out_when_empty() {
        let queue = SampleQueue::unbounded();
        let start = Instant::now();
        assert!(queue.dequeue_blocking(Duration::from_millis(30)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn dequeue_wakes_on_enqueue_from_other_thread() {
        let queue = Arc::new(SampleQueue::unbounded());
        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                let _ = queue.enqueue(sample(7.0));
            })
        };
        let got = queue.dequeue_blocking(Duration::from_secs(5));
        producer.join().unwrap();
        assert_eq!(got.map(|s| tag(&s)), Some(7.0));
    }

    #[test]
    fn unbounded_never_refuses() {
        let queue = SampleQueue::unbounded();
        for i in 0..1_000 {
            assert!(matches!(queue.enqueue(sample(i as f32)), Enqueued::Accepted));
        }
        assert_eq!(queue.len(), 1_000);
    }

    #[test]
    fn drop_oldest_evicts_front() {
        let queue = SampleQueue::bounded(2, OverflowPolicy::DropOldest);
        let _ = queue.enqueue(sample(1.0));
        let _ = queue.enqueue(sample(2.0));
        match queue.enqueue(sample(3.0)) {
            Enqueued::Evicted(old) => assert_eq!(tag(&old), 1.0),
            other => panic!("expected eviction, got {other:?}"),
        }
        assert_eq!(queue.dequeue_blocking(SHORT).map(|s| tag(&s)), Some(2.0));
        assert_eq!(queue.dequeue_blocking(SHORT).map(|s| tag(&s)), Some(3.0));
    }

    #[test]
    fn drop_newest_rejects_incoming() {
        let queue = SampleQueue::bounded(1, OverflowPolicy::DropNewest);
        let _ = queue.enqueue(sample(1.0));
        match queue.enqueue(sample(2.0)) {
            Enqueued::Rejected(s) => assert_eq!(tag(&s), 2.0),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.dequeue_blocking(SHORT).map(|s| tag(&s)), Some(1.0));
    }

    #[test]
    fn block_hands_sample_back_after_bounded_wait() {
        let queue = SampleQueue::bounded(1, OverflowPolicy::Block).with_block_wait(SHORT);
        let _ = queue.enqueue(sample(1.0));
        match queue.enqueue(sample(2.0)) {
            Enqueued::Full(s) => assert_eq!(tag(&s), 2.0),
            other => panic!("expected full, got {other:?}"),
        }
    }

    #[test]
    fn block_succeeds_once_consumer_makes_room() {
        let queue = Arc::new(
            SampleQueue::bounded(1, OverflowPolicy::Block).with_block_wait(Duration::from_secs(5)),
        );
        let _ = queue.enqueue(sample(1.0));

        let consumer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                queue.dequeue_blocking(SHORT).map(|s| tag(&s))
            })
        };

        assert!(matches!(queue.enqueue(sample(2.0)), Enqueued::Accepted));
        assert_eq!(consumer.join().unwrap(), Some(1.0));
        assert_eq!(queue.dequeue_blocking(SHORT).map(|s| tag(&s)), Some(2.0));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let queue = SampleQueue::bounded(0, OverflowPolicy::DropNewest);
        assert_eq!(queue.capacity(), Some(1));
        assert!(queue.enqueue(sample(1.0)).is_queued());
    }

    #[test]
    fn from_config_respects_capacity() {
        let queue = SampleQueue::from_config(&QueueConfig::default());
        assert_eq!(queue.capacity(), None);

        let queue = SampleQueue::from_config(&QueueConfig {
            capacity: Some(3),
            overflow: OverflowPolicy::Block,
        });
        assert_eq!(queue.capacity(), Some(3));
        assert_eq!(queue.policy(), OverflowPolicy::Block);
    }

    #[test]
    fn discard_remaining_counts_and_clears() {
        let queue = SampleQueue::unbounded();
        for i in 0..3 {
            let _ = queue.enqueue(sample(i as f32));
        }
        assert_eq!(queue.discard_remaining(), 3);
        assert!(queue.is_empty());
    }
}
