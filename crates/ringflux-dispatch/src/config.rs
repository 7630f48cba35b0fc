use ringflux::{Config as RingConfig, Queue, RingBuffer};
use std::time::Duration;

/// Default event-queue capacity: a ring buffer in override mode, matching
/// the teacher's `EVENT_QUEUE_CONFIG` so slow consumers never stall
/// producers.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1024;

/// Default control-queue capacity: a small, non-overriding ring buffer,
/// matching the teacher's `CONTROL_QUEUE_CONFIG`. Register/unregister
/// commands must never be silently dropped.
pub const DEFAULT_CONTROL_QUEUE_CAPACITY: usize = 32;

pub(crate) fn default_event_queue<T: Send + Sync + 'static>() -> Box<dyn Queue<T>> {
    Box::new(RingBuffer::new(RingConfig::new(
        DEFAULT_EVENT_QUEUE_CAPACITY,
        true,
    )))
}

pub(crate) fn default_control_queue<T: Send + Sync + 'static>() -> Box<dyn Queue<T>> {
    Box::new(RingBuffer::new(RingConfig::new(
        DEFAULT_CONTROL_QUEUE_CAPACITY,
        false,
    )))
}

/// Tick/timeout configuration for [`crate::Reactor::enqueue_and_wait`].
#[derive(Debug, Clone, Copy)]
pub struct ReactorTiming {
    /// How often the wait loop re-checks the result cell and the
    /// cancellation token.
    pub tick: Duration,
    /// Overall deadline for a single `enqueue_and_wait` call.
    pub timeout: Duration,
}

impl Default for ReactorTiming {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(500),
            timeout: Duration::from_secs(10),
        }
    }
}
