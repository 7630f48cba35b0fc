//! Ringflux - lock-free bounded containers
//!
//! Three interchangeable bounded container backends, each a non-blocking,
//! lock-free multi-producer/multi-consumer data structure:
//!
//! - [`RingBuffer`]: fixed-capacity slot array, entire head/tail/full state
//!   packed into one `u64` and mutated by CAS. Optional overwrite-on-full.
//! - [`MsQueue`]: a classical Michael-Scott linked-list queue, linearizable
//!   FIFO, reclaimed via `crossbeam-epoch`.
//! - [`TreiberStack`]: a classical Treiber linked-list stack (LIFO),
//!   likewise epoch-reclaimed.
//!
//! All three, plus [`StackQueueAdapter`] (a `TreiberStack` exposed under the
//! [`Queue`] capability), implement the small [`Queue`]/[`Stack`] trait
//! pair so callers can be generic over the backend.
//!
//! # Example
//!
//! ```
//! use ringflux::{Config, RingBuffer};
//!
//! let ring = RingBuffer::<u64>::new(Config::new(4, false));
//! assert!(ring.enqueue(1));
//! assert!(ring.enqueue(2));
//! assert_eq!(ring.dequeue(), Some(1));
//! ```

mod adapter;
mod backoff;
mod config;
mod invariants;
mod metrics;
mod packed_state;
mod queue;
mod ring;
mod stack;
mod traits;

pub use adapter::StackQueueAdapter;
pub use backoff::Backoff;
pub use config::{Config, CONTROL_QUEUE_CONFIG, EVENT_QUEUE_CONFIG};
pub use metrics::MetricsSnapshot;
pub use queue::MsQueue;
pub use ring::RingBuffer;
pub use stack::TreiberStack;
pub use traits::{Queue, Stack};
