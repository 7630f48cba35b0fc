//! Ringflux-dispatch - lock-free event dispatch on top of `ringflux`
//!
//! Two coupled layers built on the bounded containers in [`ringflux`]:
//!
//! - [`Demultiplexer`]: a single dispatch thread draining a lock-free
//!   control queue (service register/unregister commands, drained with
//!   strict priority) and a lock-free event queue, routing each event to
//!   every registered service whose selector matches it, optionally
//!   fanning out onto worker threads under a per-service budget.
//! - [`Reactor`]: a request/response layer composing two
//!   [`Demultiplexer`]s (events and callbacks). Handlers complete
//!   asynchronously by calling a response continuation; the Reactor
//!   stamps the resulting event with the original id and `nonce + 1` and
//!   routes it back onto the callbacks stream, where a blocking
//!   [`Reactor::enqueue_and_wait`] correlates its own response by
//!   `(id, nonce)`.
//!
//! # Example
//!
//! ```
//! use ringflux_dispatch::{CancellationToken, Demultiplexer, HandlerFn};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::thread;
//! use std::time::Duration;
//!
//! let demux = Arc::new(Demultiplexer::<&'static str>::new());
//! let hits = Arc::new(AtomicUsize::new(0));
//! let counted = hits.clone();
//! let handler: HandlerFn<&'static str> = Arc::new(move |_| {
//!     counted.fetch_add(1, Ordering::SeqCst);
//! });
//! demux.register("greeter", |v: &&str| *v == "hello", 0, vec![handler]).unwrap();
//!
//! let token = CancellationToken::new();
//! let loop_token = token.clone();
//! let loop_demux = demux.clone();
//! let handle = thread::spawn(move || loop_demux.start(&loop_token));
//!
//! thread::sleep(Duration::from_millis(30));
//! demux.enqueue("hello");
//! thread::sleep(Duration::from_millis(50));
//!
//! token.cancel();
//! handle.join().unwrap();
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

mod cancellation;
mod config;
mod demux;
mod error;
mod event;
mod id;
mod reactor;

pub use cancellation::CancellationToken;
pub use config::ReactorTiming;
pub use demux::{CloneFn, ControlEvent, Demultiplexer, HandlerFn, Selector};
pub use error::{DispatchError, ReactorError};
pub use event::Event;
pub use id::EventId;
pub use reactor::{Reactor, ReactorHandler, ResponseFn};
