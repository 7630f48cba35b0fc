use crate::cancellation::CancellationToken;
use crate::config::ReactorTiming;
use crate::demux::{Demultiplexer, HandlerFn};
use crate::error::{DispatchError, ReactorError};
use crate::event::Event;
use crate::id::EventId;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// The response continuation a [`Reactor`] handler calls, synchronously or
/// from any other thread, exactly once, to complete its request.
pub type ResponseFn<T> = Arc<dyn Fn(T, Option<String>) + Send + Sync>;

/// A user-supplied handler: receives the request data and a continuation
/// it must eventually call with `(data, error)`.
pub type ReactorHandler<T> = Arc<dyn Fn(T, ResponseFn<T>) + Send + Sync>;

/// A request/response layer built on two [`Demultiplexer`]s: one carrying
/// the request events, one carrying the correlated callback/response
/// events. A handler registered via [`add_handler`](Reactor::add_handler)
/// completes its request by calling a response continuation, which the
/// Reactor wraps so the resulting event is routed back onto the callbacks
/// stream stamped with the same id and `nonce + 1`; a blocking
/// [`enqueue_and_wait`](Reactor::enqueue_and_wait) correlates its own
/// response by `(id, nonce)` rather than by arrival order.
pub struct Reactor<T> {
    events: Arc<Demultiplexer<Event<T>>>,
    callbacks: Arc<Demultiplexer<Event<T>>>,
    timing: ReactorTiming,
}

impl<T: Clone + Send + Sync + 'static> Reactor<T> {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Demultiplexer::new()),
            callbacks: Arc::new(Demultiplexer::new()),
            timing: ReactorTiming::default(),
        }
    }

    #[must_use]
    pub fn with_timing(mut self, timing: ReactorTiming) -> Self {
        self.timing = timing;
        self
    }

    #[must_use]
    pub fn with_events_demux(mut self, demux: Demultiplexer<Event<T>>) -> Self {
        self.events = Arc::new(demux);
        self
    }

    #[must_use]
    pub fn with_callbacks_demux(mut self, demux: Demultiplexer<Event<T>>) -> Self {
        self.callbacks = Arc::new(demux);
        self
    }

    /// Registers a handler. The handler is free to call its response
    /// continuation synchronously (before returning) or later from any
    /// other thread.
    pub fn add_handler(
        &self,
        id: impl Into<String>,
        selector: impl Fn(&T) -> bool + Send + Sync + 'static,
        workers: i64,
        handler: impl Fn(T, ResponseFn<T>) + Send + Sync + 'static,
    ) -> Result<(), DispatchError> {
        let callbacks = self.callbacks.clone();
        let handler: ReactorHandler<T> = Arc::new(handler);
        let wrapped: HandlerFn<Event<T>> = Arc::new(move |e: &Event<T>| {
            let response_id = e.id;
            let response_nonce = e.next_nonce();
            let callbacks = callbacks.clone();
            let response: ResponseFn<T> = Arc::new(move |data: T, error: Option<String>| {
                let event = match error {
                    Some(err) => Event::with_error(response_id, response_nonce, data, err),
                    None => Event::new(response_id, response_nonce, data),
                };
                callbacks.enqueue(event);
            });
            handler(e.data.clone(), response);
        });
        self.events
            .register(id, move |e: &Event<T>| selector(&e.data), workers, vec![wrapped])
    }

    /// Registers a fire-and-forget observer on the callback stream.
    pub fn add_callback(
        &self,
        id: impl Into<String>,
        selector: impl Fn(&T) -> bool + Send + Sync + 'static,
        workers: i64,
        f: impl Fn(&T) + Send + Sync + 'static,
    ) -> Result<(), DispatchError> {
        let handler: HandlerFn<Event<T>> = Arc::new(move |e: &Event<T>| f(&e.data));
        self.callbacks
            .register(id, move |e: &Event<T>| selector(&e.data), workers, vec![handler])
    }

    /// Submits a single event, fire-and-forget.
    pub fn enqueue(&self, data: T) -> bool {
        self.events.enqueue(Event::new(EventId::generate(), 0, data))
    }

    /// Submits every item in `items`, fire-and-forget, in order.
    pub fn enqueue_all(&self, items: impl IntoIterator<Item = T>) {
        for data in items {
            self.enqueue(data);
        }
    }

    /// Submits one event and blocks until the correlated response arrives
    /// or `token`/the configured timeout elapses. Registers a one-shot
    /// callback service for the duration of the wait and unregisters it on
    /// every exit path, so a late arrival after timeout is discarded by the
    /// callbacks demultiplexer's selector filter rather than delivered. If
    /// the matching handler called its response continuation with an
    /// error, that is surfaced as `Err(ReactorError::HandlerError(_))`
    /// rather than as `Ok` with a populated `Event::error`.
    pub fn enqueue_and_wait(
        &self,
        token: &CancellationToken,
        data: T,
    ) -> Result<Event<T>, ReactorError> {
        let id = EventId::generate();
        const TARGET_NONCE: i64 = 1;
        let slot: Arc<Mutex<Option<Event<T>>>> = Arc::new(Mutex::new(None));
        let arrived = Arc::new(Condvar::new());
        let service_id = format!("reactor-wait-{id}");

        {
            let slot = slot.clone();
            let arrived = arrived.clone();
            let handler: HandlerFn<Event<T>> = Arc::new(move |e: &Event<T>| {
                let mut guard = slot.lock().unwrap();
                if guard.is_none() {
                    *guard = Some(e.clone());
                }
                arrived.notify_all();
            });
            let _ = self.callbacks.register(
                service_id.clone(),
                move |e: &Event<T>| e.id == id && e.nonce == TARGET_NONCE,
                0,
                vec![handler],
            );
        }

        self.events.enqueue(Event::new(id, 0, data));

        let deadline = Instant::now() + self.timing.timeout;
        let outcome = loop {
            if token.is_cancelled() {
                break Err(ReactorError::Cancelled);
            }
            let guard = slot.lock().unwrap();
            if let Some(event) = guard.as_ref() {
                break match &event.error {
                    Some(msg) => Err(ReactorError::HandlerError(msg.clone())),
                    None => Ok(event.clone()),
                };
            }
            let now = Instant::now();
            if now >= deadline {
                break Err(ReactorError::TimedOut);
            }
            let wait_for = self.timing.tick.min(deadline - now);
            let (_guard, _timed_out) = arrived.wait_timeout(guard, wait_for).unwrap();
        };

        let _ = self.callbacks.unregister(service_id);
        outcome
    }

    /// Spawns the events and callbacks dispatch loops on dedicated threads
    /// and blocks until `token` is cancelled or [`close`](Self::close) is
    /// called, then waits for both loops to stop.
    pub fn start(&self, token: CancellationToken) {
        let events = self.events.clone();
        let events_token = token.clone();
        let events_handle = thread::spawn(move || events.start(&events_token));

        let callbacks = self.callbacks.clone();
        let callbacks_token = token.clone();
        let callbacks_handle = thread::spawn(move || callbacks.start(&callbacks_token));

        let _ = events_handle.join();
        let _ = callbacks_handle.join();
    }

    /// Requests cancellation of both dispatch loops. Idempotent.
    pub fn close(&self) {
        self.events.close();
        self.callbacks.close();
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Reactor<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Req {
        name: String,
        count: u32,
    }

    fn start_background(reactor: Arc<Reactor<Req>>) -> (thread::JoinHandle<()>, CancellationToken) {
        let token = CancellationToken::new();
        let loop_token = token.clone();
        let handle = thread::spawn(move || reactor.start(loop_token));
        (handle, token)
    }

    #[test]
    fn scenario_s6_reactor_request_response_and_callback_fanout() {
        let reactor = Arc::new(Reactor::<Req>::new());
        let callback_hits = Arc::new(AtomicUsize::new(0));

        reactor
            .add_handler(
                "errored",
                |r: &Req| r.name == "errored",
                0,
                |data: Req, respond: ResponseFn<Req>| {
                    thread::sleep(Duration::from_millis(5));
                    respond(data, Some("test-error".to_string()));
                },
            )
            .unwrap();

        reactor
            .add_handler(
                "ok",
                |r: &Req| !r.name.is_empty() && r.name != "errored",
                0,
                |mut data: Req, respond: ResponseFn<Req>| {
                    thread::sleep(Duration::from_millis(5));
                    data.count += 1;
                    respond(data, None);
                },
            )
            .unwrap();

        {
            let hits = callback_hits.clone();
            reactor
                .add_callback(
                    "counter",
                    |r: &Req| !r.name.is_empty(),
                    0,
                    move |_: &Req| {
                        hits.fetch_add(1, Ordering::SeqCst);
                    },
                )
                .unwrap();
        }

        let (handle, token) = start_background(reactor.clone());
        thread::sleep(Duration::from_millis(30));

        reactor.enqueue_all([
            Req {
                name: "alpha".into(),
                count: 0,
            },
            Req {
                name: "beta".into(),
                count: 0,
            },
            Req {
                name: "gamma".into(),
                count: 0,
            },
        ]);

        let wait_token = CancellationToken::new();
        let response = reactor
            .enqueue_and_wait(
                &wait_token,
                Req {
                    name: "delta".into(),
                    count: 0,
                },
            )
            .expect("response expected");
        assert!(response.data.count > 0);
        assert!(response.error.is_none());

        let deadline = Instant::now() + Duration::from_secs(1);
        while callback_hits.load(Ordering::SeqCst) < 4 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(callback_hits.load(Ordering::SeqCst), 4);

        token.cancel();
        handle.join().unwrap();
    }

    #[test]
    fn enqueue_and_wait_surfaces_handler_error() {
        let reactor = Arc::new(Reactor::<Req>::new());
        reactor
            .add_handler(
                "errored",
                |r: &Req| r.name == "errored",
                0,
                |data: Req, respond: ResponseFn<Req>| {
                    respond(data, Some("test-error".to_string()));
                },
            )
            .unwrap();

        let (handle, token) = start_background(reactor.clone());
        thread::sleep(Duration::from_millis(20));

        let wait_token = CancellationToken::new();
        let result = reactor.enqueue_and_wait(
            &wait_token,
            Req {
                name: "errored".into(),
                count: 0,
            },
        );
        assert_eq!(result, Err(ReactorError::HandlerError("test-error".to_string())));

        token.cancel();
        handle.join().unwrap();
    }

    #[test]
    fn enqueue_and_wait_times_out_when_handler_never_responds() {
        let reactor = Reactor::<Req>::new().with_timing(ReactorTiming {
            tick: Duration::from_millis(20),
            timeout: Duration::from_millis(100),
        });
        let reactor = Arc::new(reactor);

        reactor
            .add_handler("silent", |_: &Req| true, 0, |_data: Req, _respond: ResponseFn<Req>| {
                // never calls respond
            })
            .unwrap();

        let (handle, token) = start_background(reactor.clone());
        thread::sleep(Duration::from_millis(20));

        let wait_token = CancellationToken::new();
        let start = Instant::now();
        let result = reactor.enqueue_and_wait(
            &wait_token,
            Req {
                name: "ghost".into(),
                count: 0,
            },
        );
        assert_eq!(result, Err(ReactorError::TimedOut));
        assert!(start.elapsed() < Duration::from_secs(1));

        token.cancel();
        handle.join().unwrap();
    }

    #[test]
    fn enqueue_and_wait_wakes_on_cancellation() {
        let reactor = Arc::new(Reactor::<Req>::new().with_timing(ReactorTiming {
            tick: Duration::from_millis(20),
            timeout: Duration::from_secs(30),
        }));
        let (handle, token) = start_background(reactor.clone());
        thread::sleep(Duration::from_millis(20));

        let wait_token = CancellationToken::new();
        let waiter_token = wait_token.clone();
        let waiter = thread::spawn(move || {
            let reactor = reactor.clone();
            reactor.enqueue_and_wait(
                &waiter_token,
                Req {
                    name: "never-answered".into(),
                    count: 0,
                },
            )
        });

        thread::sleep(Duration::from_millis(50));
        wait_token.cancel();
        let result = waiter.join().unwrap();
        assert_eq!(result, Err(ReactorError::Cancelled));

        token.cancel();
        handle.join().unwrap();
    }
}
