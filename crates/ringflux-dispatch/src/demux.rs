use crate::cancellation::CancellationToken;
use crate::config::{default_control_queue, default_event_queue};
use crate::error::DispatchError;
use ringflux::Queue;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;

/// A pure predicate deciding whether an event is routed to a given service.
pub type Selector<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// One registered handler, invoked with a (possibly per-service cloned)
/// reference to the event.
pub type HandlerFn<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// An optional deep-copy function supplied at construction; see
/// [`Demultiplexer::with_clone_fn`].
pub type CloneFn<E> = Arc<dyn Fn(&E) -> E + Send + Sync>;

struct Service<E> {
    id: Arc<str>,
    selector: Selector<E>,
    handlers: Arc<Vec<HandlerFn<E>>>,
    worker_budget: i64,
    available_workers: Arc<AtomicI64>,
}

// Every field is `Arc`-backed, so cloning a `Service` is always cheap and
// never requires `E: Clone` (the derive macro would wrongly add that
// bound, since it cannot see through `Arc<dyn Fn(&E) + ...>`).
impl<E> Clone for Service<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            selector: self.selector.clone(),
            handlers: self.handlers.clone(),
            worker_budget: self.worker_budget,
            available_workers: self.available_workers.clone(),
        }
    }
}

/// A register/unregister command, consumed only by the dispatch loop.
/// Public only so a caller supplying a custom control queue via
/// [`Demultiplexer::with_control_queue`] can name `Queue<ControlEvent<E>>`;
/// there is no way to construct one outside this crate.
pub struct ControlEvent<E>(ControlEventKind<E>);

enum ControlEventKind<E> {
    Register(Service<E>),
    Unregister(Arc<str>),
}

/// Single-owner event dispatcher: a dedicated thread drains a control queue
/// (service register/unregister commands) with strict priority over an
/// event queue, routing each event to the services whose selector matches
/// it and honoring each service's worker budget.
///
/// The service list is owned exclusively by the thread running
/// [`start`](Demultiplexer::start) and mutated only by that thread's own
/// consumption of the control queue, so no lock is needed around it;
/// producers contend only on the two lock-free queues underneath.
pub struct Demultiplexer<E> {
    event_queue: Box<dyn Queue<E>>,
    control_queue: Box<dyn Queue<ControlEvent<E>>>,
    clone_fn: Option<CloneFn<E>>,
    closed: CancellationToken,
}

impl<E: Send + Sync + 'static> Demultiplexer<E> {
    /// A demultiplexer with the default queues: an override-mode ring
    /// buffer of capacity 1024 for events, a non-override ring buffer of
    /// capacity 32 for control commands.
    pub fn new() -> Self {
        Self {
            event_queue: default_event_queue(),
            control_queue: default_control_queue(),
            clone_fn: None,
            closed: CancellationToken::new(),
        }
    }

    /// Supplies a custom event queue, replacing the default ring buffer.
    #[must_use]
    pub fn with_event_queue(mut self, queue: Box<dyn Queue<E>>) -> Self {
        self.event_queue = queue;
        self
    }

    /// Supplies a custom control queue, replacing the default ring buffer.
    #[must_use]
    pub fn with_control_queue(mut self, queue: Box<dyn Queue<ControlEvent<E>>>) -> Self {
        self.control_queue = queue;
        self
    }

    /// Supplies a deep-copy function. When set, each matched service
    /// receives its own clone of the event so concurrent handlers cannot
    /// observe each other's mutations; when absent, every service shares
    /// the same reference and handlers must treat it as immutable.
    #[must_use]
    pub fn with_clone_fn(mut self, f: impl Fn(&E) -> E + Send + Sync + 'static) -> Self {
        self.clone_fn = Some(Arc::new(f));
        self
    }

    /// Submits an event. Returns `false` if the event queue is at capacity
    /// (non-override backends only) or if [`close`](Self::close) has
    /// already been called; in the latter case the event is silently
    /// dropped rather than blocking the caller.
    pub fn enqueue(&self, event: E) -> bool {
        if self.closed.is_cancelled() {
            return false;
        }
        self.event_queue.enqueue(event)
    }

    /// Registers a service. First registration for a given `id` wins: a
    /// second `register` with the same `id` is ignored (callers that need
    /// replace semantics must `unregister` first). `handlers` must be
    /// non-empty or the registration is rejected outright.
    pub fn register(
        &self,
        id: impl Into<String>,
        selector: impl Fn(&E) -> bool + Send + Sync + 'static,
        worker_budget: i64,
        handlers: Vec<HandlerFn<E>>,
    ) -> Result<(), DispatchError> {
        let id = id.into();
        if handlers.is_empty() {
            tracing::warn!(%id, "register called with no handlers, ignored");
            return Ok(());
        }
        let service = Service {
            id: Arc::from(id.as_str()),
            selector: Arc::new(selector),
            handlers: Arc::new(handlers),
            worker_budget,
            available_workers: Arc::new(AtomicI64::new(worker_budget.max(0))),
        };
        if self
            .control_queue
            .enqueue(ControlEvent(ControlEventKind::Register(service)))
        {
            Ok(())
        } else {
            tracing::warn!(%id, "control queue full, registration dropped");
            Err(DispatchError::ControlQueueFull)
        }
    }

    /// Unregisters a service by id. A no-op (but still successful) if no
    /// service with that id is currently registered.
    pub fn unregister(&self, id: impl Into<String>) -> Result<(), DispatchError> {
        let id: Arc<str> = Arc::from(id.into().as_str());
        if self.control_queue.enqueue(ControlEvent(ControlEventKind::Unregister(id.clone()))) {
            Ok(())
        } else {
            tracing::warn!(%id, "control queue full, unregister dropped");
            Err(DispatchError::ControlQueueFull)
        }
    }

    /// Requests cancellation of the dispatch loop. Idempotent: a second
    /// call is a no-op. After `close`, `enqueue` returns `false` instead of
    /// enqueuing.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Runs the dispatch loop until `token` or an internal `close()` call
    /// is cancelled. Drains the control queue with strict priority over the
    /// event queue so registrations/unregistrations always take effect
    /// before the next event is dispatched. Intended to run on its own
    /// dedicated thread.
    pub fn start(&self, token: &CancellationToken) {
        let mut services: Vec<Service<E>> = Vec::new();
        tracing::debug!("dispatch loop starting");
        while !token.is_cancelled() && !self.closed.is_cancelled() {
            if let Some(ce) = self.control_queue.dequeue() {
                apply_control(&mut services, ce);
                continue;
            }
            if let Some(event) = self.event_queue.dequeue() {
                let matched: Vec<Service<E>> = services
                    .iter()
                    .filter(|s| (s.selector)(&event))
                    .cloned()
                    .collect();
                if !matched.is_empty() {
                    let event = Arc::new(event);
                    let clone_fn = self.clone_fn.clone();
                    thread::spawn(move || dispatch_event(&event, matched, clone_fn.as_ref()));
                }
                continue;
            }
            thread::yield_now();
        }
        tracing::debug!("dispatch loop stopped");
    }
}

impl<E: Send + Sync + 'static> Default for Demultiplexer<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_control<E>(services: &mut Vec<Service<E>>, ce: ControlEvent<E>) {
    match ce.0 {
        ControlEventKind::Register(svc) => {
            if services.iter().any(|s| s.id == svc.id) {
                tracing::debug!(id = %svc.id, "duplicate registration ignored, first wins");
                return;
            }
            tracing::debug!(id = %svc.id, "service registered");
            services.push(svc);
        }
        ControlEventKind::Unregister(id) => {
            let before = services.len();
            services.retain(|s| s.id != id);
            if services.len() != before {
                tracing::debug!(%id, "service unregistered");
            }
        }
    }
}

/// Runs on its own fan-out thread per dispatched event. For each matched
/// service: runs synchronously on this thread if the worker budget is
/// exhausted (or zero), otherwise claims a worker slot and spawns a worker
/// thread that restores the slot on exit.
fn dispatch_event<E: Send + Sync + 'static>(
    event: &Arc<E>,
    services: Vec<Service<E>>,
    clone_fn: Option<&CloneFn<E>>,
) {
    for svc in services {
        if svc.worker_budget > 0 && try_claim_worker(&svc.available_workers) {
            let event = event.clone();
            let clone_fn = clone_fn.cloned();
            let id = svc.id.clone();
            let handlers = svc.handlers.clone();
            let available = svc.available_workers.clone();
            thread::spawn(move || {
                let value = service_value(&event, clone_fn.as_ref());
                invoke_handlers(&handlers, &value, &id);
                available.fetch_add(1, Ordering::AcqRel);
            });
        } else {
            let value = service_value(event, clone_fn);
            invoke_handlers(&svc.handlers, &value, &svc.id);
        }
    }
}

/// Atomically decrements the worker counter iff it is currently positive,
/// claiming one slot. Returns `false` (no state change) if no slot was
/// available.
fn try_claim_worker(available: &AtomicI64) -> bool {
    let mut current = available.load(Ordering::Acquire);
    loop {
        if current <= 0 {
            return false;
        }
        match available.compare_exchange_weak(
            current,
            current - 1,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => return true,
            Err(actual) => current = actual,
        }
    }
}

fn service_value<E>(event: &Arc<E>, clone_fn: Option<&CloneFn<E>>) -> Arc<E> {
    match clone_fn {
        Some(f) => Arc::new(f(event)),
        None => event.clone(),
    }
}

fn invoke_handlers<E>(handlers: &[HandlerFn<E>], value: &E, service_id: &str) {
    for h in handlers.iter() {
        if catch_unwind(AssertUnwindSafe(|| h(value))).is_err() {
            tracing::error!(service = service_id, "handler panicked, dispatch continues");
        }
    }
}
