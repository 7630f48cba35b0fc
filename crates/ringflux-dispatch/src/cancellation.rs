use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// A cheaply cloneable cooperative cancellation signal.
///
/// Mirrors the role `context.Context` plays in the teacher's dispatch loop
/// and `enqueue_and_wait`: [`Demultiplexer::start`](crate::Demultiplexer::start)
/// exits its loop once [`is_cancelled`](CancellationToken::is_cancelled)
/// observes `true`, and a waiter blocked in `enqueue_and_wait` wakes within
/// one tick of [`cancel`](CancellationToken::cancel) being called.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

struct Inner {
    cancelled: AtomicBool,
    // Paired with `cancelled` so a waiter parked on `wait_timeout` wakes
    // immediately on cancellation instead of sleeping out its tick.
    wake: Mutex<()>,
    wake_cv: Condvar,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                wake: Mutex::new(()),
                wake_cv: Condvar::new(),
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Idempotent: cancelling an already-cancelled token is a no-op.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        let _guard = self.inner.wake.lock().unwrap();
        self.inner.wake_cv.notify_all();
    }

    /// Blocks for up to `tick`, waking early if cancelled. Used by
    /// [`Reactor::enqueue_and_wait`](crate::Reactor::enqueue_and_wait)'s
    /// poll loop; exposed for callers building their own wait loops around
    /// this token.
    pub fn wait_tick(&self, tick: std::time::Duration) {
        if self.is_cancelled() {
            return;
        }
        let guard = self.inner.wake.lock().unwrap();
        let _ = self.inner.wake_cv.wait_timeout(guard, tick);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn cancel_is_idempotent() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn wait_tick_wakes_early_on_cancel() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let start = Instant::now();
        let handle = thread::spawn(move || {
            waiter.wait_tick(Duration::from_secs(5));
        });
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        handle.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
