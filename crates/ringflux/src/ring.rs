use crate::backoff::Backoff;
use crate::config::Config;
use crate::invariants::{debug_assert_bounded_count, debug_assert_monotonic, debug_assert_no_wrap};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::packed_state::PackedState;
use crate::traits::Queue;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};

/// Cache-line padding to keep the hot, highly-contended state word off the
/// same line as cold, rarely-written configuration fields.
#[repr(align(128))]
struct CacheAligned<T>(T);

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

/// A bounded, lock-free, multi-producer multi-consumer ring buffer.
///
/// The entire head/tail/full state lives in one `u64`, CAS'd on every
/// enqueue and dequeue (see [`crate::packed_state`]). Each slot is an
/// individually boxed value behind an `AtomicPtr`; a null pointer marks an
/// empty slot. A slot transitions null -> boxed only by the thread that won
/// the state CAS claiming that tail position, and boxed -> null only by the
/// thread that won the state CAS claiming that head position, so there is
/// never more than one writer per slot per lap around the buffer.
///
/// In `override_on_full` mode, `enqueue` on a full buffer first performs a
/// dequeue to make room. That dequeue-then-enqueue pair is not atomic: under
/// heavy concurrent override traffic, two producers can each drop one
/// element and only one of them succeeds in re-inserting, which can net
/// *shrink* the buffer below capacity. This mirrors the non-override-mode
/// contract (no element is ever silently duplicated) at the cost of that
/// one surprising edge case, which is judged acceptable for a best-effort
/// event bus; a single-CAS slot-reuse variant would avoid it at the cost of
/// more complex state transitions.
pub struct RingBuffer<T> {
    state: CacheAligned<AtomicU64>,
    slots: Box<[AtomicPtr<T>]>,
    capacity: u64,
    override_on_full: bool,
    metrics: Metrics,
}

unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    pub fn new(config: Config) -> Self {
        let mut slots = Vec::with_capacity(config.capacity);
        slots.resize_with(config.capacity, || AtomicPtr::new(ptr::null_mut()));
        Self {
            state: CacheAligned(AtomicU64::new(PackedState::EMPTY.pack())),
            slots: slots.into_boxed_slice(),
            capacity: config.capacity as u64,
            override_on_full: config.override_on_full,
            metrics: Metrics::default(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    #[inline]
    fn load_state(&self) -> PackedState {
        PackedState::unpack(self.state.load(Ordering::Acquire))
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Pushes `v`. Returns `false` iff the buffer is full and not in
    /// override mode.
    pub fn enqueue(&self, v: T) -> bool {
        let mut backoff = Backoff::new();
        loop {
            let raw = self.state.load(Ordering::Acquire);
            let ps = PackedState::unpack(raw);

            if ps.full {
                if !self.override_on_full {
                    self.metrics.record_rejected();
                    return false;
                }
                // Make room, then retry the whole enqueue from a fresh snapshot.
                if self.dequeue().is_some() {
                    self.metrics.record_overridden();
                }
                backoff.spin();
                continue;
            }

            debug_assert_bounded_count!(ps.len(self.capacity), self.capacity);
            let slot_idx = (ps.tail % self.capacity) as usize;
            let next = ps.after_enqueue(self.capacity);
            debug_assert_monotonic!("tail", ps.tail, next.tail);
            debug_assert_no_wrap!("tail", ps.tail, next.tail);

            match self.state.compare_exchange_weak(
                raw,
                next.pack(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    // We alone own `slot_idx` until a consumer claims it back.
                    let boxed = Box::into_raw(Box::new(v));
                    let old = self.slots[slot_idx].swap(boxed, Ordering::Release);
                    debug_assert!(old.is_null(), "claimed slot was not empty");
                    self.metrics.record_enqueued();
                    return true;
                }
                Err(_) => {
                    self.metrics.record_cas_retry();
                    backoff.snooze();
                }
            }
        }
    }

    /// Pops the oldest value. Returns `None` iff the buffer is empty.
    pub fn dequeue(&self) -> Option<T> {
        let mut backoff = Backoff::new();
        loop {
            let raw = self.state.load(Ordering::Acquire);
            let ps = PackedState::unpack(raw);

            if ps.is_empty() {
                return None;
            }

            let slot_idx = (ps.head % self.capacity) as usize;
            let next = ps.after_dequeue();
            debug_assert_monotonic!("head", ps.head, next.head);
            debug_assert_no_wrap!("head", ps.head, next.head);

            match self.state.compare_exchange_weak(
                raw,
                next.pack(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    // The producer that incremented tail past this slot may not
                    // have finished publishing its value yet; that window is a
                    // few instructions wide, so a short spin (not a full retry
                    // of the state CAS) is the correct wait here.
                    let mut publish_wait = Backoff::new();
                    loop {
                        let ptr = self.slots[slot_idx].swap(ptr::null_mut(), Ordering::Acquire);
                        if !ptr.is_null() {
                            self.metrics.record_dequeued();
                            // SAFETY: `ptr` was produced by `Box::into_raw` in `enqueue`
                            // and this is the only thread that claimed this slot.
                            return Some(unsafe { *Box::from_raw(ptr) });
                        }
                        publish_wait.spin();
                    }
                }
                Err(_) => {
                    self.metrics.record_cas_retry();
                    backoff.snooze();
                }
            }
        }
    }

    pub fn size(&self) -> usize {
        self.load_state().len(self.capacity) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.load_state().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.load_state().full
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        for slot in self.slots.iter() {
            let ptr = slot.load(Ordering::Relaxed);
            if !ptr.is_null() {
                // SAFETY: every non-null slot pointer was produced by
                // `Box::into_raw` and is owned by this buffer alone.
                drop(unsafe { Box::from_raw(ptr) });
            }
        }
    }
}

impl<T: Send + Sync> Queue<T> for RingBuffer<T> {
    fn enqueue(&self, v: T) -> bool {
        RingBuffer::enqueue(self, v)
    }

    fn dequeue(&self) -> Option<T> {
        RingBuffer::dequeue(self)
    }

    fn size(&self) -> usize {
        RingBuffer::size(self)
    }

    fn is_full(&self) -> bool {
        RingBuffer::is_full(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn scenario_s1_capacity_four_non_override() {
        let ring = RingBuffer::<u32>::new(Config::new(4, false));
        assert!(ring.enqueue(1));
        assert!(ring.enqueue(2));
        assert!(ring.enqueue(3));
        assert!(ring.enqueue(4));
        assert!(!ring.enqueue(5));

        assert_eq!(ring.dequeue(), Some(1));
        assert_eq!(ring.dequeue(), Some(2));
        assert_eq!(ring.dequeue(), Some(3));
        assert_eq!(ring.dequeue(), Some(4));
        assert_eq!(ring.dequeue(), None);

        assert!(ring.enqueue(9));
        assert_eq!(ring.dequeue(), Some(9));
    }

    #[test]
    fn scenario_s2_capacity_four_override() {
        let ring = RingBuffer::<u32>::new(Config::new(4, true));
        for v in 1..=6 {
            assert!(ring.enqueue(v));
        }
        assert_eq!(ring.dequeue(), Some(3));
        assert_eq!(ring.dequeue(), Some(4));
        assert_eq!(ring.dequeue(), Some(5));
        assert_eq!(ring.dequeue(), Some(6));
    }

    #[test]
    fn empty_and_full_agree_with_size() {
        let ring = RingBuffer::<u32>::new(Config::new(2, false));
        assert!(ring.is_empty());
        assert!(!ring.is_full());
        assert!(ring.enqueue(1));
        assert!(ring.enqueue(2));
        assert!(ring.is_full());
        assert_eq!(ring.size(), 2);
    }

    #[test]
    fn drop_releases_remaining_boxed_values() {
        struct Tracked(Arc<std::sync::atomic::AtomicUsize>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }
        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        {
            let ring = RingBuffer::<Tracked>::new(Config::new(4, false));
            ring.enqueue(Tracked(counter.clone()));
            ring.enqueue(Tracked(counter.clone()));
        }
        assert_eq!(counter.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn multi_producer_multi_consumer_preserves_multiset() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: u64 = 5_000;
        let ring = Arc::new(RingBuffer::<u64>::new(Config::new(128, false)));

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let ring = ring.clone();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let v = (p as u64) * PER_PRODUCER + i;
                        while !ring.enqueue(v) {
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        let ring2 = ring.clone();
        let total_expected = PRODUCERS as u64 * PER_PRODUCER;
        let consumer = thread::spawn(move || {
            let mut sum = 0u64;
            let mut count = 0u64;
            while count < total_expected {
                if let Some(v) = ring2.dequeue() {
                    sum += v;
                    count += 1;
                } else {
                    thread::yield_now();
                }
            }
            (count, sum)
        });

        for p in producers {
            p.join().unwrap();
        }
        let (count, sum) = consumer.join().unwrap();

        assert_eq!(count, total_expected);
        let expected_sum: u64 = (0..total_expected).sum();
        assert_eq!(sum, expected_sum);
    }
}
