use crate::traits::Stack;
use crossbeam_epoch::{self as epoch, Atomic, Owned};
use std::sync::atomic::{AtomicUsize, Ordering};

struct Node<T> {
    value: T,
    next: Atomic<Node<T>>,
}

/// A bounded, lock-free Treiber stack. A single atomic head pointer is
/// CAS'd on both push and pop; bounded by an atomic size counter in the
/// same approximate-not-hard-cap spirit as [`crate::MsQueue`].
pub struct TreiberStack<T> {
    head: Atomic<Node<T>>,
    capacity: usize,
    len: AtomicUsize,
}

unsafe impl<T: Send> Send for TreiberStack<T> {}
unsafe impl<T: Send> Sync for TreiberStack<T> {}

impl<T> TreiberStack<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            head: Atomic::null(),
            capacity,
            len: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, value: T) -> bool {
        if self.len.fetch_add(1, Ordering::AcqRel) >= self.capacity {
            self.len.fetch_sub(1, Ordering::AcqRel);
            return false;
        }

        let guard = &epoch::pin();
        let mut new_node = Owned::new(Node {
            value,
            next: Atomic::null(),
        });

        loop {
            let head = self.head.load(Ordering::Acquire, guard);
            new_node.next.store(head, Ordering::Relaxed);
            match self
                .head
                .compare_exchange(head, new_node, Ordering::AcqRel, Ordering::Acquire, guard)
            {
                Ok(_) => return true,
                Err(e) => new_node = e.new,
            }
        }
    }

    pub fn pop(&self) -> Option<T> {
        let guard = &epoch::pin();
        loop {
            let head = self.head.load(Ordering::Acquire, guard);
            if head.is_null() {
                return None;
            }
            // SAFETY: non-null, and still reachable under this epoch guard.
            let head_ref = unsafe { head.deref() };
            let next = head_ref.next.load(Ordering::Acquire, guard);

            if self
                .head
                .compare_exchange(head, next, Ordering::AcqRel, Ordering::Acquire, guard)
                .is_ok()
            {
                self.len.fetch_sub(1, Ordering::AcqRel);
                // SAFETY: unlinked by the CAS above; no other thread can
                // reach it again, safe to retire and read its value out.
                unsafe {
                    let owned = head.into_owned();
                    return Some(owned.into_box().value);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire).min(self.capacity)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len.load(Ordering::Acquire) >= self.capacity
    }
}

impl<T> Drop for TreiberStack<T> {
    fn drop(&mut self) {
        let guard = &epoch::pin();
        let mut current = self.head.load(Ordering::Relaxed, guard);
        while !current.is_null() {
            // SAFETY: being dropped, no concurrent access possible.
            let node = unsafe { current.into_owned() };
            let next = node.next.load(Ordering::Relaxed, guard);
            drop(node);
            current = next;
        }
    }
}

impl<T: Send + Sync> Stack<T> for TreiberStack<T> {
    fn push(&self, v: T) -> bool {
        TreiberStack::push(self, v)
    }

    fn pop(&self) -> Option<T> {
        TreiberStack::pop(self)
    }

    fn size(&self) -> usize {
        TreiberStack::len(self)
    }

    fn is_full(&self) -> bool {
        TreiberStack::is_full(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[test]
    fn lifo_single_thread() {
        let s = TreiberStack::<u32>::new(16);
        assert!(s.push(1));
        assert!(s.push(2));
        assert!(s.push(3));
        assert_eq!(s.pop(), Some(3));
        assert_eq!(s.pop(), Some(2));
        assert_eq!(s.pop(), Some(1));
        assert_eq!(s.pop(), None);
    }

    #[test]
    fn refuses_past_capacity() {
        let s = TreiberStack::<u32>::new(2);
        assert!(s.push(1));
        assert!(s.push(2));
        assert!(!s.push(3));
    }

    #[test]
    fn concurrent_push_pop_preserves_multiset() {
        const PUSHERS: usize = 4;
        const POPPERS: usize = 2;
        const PER_PUSHER: u64 = 2_000;
        let total = PUSHERS as u64 * PER_PUSHER;
        // Capacity stays well below `total`: poppers run concurrently with
        // the pushers (unlike the single-threaded push-then-drain pattern
        // above), so a small bounded stack exercises push-refused/retry
        // without any pusher spinning forever waiting for a drain that
        // only happens after it joins.
        let stack = Arc::new(TreiberStack::<u64>::new(256));

        let pushers: Vec<_> = (0..PUSHERS)
            .map(|p| {
                let stack = stack.clone();
                thread::spawn(move || {
                    for i in 0..PER_PUSHER {
                        let v = p as u64 * PER_PUSHER + i;
                        while !stack.push(v) {
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        let drained = Arc::new(Mutex::new(Vec::new()));
        let poppers: Vec<_> = (0..POPPERS)
            .map(|_| {
                let stack = stack.clone();
                let drained = drained.clone();
                thread::spawn(move || loop {
                    match stack.pop() {
                        Some(v) => drained.lock().unwrap().push(v),
                        None => {
                            if drained.lock().unwrap().len() as u64 >= total {
                                break;
                            }
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        for p in pushers {
            p.join().unwrap();
        }
        for p in poppers {
            p.join().unwrap();
        }

        let mut seen = drained.lock().unwrap().clone();
        seen.sort_unstable();
        let expected: Vec<u64> = (0..total).collect();
        assert_eq!(seen, expected);
    }
}
