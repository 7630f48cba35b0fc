use crate::traits::Queue;
use crossbeam_epoch::{self as epoch, Atomic, Owned, Shared};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Node<T> {
    /// `None` once this node has become the sentinel (either at
    /// construction, or after its value has been taken out by the thread
    /// that made it the new head). Interior mutability: only the single
    /// thread that wins the head-advancing CAS to make this node the new
    /// sentinel is ever entitled to call `take_value`.
    value: UnsafeCell<Option<T>>,
    next: Atomic<Node<T>>,
}

impl<T> Node<T> {
    fn sentinel() -> Self {
        Self {
            value: UnsafeCell::new(None),
            next: Atomic::null(),
        }
    }

    /// # Safety
    /// Caller must be the unique thread that just won the CAS making this
    /// node the new head.
    unsafe fn take_value(&self) -> Option<T> {
        (*self.value.get()).take()
    }
}

/// A bounded Michael-Scott lock-free queue.
///
/// A permanent sentinel node occupies the head at all times; `head.next`
/// carries the logical front of the queue. Nodes are retired through
/// `crossbeam-epoch` so a dequeuing thread never frees memory another
/// thread might still be dereferencing.
///
/// The size bound is an atomic counter incremented before the enqueue's
/// pointer CAS and decremented after the dequeue's pointer CAS succeeds;
/// under concurrent access an observer may transiently see a count that is
/// off by the number of in-flight operations, so it is an approximate
/// bound, not a hard cap enforced atomically with the structural change.
pub struct MsQueue<T> {
    head: Atomic<Node<T>>,
    tail: Atomic<Node<T>>,
    capacity: usize,
    len: AtomicUsize,
}

unsafe impl<T: Send> Send for MsQueue<T> {}
unsafe impl<T: Send> Sync for MsQueue<T> {}

impl<T> MsQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let guard = epoch::pin();
        let sentinel = Owned::new(Node::sentinel()).into_shared(&guard);
        Self {
            head: Atomic::from(sentinel),
            tail: Atomic::from(sentinel),
            capacity,
            len: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn enqueue(&self, value: T) -> bool {
        if self.len.fetch_add(1, Ordering::AcqRel) >= self.capacity {
            self.len.fetch_sub(1, Ordering::AcqRel);
            return false;
        }

        let guard = &epoch::pin();
        let new_node = Owned::new(Node {
            value: UnsafeCell::new(Some(value)),
            next: Atomic::null(),
        });
        let new_node = new_node.into_shared(guard);

        loop {
            let tail = self.tail.load(Ordering::Acquire, guard);
            // SAFETY: `tail` is never null once constructed, and is only
            // ever freed after being unlinked from both head and tail.
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Ordering::Acquire, guard);

            if next.is_null() {
                match tail_ref.next.compare_exchange(
                    Shared::null(),
                    new_node,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                    guard,
                ) {
                    Ok(_) => {
                        let _ = self.tail.compare_exchange(
                            tail,
                            new_node,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                            guard,
                        );
                        return true;
                    }
                    Err(_) => continue,
                }
            } else {
                // Tail lagged behind; help advance it before retrying.
                let _ = self.tail.compare_exchange(
                    tail,
                    next,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                    guard,
                );
            }
        }
    }

    pub fn dequeue(&self) -> Option<T> {
        let guard = &epoch::pin();
        loop {
            let head = self.head.load(Ordering::Acquire, guard);
            let tail = self.tail.load(Ordering::Acquire, guard);
            // SAFETY: `head` is never null.
            let head_ref = unsafe { head.deref() };
            let next = head_ref.next.load(Ordering::Acquire, guard);

            if head == tail {
                if next.is_null() {
                    return None;
                }
                // Tail lagged behind a completed enqueue; help it along.
                let _ = self.tail.compare_exchange(
                    tail,
                    next,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                    guard,
                );
                continue;
            }

            // SAFETY: `next` is non-null here, checked above.
            let next_ref = unsafe { next.deref() };
            if self
                .head
                .compare_exchange(head, next, Ordering::AcqRel, Ordering::Acquire, guard)
                .is_ok()
            {
                self.len.fetch_sub(1, Ordering::AcqRel);
                // SAFETY: `head` was unlinked by the CAS above; no other
                // thread can observe it as reachable again, so it is safe
                // to retire for epoch-based reclamation.
                unsafe {
                    guard.defer_destroy(head);
                }
                // `next` becomes the new sentinel; its value is taken out.
                // SAFETY: this thread just won the CAS installing `next` as
                // the new head, so it is the unique owner of `next`'s value.
                return unsafe { next_ref.take_value() };
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

impl<T> Drop for MsQueue<T> {
    fn drop(&mut self) {
        let guard = &epoch::pin();
        let mut current = self.head.load(Ordering::Relaxed, guard);
        while !current.is_null() {
            // SAFETY: this queue is being dropped, so no other thread holds
            // a reference into it; every node reachable from `head` is
            // owned by this structure alone.
            let node = unsafe { current.into_owned() };
            let next = node.next.load(Ordering::Relaxed, guard);
            drop(node);
            current = next;
        }
    }
}

impl<T: Send + Sync> Queue<T> for MsQueue<T> {
    fn enqueue(&self, v: T) -> bool {
        MsQueue::enqueue(self, v)
    }

    fn dequeue(&self) -> Option<T> {
        MsQueue::dequeue(self)
    }

    fn size(&self) -> usize {
        MsQueue::len(self)
    }

    fn is_full(&self) -> bool {
        MsQueue::is_full(self)
    }
}
