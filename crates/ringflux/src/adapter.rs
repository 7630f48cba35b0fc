use crate::stack::TreiberStack;
use crate::traits::{Queue, Stack};

/// Exposes a [`Stack`] under the [`Queue`] capability set: `enqueue` maps to
/// `push`, `dequeue` maps to `pop`. Callers get LIFO delivery where FIFO
/// would ordinarily be expected — only substitute this where ordering does
/// not matter to the consumer.
pub struct StackQueueAdapter<T> {
    inner: TreiberStack<T>,
}

impl<T> StackQueueAdapter<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: TreiberStack::new(capacity),
        }
    }
}

impl<T: Send + Sync> Queue<T> for StackQueueAdapter<T> {
    fn enqueue(&self, v: T) -> bool {
        self.inner.push(v)
    }

    fn dequeue(&self) -> Option<T> {
        self.inner.pop()
    }

    fn size(&self) -> usize {
        self.inner.len()
    }

    fn is_full(&self) -> bool {
        self.inner.is_full()
    }
}
