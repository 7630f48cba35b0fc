/// The capability set shared by every bounded container in this crate.
///
/// Implementors never block and never panic on ordinary over/underflow:
/// `enqueue` returns `false` when the container refuses the value (at
/// capacity, or closed where applicable), `dequeue` returns `None` when
/// there is nothing to take.
pub trait Queue<T>: Send + Sync {
    /// Attempts to add `v`. Returns `false` iff the container is at
    /// capacity and does not override.
    fn enqueue(&self, v: T) -> bool;

    /// Attempts to remove the oldest (per the container's own ordering)
    /// value. Returns `None` iff the container is empty.
    fn dequeue(&self) -> Option<T>;

    /// A best-effort, single-snapshot view of the current length.
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn is_full(&self) -> bool;
}

/// The stack capability: same shape as [`Queue`], named for LIFO callers.
pub trait Stack<T>: Send + Sync {
    fn push(&self, v: T) -> bool;
    fn pop(&self) -> Option<T>;
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn is_full(&self) -> bool;
}
