//! The ring buffer's entire head/tail/full state packed into one `u64`,
//! so it can be read and swapped with a single CAS.
//!
//! Layout (high to low bit):
//!
//! ```text
//! bit 63      : init sentinel, always 1 once the word has been written once
//! bit 62      : full flag
//! bits 31..61 : head counter (31 bits)
//! bits 0..30  : tail counter (31 bits)
//! ```
//!
//! Head and tail are monotonically increasing counters, not slot indices;
//! the slot index is `counter % capacity`. 31 bits of counter headroom means
//! a buffer sustaining a billion enqueues/second wraps the counter space
//! after roughly 35 years, which `debug_assert_no_wrap` in [`crate::invariants`]
//! treats as a bug rather than normal wraparound.

const INIT_BIT: u64 = 1 << 63;
const FULL_BIT: u64 = 1 << 62;
const COUNTER_BITS: u32 = 31;
const COUNTER_MASK: u64 = (1 << COUNTER_BITS) - 1;

/// An unpacked view of the ring buffer's state word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PackedState {
    pub head: u64,
    pub tail: u64,
    pub full: bool,
}

impl PackedState {
    /// The state of a freshly constructed, empty buffer.
    pub(crate) const EMPTY: PackedState = PackedState {
        head: 0,
        tail: 0,
        full: false,
    };

    /// Unpacks a raw state word. A raw value of 0 (never written) decodes
    /// identically to an explicit empty state.
    #[inline]
    pub(crate) fn unpack(raw: u64) -> Self {
        PackedState {
            head: (raw >> COUNTER_BITS) & COUNTER_MASK,
            tail: raw & COUNTER_MASK,
            full: raw & FULL_BIT != 0,
        }
    }

    /// Packs this state back into a raw word, setting the init sentinel.
    #[inline]
    pub(crate) fn pack(self) -> u64 {
        INIT_BIT
            | (if self.full { FULL_BIT } else { 0 })
            | ((self.head & COUNTER_MASK) << COUNTER_BITS)
            | (self.tail & COUNTER_MASK)
    }

    #[inline]
    pub(crate) fn is_empty(self) -> bool {
        !self.full && self.head == self.tail
    }

    #[inline]
    pub(crate) fn len(self, capacity: u64) -> u64 {
        if self.full {
            capacity
        } else {
            self.tail.wrapping_sub(self.head) & COUNTER_MASK
        }
    }

    /// The state after a successful enqueue, given `capacity`.
    #[inline]
    pub(crate) fn after_enqueue(self, capacity: u64) -> Self {
        let tail = (self.tail + 1) & COUNTER_MASK;
        PackedState {
            head: self.head,
            tail,
            full: (tail.wrapping_sub(self.head) & COUNTER_MASK) == capacity,
        }
    }

    /// The state after a successful dequeue.
    #[inline]
    pub(crate) fn after_dequeue(self) -> Self {
        PackedState {
            head: (self.head + 1) & COUNTER_MASK,
            tail: self.tail,
            full: false,
        }
    }
}
