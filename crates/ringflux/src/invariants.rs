//! Debug assertion macros for container invariants.
//!
//! These macros provide runtime checks for the invariants documented in the
//! crate's design notes. They are only active in debug builds
//! (`#[cfg(debug_assertions)]`), so there is zero overhead in release builds.
//!
//! Used by `RingBuffer<T>`, whose packed head/tail state word is exactly
//! the kind of single-thread-owned-at-a-time structural invariant these
//! macros check cheaply. `MsQueue<T>`/`TreiberStack<T>` carry their own
//! approximate size bound documented inline instead (see their module
//! comments): a linked-list pointer CAS has no equivalent packed-word
//! snapshot to assert against.

// =============================================================================
// I1: Bounded Count
// =============================================================================

/// Assert that count does not exceed capacity.
///
/// **Invariant**: `0 <= size() <= capacity`
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "I1 violated: size {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

// =============================================================================
// Monotonic progress of the packed-state head/tail counters
// =============================================================================

/// Assert that a sequence number only increases (monotonic progress).
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "monotonicity violated: {} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

/// Detects a sequence counter jumping backwards by more than half the
/// 31-bit counter space, which would indicate real wraparound corruption
/// rather than the ordinary `+1` progression.
macro_rules! debug_assert_no_wrap {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old || $old.wrapping_sub($new) > (1u64 << 30),
            "potential wraparound: {} went from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_no_wrap;
