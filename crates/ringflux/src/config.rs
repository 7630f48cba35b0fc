/// Configuration for [`crate::RingBuffer`], [`crate::MsQueue`] and [`crate::TreiberStack`].
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Fixed capacity of the container. Must be nonzero.
    pub capacity: usize,
    /// When true, an `enqueue`/`push` on a full ring buffer drops the oldest
    /// element instead of returning `false`. Has no effect on the linked-list
    /// backends, which always refuse once at capacity.
    pub override_on_full: bool,
}

impl Config {
    /// # Panics
    ///
    /// Panics if `capacity` is 0 or exceeds `1 << 30` (to keep the packed
    /// ring buffer's 31-bit counters from being a practical constraint).
    pub const fn new(capacity: usize, override_on_full: bool) -> Self {
        assert!(capacity > 0, "capacity must be nonzero");
        assert!(capacity <= (1 << 30), "capacity must fit the packed-state counters");
        Self {
            capacity,
            override_on_full,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1024,
            override_on_full: false,
        }
    }
}

/// A small, non-overriding configuration suited to control/command queues.
pub const CONTROL_QUEUE_CONFIG: Config = Config::new(32, false);

/// A large, overriding configuration suited to best-effort event buses.
pub const EVENT_QUEUE_CONFIG: Config = Config::new(1024, true);
