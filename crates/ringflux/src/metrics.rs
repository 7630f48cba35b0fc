use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time counters snapshotted out of a container's live [`Metrics`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub enqueued: u64,
    pub dequeued: u64,
    pub rejected: u64,
    pub overridden: u64,
    pub cas_retries: u64,
}

/// Atomic counters updated on the hot path. Cheap enough to always enable;
/// there is no `enable_metrics` switch here because, unlike the teacher's
/// SPSC ring, every field is a single atomic increment rather than a batch
/// update amortized over many items.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    rejected: AtomicU64,
    overridden: AtomicU64,
    cas_retries: AtomicU64,
}

impl Metrics {
    #[inline]
    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dequeued(&self) {
        self.dequeued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_overridden(&self) {
        self.overridden.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_cas_retry(&self) {
        self.cas_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dequeued: self.dequeued.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            overridden: self.overridden.load(Ordering::Relaxed),
            cas_retries: self.cas_retries.load(Ordering::Relaxed),
        }
    }
}
