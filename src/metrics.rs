//! Lightweight global metrics: atomic counters for the handful of events
//! worth watching in this format (splits, overflow growth, inserts).
//! Surfaced by the `stats` CLI command.

use std::sync::atomic::{AtomicU64, Ordering};

static SPLITS_PERFORMED: AtomicU64 = AtomicU64::new(0);
static OVERFLOW_PAGES_ALLOCATED: AtomicU64 = AtomicU64::new(0);
static TUPLES_INSERTED: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub splits_performed: u64,
    pub overflow_pages_allocated: u64,
    pub tuples_inserted: u64,
}

pub fn record_split() {
    SPLITS_PERFORMED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_overflow_page_allocated() {
    OVERFLOW_PAGES_ALLOCATED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_tuple_inserted() {
    TUPLES_INSERTED.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        splits_performed: SPLITS_PERFORMED.load(Ordering::Relaxed),
        overflow_pages_allocated: OVERFLOW_PAGES_ALLOCATED.load(Ordering::Relaxed),
        tuples_inserted: TUPLES_INSERTED.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    SPLITS_PERFORMED.store(0, Ordering::Relaxed);
    OVERFLOW_PAGES_ALLOCATED.store(0, Ordering::Relaxed);
    TUPLES_INSERTED.store(0, Ordering::Relaxed);
}
