//! Lightweight collector statistics, updated by the collector and read by
//! the host for diagnostics.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct GcStats {
    cycle_count: AtomicU64,
    last_cycle_duration_ms: AtomicU64,
    bytes_relocated: AtomicU64,
    objects_marked: AtomicU64,
    last_cycle_at: Mutex<Option<DateTime<Utc>>>,
}

impl GcStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, duration_ms: u64, bytes_relocated: u64, objects_marked: u64) {
        self.cycle_count.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_duration_ms
            .store(duration_ms, Ordering::Relaxed);
        self.bytes_relocated
            .fetch_add(bytes_relocated, Ordering::Relaxed);
        self.objects_marked
            .fetch_add(objects_marked, Ordering::Relaxed);
        *self.last_cycle_at.lock() = Some(Utc::now());
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count.load(Ordering::Relaxed)
    }

    pub fn last_cycle_duration_ms(&self) -> u64 {
        self.last_cycle_duration_ms.load(Ordering::Relaxed)
    }

    pub fn bytes_relocated(&self) -> u64 {
        self.bytes_relocated.load(Ordering::Relaxed)
    }

    pub fn objects_marked(&self) -> u64 {
        self.objects_marked.load(Ordering::Relaxed)
    }

    /// RFC3339 timestamp of the most recently completed cycle, if any.
    pub fn last_cycle_at(&self) -> Option<String> {
        self.last_cycle_at.lock().map(|t| t.to_rfc3339())
    }
}
