//! Process-global heap statistics
//!
//! The heap updates these counters on every allocate and free so
//! diagnostics can read them from outside the VM. The interpreter is
//! single-threaded, but the SIGQUIT handler runs on a signal thread, so
//! the counters are atomics: single relaxed stores on the allocation path,
//! reads only when someone asks.
//!
//! The counters are process-wide. With several heaps alive (tests mostly)
//! they aggregate across all of them, so readers should reason in deltas.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

static LIVE_OBJECTS: AtomicU64 = AtomicU64::new(0);
static LIVE_BYTES: AtomicU64 = AtomicU64::new(0);
static PEAK_BYTES: AtomicU64 = AtomicU64::new(0);
static TOTAL_ALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static INTERNED_STRINGS: AtomicU64 = AtomicU64::new(0);

/// Record one object allocation of `bytes` footprint.
pub(crate) fn record_alloc(bytes: usize) {
    TOTAL_ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    LIVE_OBJECTS.fetch_add(1, Ordering::Relaxed);
    let live = LIVE_BYTES.fetch_add(bytes as u64, Ordering::Relaxed) + bytes as u64;
    PEAK_BYTES.fetch_max(live, Ordering::Relaxed);
}

/// Record one object free. `bytes` must be the footprint recorded at
/// allocation.
pub(crate) fn record_free(bytes: usize) {
    LIVE_OBJECTS.fetch_sub(1, Ordering::Relaxed);
    LIVE_BYTES.fetch_sub(bytes as u64, Ordering::Relaxed);
}

pub(crate) fn record_intern() {
    INTERNED_STRINGS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_unintern() {
    INTERNED_STRINGS.fetch_sub(1, Ordering::Relaxed);
}

/// Point-in-time view of the counters.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct MemorySnapshot {
    pub live_objects: u64,
    pub live_bytes: u64,
    pub peak_bytes: u64,
    pub total_allocations: u64,
    pub interned_strings: u64,
}

pub fn snapshot() -> MemorySnapshot {
    MemorySnapshot {
        live_objects: LIVE_OBJECTS.load(Ordering::Relaxed),
        live_bytes: LIVE_BYTES.load(Ordering::Relaxed),
        peak_bytes: PEAK_BYTES.load(Ordering::Relaxed),
        total_allocations: TOTAL_ALLOCATIONS.load(Ordering::Relaxed),
        interned_strings: INTERNED_STRINGS.load(Ordering::Relaxed),
    }
}
