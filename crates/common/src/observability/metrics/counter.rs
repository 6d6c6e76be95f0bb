//! Lock-free monotonic counter

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic `u64` counter safe for concurrent writers
///
/// All operations use `Relaxed` ordering: each counter is independent and
/// readers only need an eventually-consistent value.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl AtomicCounter {
    pub const fn new(initial: u64) -> Self {
        Self { value: AtomicU64::new(initial) }
    }

    /// Add one and return the new value
    pub fn increment(&self) -> u64 {
        self.add(1)
    }

    /// Add `delta` and return the new value (wrapping at `u64::MAX`)
    pub fn add(&self, delta: u64) -> u64 {
        // Relaxed OK: independent counter
        self.value.fetch_add(delta, Ordering::Relaxed).wrapping_add(delta)
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Reset to zero, returning the previous value
    pub fn take(&self) -> u64 {
        self.value.swap(0, Ordering::Relaxed)
    }
}
