//! Lazily-computed, thread-safely invalidated scalar caches.
//!
//! `Vector`'s aggregates (squared sum, max absolute value, unit-length flag)
//! are logically derived from the value array but expensive enough to be
//! worth memoizing. Multiple readers may race to compute the same value;
//! that's fine (the work is merely duplicated, never corrupting), so this
//! uses double-checked locking rather than a single exclusive lock per read.
//!
//! The "valid" flag is published with `Release` ordering only after the
//! value itself has been written, and readers check it with `Acquire` — so a
//! reader that observes `valid == true` is guaranteed to see the write that
//! set it, never a torn or stale value.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// A lazily-computed `Copy` value that can be invalidated and recomputed.
#[derive(Debug)]
pub(crate) struct Cached<T: Copy> {
    valid: AtomicBool,
    value: UnsafeCell<T>,
    recompute_lock: Mutex<()>,
}

// SAFETY: `value` is only ever written while `recompute_lock` is held, and is
// only read after observing `valid == true` via an `Acquire` load, which
// synchronizes-with the `Release` store performed right after the write.
unsafe impl<T: Copy + Send> Sync for Cached<T> {}

impl<T: Copy> Cached<T> {
    /// Construct an invalidated cache; `placeholder` is never observed by a
    /// caller (it's overwritten before `valid` is ever set).
    pub(crate) fn new(placeholder: T) -> Self {
        Self {
            valid: AtomicBool::new(false),
            value: UnsafeCell::new(placeholder),
            recompute_lock: Mutex::new(()),
        }
    }

    /// Return the cached value, computing it via `f` if not yet valid.
    pub(crate) fn get_or_compute(&self, f: impl FnOnce() -> T) -> T {
        if self.valid.load(Ordering::Acquire) {
            // SAFETY: `valid` observed true with Acquire; synchronizes-with
            // the Release store below, so the write is visible here.
            return unsafe { *self.value.get() };
        }

        let _guard = self.recompute_lock.lock();
        // Re-check: another thread may have finished computing while we
        // waited for the lock.
        if self.valid.load(Ordering::Acquire) {
            return unsafe { *self.value.get() };
        }

        let computed = f();
        // SAFETY: we hold `recompute_lock`, so no other writer can be
        // touching `value` concurrently.
        unsafe {
            *self.value.get() = computed;
        }
        self.valid.store(true, Ordering::Release);
        computed
    }

    /// Clear the cache. Must be called before the underlying value becomes
    /// observably different to other threads (i.e. before, not after, the
    /// mutation that invalidates it is published).
    pub(crate) fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }
}

impl<T: Copy> Clone for Cached<T> {
    fn clone(&self) -> Self {
        if self.valid.load(Ordering::Acquire) {
            // SAFETY: see `get_or_compute`.
            Self::new_valid(unsafe { *self.value.get() })
        } else {
            Self::new(unsafe { *self.value.get() })
        }
    }
}

impl<T: Copy> Cached<T> {
    fn new_valid(value: T) -> Self {
        let cached = Self::new(value);
        cached.valid.store(true, Ordering::Release);
        cached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn computes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = Cached::new(0.0_f32);
        for _ in 0..5 {
            let calls = calls.clone();
            let v = cache.get_or_compute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                42.0
            });
            assert_eq!(v, 42.0);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let cache = Cached::new(1.0_f32);
        assert_eq!(cache.get_or_compute(|| 1.0), 1.0);
        cache.invalidate();
        assert_eq!(cache.get_or_compute(|| 2.0), 2.0);
    }

    #[test]
    fn concurrent_readers_see_consistent_value() {
        let cache = Arc::new(Cached::new(0.0_f32));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || cache.get_or_compute(|| 7.0)));
        }
        for h in handles {
            assert_eq!(h.join().unwrap(), 7.0);
        }
    }
}
