//! Small object pools for the scratch structures used in every index query:
//! an id→count map for the counting strategy and an id set for dedup. Both
//! are short-lived and hot, so queries rent them from a pool instead of
//! allocating fresh every call, and return them (reset, not dropped) on
//! every exit path including early returns.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

trait Resettable {
    fn reset(&mut self);
}

impl<K, V> Resettable for HashMap<K, V> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<T> Resettable for HashSet<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

/// A thread-safe free list of reusable `T`s. `acquire` pops one (or builds a
/// fresh one if the pool is empty); the returned guard pushes it back onto
/// the free list when dropped.
pub(crate) struct Pool<T: Resettable + Default> {
    free: Mutex<Vec<T>>,
}

impl<T: Resettable + Default> Pool<T> {
    pub(crate) fn new() -> Self {
        Pool {
            free: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn acquire(&self) -> Pooled<'_, T> {
        let value = self.free.lock().pop().unwrap_or_default();
        Pooled {
            pool: self,
            value: Some(value),
        }
    }

    fn release(&self, mut value: T) {
        value.reset();
        self.free.lock().push(value);
    }
}

pub(crate) struct Pooled<'a, T: Resettable + Default> {
    pool: &'a Pool<T>,
    value: Option<T>,
}

impl<'a, T: Resettable + Default> std::ops::Deref for Pooled<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.value.as_ref().expect("value taken before drop")
    }
}

impl<'a, T: Resettable + Default> std::ops::DerefMut for Pooled<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("value taken before drop")
    }
}

impl<'a, T: Resettable + Default> Drop for Pooled<'a, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.release(value);
        }
    }
}

pub(crate) type CounterPool = Pool<HashMap<u32, u32>>;
pub(crate) type IdSetPool = Pool<HashSet<u32>>;
