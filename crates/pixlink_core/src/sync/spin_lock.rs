//! # Spin Lock
//!
//! Busy-wait mutual exclusion for critical sections that only move a few
//! indices. Both units take it; neither ever sleeps while holding it.
//!
//! ## Safety Note
//!
//! The lock hands out `&mut T` from a shared reference, which needs
//! `UnsafeCell`. The `locked` flag is the only thing that makes that sound,
//! so every access goes through [`SpinLockGuard`].

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A blocking, non-reentrant spin lock.
///
/// Locking twice from the same thread spins forever. Keep the guard's scope
/// to index and pointer updates.
///
/// ## Usage
///
/// ```rust,ignore
/// let lock = SpinLock::new(0u32);
/// {
///     let mut value = lock.lock();
///     *value += 1;
/// } // released here
/// ```
pub struct SpinLock<T> {
    /// Held flag.
    locked: AtomicBool,
    /// Number of acquisitions that had to spin at least once.
    contended: AtomicU64,
    /// The protected value.
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` is serialized by `locked`, so sharing the lock
// across threads only requires that `T` itself can move between threads.
unsafe impl<T: Send> Send for SpinLock<T> {}
// SAFETY: see above; `&SpinLock<T>` never exposes `&T` without holding the lock.
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Creates an unlocked lock around `value`.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            contended: AtomicU64::new(0),
            value: UnsafeCell::new(value),
        }
    }

    /// Spins until the lock is acquired.
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.contended.fetch_add(1, Ordering::Relaxed);
            loop {
                // Wait on a plain load so the cache line is not hammered with writes
                while self.locked.load(Ordering::Relaxed) {
                    std::hint::spin_loop();
                }
                if self
                    .locked
                    .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
                {
                    break;
                }
            }
        }
        SpinLockGuard { lock: self }
    }

    /// Acquires the lock only if it is free right now.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinLockGuard { lock: self })
    }

    /// True while some guard is alive.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Acquisitions that found the lock taken.
    #[inline]
    #[must_use]
    pub fn contended(&self) -> u64 {
        self.contended.load(Ordering::Relaxed)
    }

    /// Consumes the lock and returns the value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

/// Exclusive access to the value behind a [`SpinLock`]. Releases on drop.
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the guard exists only while `locked` is held by us
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard exists only while `locked` is held by us
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lock_and_release() {
        let lock = SpinLock::new(5u32);
        {
            let mut guard = lock.lock();
            *guard += 1;
            assert!(lock.is_locked());
            assert!(lock.try_lock().is_none());
        }
        assert!(!lock.is_locked());
        assert_eq!(*lock.lock(), 6);
    }

    #[test]
    fn test_two_threads_count_exactly() {
        let lock = Arc::new(SpinLock::new(0u64));
        let per_thread = 10_000;

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        *lock.lock() += 1;
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(*lock.lock(), 2 * per_thread);
    }

    #[test]
    fn test_into_inner() {
        let lock = SpinLock::new(vec![1, 2, 3]);
        lock.lock().push(4);
        assert_eq!(lock.into_inner(), vec![1, 2, 3, 4]);
    }
}
