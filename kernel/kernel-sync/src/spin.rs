use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

/// A test-and-test-and-set spin lock with RAII unlock.
///
/// Contended waiters spin on a plain load and only retry the
/// compare-exchange when the lock looks free, keeping the cache line quiet
/// while someone else holds it. Suitable only for short critical sections;
/// holders must not sleep (there is nothing to sleep on).
pub struct SpinLock<T> {
    /// `true` while a guard is live.
    held: AtomicBool,
    inner: UnsafeCell<T>,
}

// Safety: the lock serializes all access to `inner`; only T: Send may be
// handed from one CPU to another through it.
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    #[must_use]
    pub const fn new(inner: T) -> Self {
        Self {
            held: AtomicBool::new(false),
            inner: UnsafeCell::new(inner),
        }
    }

    /// A single acquisition attempt; never spins.
    ///
    /// Returns `None` if the lock is currently held. This is the
    /// acquisition mode used when taking a *remote* resource where blocking
    /// could form a lock-order cycle.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinGuard<'_, T>> {
        if self.acquire() {
            Some(SpinGuard { lock: self })
        } else {
            None
        }
    }

    /// Spin until the lock is acquired.
    #[inline]
    pub fn lock(&self) -> SpinGuard<'_, T> {
        while !self.acquire() {
            // wait on a read; the CAS retry happens in `acquire`
            while self.held.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
        SpinGuard { lock: self }
    }

    /// Access without locking, possible because `&mut self` proves no other
    /// reference exists.
    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    #[inline]
    fn acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

/// Exclusive access to the data behind a [`SpinLock`]; unlocks on drop.
pub struct SpinGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: holding the guard means holding the lock.
        unsafe { &*self.lock.inner.get() }
    }
}

impl<T> DerefMut for SpinGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: holding the guard means holding the lock.
        unsafe { &mut *self.lock.inner.get() }
    }
}

impl<T> Drop for SpinGuard<'_, T> {
    fn drop(&mut self) {
        // Release publishes the critical section to the next holder.
        self.lock.held.store(false, Ordering::Release);
    }
}
