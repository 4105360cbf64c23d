use std::{
    cell::UnsafeCell,
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

use crate::lock::{RawMutex, RawSimpleLock};

/// A value that can only be touched while holding its lock.
///
/// The lock is either taken by hand with [`capture`](Monitor::capture) and
/// given back with [`release`](Monitor::release) (or by dropping the guard), or
/// scoped around a closure with [`access`](Monitor::access).
///
/// ```
/// use mtutils::monitor::Monitor;
///
/// let counter: Monitor<i32> = Monitor::new(0);
///
/// counter.access(|c| *c += 1);
///
/// let mut guard = counter.capture();
/// *guard += 1;
/// Monitor::release(guard);
///
/// assert_eq!(counter.into_inner(), 2);
/// ```
pub struct Monitor<T, L: RawSimpleLock = RawMutex> {
    lock: L,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send, L: RawSimpleLock + Send> Send for Monitor<T, L> {}
unsafe impl<T: Send, L: RawSimpleLock + Sync> Sync for Monitor<T, L> {}

/// Holds a [`Monitor`]'s lock until dropped.
///
/// The lock must be given back on the thread that took it, so a guard cannot
/// be sent to another thread:
///
/// ```compile_fail
/// use mtutils::monitor::Monitor;
///
/// fn assert_send<T: Send>(_: &T) {}
///
/// let counter: Monitor<i32> = Monitor::new(0);
/// let guard = counter.capture();
/// assert_send(&guard);
/// ```
pub struct Guard<'s, T, L: RawSimpleLock = RawMutex> {
    monitor: &'s Monitor<T, L>,
    _not_send: PhantomData<*const ()>,
}

unsafe impl<'s, T: Sync, L: RawSimpleLock + Sync> Sync for Guard<'s, T, L> {}

impl<T, L: RawSimpleLock> Monitor<T, L> {
    pub fn new(data: T) -> Self {
        Self {
            lock: L::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Take the lock, waiting for it if necessary.
    pub fn capture(&self) -> Guard<'_, T, L> {
        self.lock.lock();

        Guard {
            monitor: self,
            _not_send: PhantomData,
        }
    }

    pub fn try_capture(&self) -> Option<Guard<'_, T, L>> {
        if self.lock.try_lock() {
            Some(Guard {
                monitor: self,
                _not_send: PhantomData,
            })
        } else {
            None
        }
    }

    /// Give back a lock taken with [`capture`](Monitor::capture).
    pub fn release(guard: Guard<'_, T, L>) {
        drop(guard);
    }

    /// Run `f` while holding the lock.
    pub fn access<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.capture();

        f(guard.deref_mut())
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default, L: RawSimpleLock> Default for Monitor<T, L> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<'s, T, L: RawSimpleLock> Deref for Guard<'s, T, L> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.monitor.data.get() }
    }
}

impl<'s, T, L: RawSimpleLock> DerefMut for Guard<'s, T, L> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.monitor.data.get() }
    }
}

impl<'s, T, L: RawSimpleLock> Drop for Guard<'s, T, L> {
    fn drop(&mut self) {
        unsafe { self.monitor.lock.unlock() };
    }
}
