use std::sync::atomic::{AtomicUsize, Ordering};

use crate::lock::{RawMutex, RawSimpleLock, RawSpinLock};
use crate::monitor::Monitor;

use super::{ConcurrentStack, Stack};

/// A [`Stack`] behind a lock of kind `L`.
///
/// The element count is mirrored in an atomic so `count` never waits for the lock.
pub struct LockStack<V, L: RawSimpleLock> {
    stack: Monitor<Stack<V>, L>,
    count: AtomicUsize,
}

pub type MutexStack<V> = LockStack<V, RawMutex>;
pub type SpinLockStack<V> = LockStack<V, RawSpinLock>;

impl<V, L: RawSimpleLock> ConcurrentStack<V> for LockStack<V, L> {
    fn new() -> Self {
        Self {
            stack: Monitor::new(Stack::new()),
            count: AtomicUsize::new(0),
        }
    }

    fn push(&self, value: V) {
        let mut guard = self.stack.capture();

        guard.push(value);
        self.count.fetch_add(1, Ordering::Release);
    }

    fn pop(&self) -> Option<V> {
        let mut guard = self.stack.capture();

        let value = guard.pop();

        if value.is_some() {
            self.count.fetch_sub(1, Ordering::Release);
        }

        value
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}
