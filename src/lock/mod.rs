mod mutex;
mod spinlock;

pub use mutex::RawMutex;
pub use spinlock::RawSpinLock;

/// A lock that only knows how to be taken and given back.
///
/// Implementors are used as the raw part of [`Monitor`](crate::monitor::Monitor),
/// which pairs them with the data they protect.
pub unsafe trait RawSimpleLock {
    fn new() -> Self;

    /// Non-blocking: Try locking. If succeeding, return true, or false.
    fn try_lock(&self) -> bool;

    /// Blocking: Get locking or wait until getting locking
    fn lock(&self);

    /// Release lock
    ///
    /// # Safety
    ///
    /// The caller must hold the lock.
    unsafe fn unlock(&self);
}
