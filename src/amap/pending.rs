use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use super::AmapError;

/// The caller's end of a completion signal.
///
/// A scalar result is delivered at most once and the signal is closed right
/// after. Closing without a value is a normal outcome: `get` on a missing key,
/// for example, yields `None` from [`wait`](Pending::wait).
///
/// Sequence results (`list`) are read by iterating the `Pending` until it closes.
#[must_use = "the result of a map operation is only observable through its `Pending`"]
pub struct Pending<T> {
    rx: Receiver<T>,
}

/// The worker's end of a completion signal. Dropping it closes the signal.
pub(crate) struct Completion<T> {
    tx: Sender<T>,
}

impl<T> Completion<T> {
    /// A signal carrying at most one value.
    pub(crate) fn oneshot() -> (Completion<T>, Pending<T>) {
        Self::sequence(1)
    }

    /// A signal carrying a run of values, buffering up to `capacity` of them.
    pub(crate) fn sequence(capacity: usize) -> (Completion<T>, Pending<T>) {
        let (tx, rx) = bounded(capacity);

        (Completion { tx }, Pending { rx })
    }

    /// Write the only value and close.
    pub(crate) fn complete(self, value: T) {
        // the caller may have stopped waiting; the command still counts as done
        let _ = self.tx.send(value);
    }

    /// Write one value of a sequence. Returns `false` once nobody reads anymore.
    pub(crate) fn feed(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }

    /// Close without a value.
    pub(crate) fn close(self) {}
}

impl<T> Pending<T> {
    /// Block until the result arrives. `None` means the signal closed empty.
    pub fn wait(self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Like [`wait`](Pending::wait), but gives up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<T>, AmapError> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Ok(Some(value)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(RecvTimeoutError::Timeout) => Err(AmapError::Timeout(timeout)),
        }
    }
}

impl<T> IntoIterator for Pending<T> {
    type Item = T;
    type IntoIter = crossbeam_channel::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rx.into_iter()
    }
}
