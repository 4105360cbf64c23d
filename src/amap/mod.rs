//! A map whose every operation runs on one dedicated worker thread.
//!
//! [`Amap`] never locks its storage. Each call is turned into a command and
//! queued; the worker applies commands in arrival order against a private
//! `HashMap` and answers through a [`Pending`] handle. Callers choose whether
//! and when to wait on that handle.
//!
//! ```
//! use mtutils::amap::Amap;
//!
//! let map = Amap::new(16);
//!
//! map.insert("a", 1).wait();
//! assert_eq!(map.get("a").wait(), Some(1));
//! assert_eq!(map.get("b").wait(), None);
//!
//! map.close();
//! ```
//!
//! The command queue is bounded: when it is full, submitting blocks until the
//! worker takes the next command off. A capacity of `0` makes every submission
//! a rendezvous with the worker.
//!
//! Using a map after [`close`](Amap::close) is a programming error and panics.
//! A submission blocked on a full queue when the map closes fails the same way.
//! Everything admitted before the close is still processed.

mod command;
mod pending;
mod worker;

pub use pending::Pending;

use std::{
    collections::HashMap,
    hash::Hash,
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use command::Command;
use pending::Completion;
use worker::Worker;

#[derive(Debug, Error)]
pub enum AmapError {
    #[error("async map is closed")]
    Closed,
    #[error("no result within {0:?}")]
    Timeout(Duration),
    #[error("failed to spawn the map worker: {0}")]
    Spawn(#[from] io::Error),
}

/// State shared between the facade and the set_pair forwarders.
pub(crate) struct Shared<K, V> {
    closed: AtomicBool,
    // `None` once closed
    open: RwLock<Option<Open<K, V>>>,
    // disconnects on close, waking submitters stalled on a full queue
    closing: Receiver<()>,
}

struct Open<K, V> {
    commands: Sender<Command<K, V>>,
    _closing: Sender<()>,
}

impl<K, V> Shared<K, V> {
    fn new(commands: Sender<Command<K, V>>) -> Self {
        let (closing_tx, closing) = bounded(0);

        Self {
            closed: AtomicBool::new(false),
            open: RwLock::new(Some(Open {
                commands,
                _closing: closing_tx,
            })),
            closing,
        }
    }

    fn submit(&self, command: Command<K, V>) -> Result<(), AmapError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AmapError::Closed);
        }

        // the lock is never held across the enqueue
        let commands = match self.open.read().as_ref() {
            Some(open) => open.commands.clone(),
            None => return Err(AmapError::Closed),
        };

        select! {
            send(commands, command) -> sent => sent.map_err(|_| AmapError::Closed),
            recv(self.closing) -> _ => Err(AmapError::Closed),
        }
    }

    fn set(&self, key: K) -> Result<(ValueSink<V>, Pending<()>), AmapError> {
        let (tx, value) = bounded(1);
        let (done, pending) = Completion::oneshot();

        self.submit(Command::Set { key, value, done })?;

        Ok((ValueSink { tx }, pending))
    }

    fn insert(&self, key: K, value: V) -> Result<Pending<()>, AmapError> {
        let (sink, done) = self.set(key)?;

        // a value that cannot be handed over shows up as an empty ack
        let _ = sink.send(value);

        Ok(done)
    }

    fn close(&self) -> bool {
        self.closed.store(true, Ordering::Release);

        // the worker drains and exits once the last in-flight sender clone is gone
        self.open.write().take().is_some()
    }
}

/// Write side of a [`set`](Amap::set): takes exactly one value.
pub struct ValueSink<V> {
    tx: Sender<V>,
}

impl<V> ValueSink<V> {
    pub fn send(self, value: V) -> Result<(), AmapError> {
        self.tx.send(value).map_err(|_| AmapError::Closed)
    }
}

/// Write side of a [`set_pair`](Amap::set_pair) stream. Dropping every clone ends the stream.
pub struct PairSink<K, V> {
    tx: Sender<(K, V)>,
}

impl<K, V> PairSink<K, V> {
    pub fn send(&self, key: K, value: V) -> Result<(), AmapError> {
        self.tx.send((key, value)).map_err(|_| AmapError::Closed)
    }
}

impl<K, V> Clone for PairSink<K, V> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

pub struct Amap<K, V> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> Amap<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Create a map whose command queue holds up to `capacity` commands.
    ///
    /// # Panics
    ///
    /// Panics if the worker thread cannot be spawned, see [`try_new`](Amap::try_new).
    pub fn new(capacity: usize) -> Self {
        Self::try_new(capacity).unwrap_or_else(|err| panic!("{}", err))
    }

    pub fn try_new(capacity: usize) -> Result<Self, AmapError> {
        let (sender, receiver) = bounded(capacity);

        let shared = Arc::new(Shared::new(sender));

        Worker::new(receiver, Arc::downgrade(&shared)).spawn()?;
        debug!(capacity, "amap created");

        Ok(Self { shared })
    }

    fn submit(&self, command: Command<K, V>) {
        if let Err(err) = self.shared.submit(command) {
            panic!("{}", err);
        }
    }

    /// Reserve a set of `key`. The set takes effect once a value is sent
    /// through the returned sink; the `Pending` resolves after it is installed.
    pub fn set(&self, key: K) -> (ValueSink<V>, Pending<()>) {
        self.shared.set(key).unwrap_or_else(|err| panic!("{}", err))
    }

    pub fn insert(&self, key: K, value: V) -> Pending<()> {
        self.shared
            .insert(key, value)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Resolves to `None` if `key` is absent.
    pub fn get(&self, key: K) -> Pending<V> {
        let (done, pending) = Completion::oneshot();
        self.submit(Command::Get { key, done });

        pending
    }

    /// Read and remove `key` in one step. Resolves to `None` if it was absent.
    pub fn release(&self, key: K) -> Pending<V> {
        let (done, pending) = Completion::oneshot();
        self.submit(Command::Release { key, done });

        pending
    }

    pub fn delete(&self, key: K) -> Pending<()> {
        let (done, pending) = Completion::oneshot();
        self.submit(Command::Delete { key, done });

        pending
    }

    pub fn len(&self) -> Pending<usize> {
        let (done, pending) = Completion::oneshot();
        self.submit(Command::Len { done });

        pending
    }

    /// Every pair present when the worker reaches this command, in no particular order.
    ///
    /// The result buffer is sized from a `len` taken just before; if the map
    /// grows in between, the worker hands the surplus over as it is read.
    pub fn list(&self) -> Pending<(K, V)> {
        let estimate = self.len().wait().unwrap_or(0);

        let (done, pending) = Completion::sequence(estimate);
        self.submit(Command::List { done });

        pending
    }

    /// Open a stream of pairs, each applied as an independent set.
    ///
    /// The pairs are forwarded by a separate thread, so they interleave freely
    /// with other commands. Each one is applied eventually while the map is open.
    pub fn set_pair(&self) -> PairSink<K, V> {
        let (tx, pairs) = bounded(0);
        self.submit(Command::SetPair { pairs });

        PairSink { tx }
    }

    /// Run `f` on the worker with exclusive access to the whole map.
    ///
    /// Nothing else is processed while `f` runs. `f` must not use this map
    /// itself: the worker it would wait on is the one running it. If `f`
    /// panics, the panic is contained and the `Pending` resolves to `None`.
    pub fn batch<F, R>(&self, f: F) -> Pending<R>
    where
        F: FnOnce(&mut HashMap<K, V>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (done, pending) = Completion::oneshot();

        self.submit(Command::Batch {
            job: Box::new(move |map: &mut HashMap<K, V>| done.complete(f(map))),
        });

        pending
    }
}

impl<K, V> Amap<K, V> {
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Stop accepting commands. Already queued commands still run.
    pub fn close(&self) {
        if self.shared.close() {
            debug!("amap closed");
        }
    }
}

impl<K, V> Drop for Amap<K, V> {
    fn drop(&mut self) {
        self.close();
    }
}
