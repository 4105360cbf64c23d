//! A map whose entries expire after a period without activity.
//!
//! Each cache runs one background sweeper. Every new key is scheduled with the
//! sweeper, which sleeps until the earliest scheduled entry could have expired,
//! removes it if nothing touched it in the meantime, and hands the evicted value
//! to the eviction callback. Entries that saw activity are rescheduled.

use std::{
    cmp::{Ordering as CmpOrdering, Reverse},
    collections::{BinaryHeap, HashMap},
    hash::Hash,
    io,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, trace, warn};

use crate::monitor::Monitor;

type EvictFn<K, V> = Box<dyn Fn(&K, V) + Send + Sync>;

pub struct Cache<K, V> {
    inner: Arc<Inner<K, V>>,
    // dropping the last handle stops the sweeper
    schedule: Sender<Deadline<K>>,
}

struct Inner<K, V> {
    entries: Monitor<HashMap<K, Entry<V>>>,
    ttl: Duration,
    on_evict: Option<EvictFn<K, V>>,
    // tells the sweeper whether an entry is still the one it was scheduled for
    generation: AtomicU64,
}

struct Entry<V> {
    value: V,
    last_activity: Instant,
    generation: u64,
}

enum Sweep {
    Gone,
    Evicted,
    Alive(Duration),
}

/// When the sweeper should look at `key` next. Ordered by time only.
struct Deadline<K> {
    at: Instant,
    generation: u64,
    key: K,
}

impl<K> PartialEq for Deadline<K> {
    fn eq(&self, other: &Self) -> bool {
        (self.at, self.generation) == (other.at, other.generation)
    }
}

impl<K> Eq for Deadline<K> {}

impl<K> PartialOrd for Deadline<K> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Deadline<K> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.at, self.generation).cmp(&(other.at, other.generation))
    }
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash,
{
    fn sweep(&self, key: &K, generation: u64) -> Sweep {
        let evicted = {
            let mut entries = self.entries.capture();

            let elapsed = match entries.get(key) {
                Some(entry) if entry.generation == generation => entry.last_activity.elapsed(),
                _ => return Sweep::Gone,
            };

            if elapsed < self.ttl {
                return Sweep::Alive(self.ttl - elapsed);
            }

            entries.remove(key)
        };

        // the callback runs without the lock so it may use the cache
        if let (Some(entry), Some(on_evict)) = (evicted, self.on_evict.as_ref()) {
            let evict = AssertUnwindSafe(|| on_evict(key, entry.value));

            if panic::catch_unwind(evict).is_err() {
                warn!(generation, "eviction callback panicked");
            }
        }

        Sweep::Evicted
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + 'static,
{
    /// # Panics
    ///
    /// Panics if the sweeper thread cannot be spawned, see [`try_new`](Cache::try_new).
    pub fn new(ttl: Duration) -> Self {
        Self::build(ttl, None)
            .unwrap_or_else(|err| panic!("failed to spawn the cache sweeper: {}", err))
    }

    pub fn try_new(ttl: Duration) -> io::Result<Self> {
        Self::build(ttl, None)
    }

    /// Like [`new`](Cache::new), calling `on_evict` with every entry that expires.
    pub fn with_eviction<F>(ttl: Duration, on_evict: F) -> Self
    where
        F: Fn(&K, V) + Send + Sync + 'static,
    {
        Self::build(ttl, Some(Box::new(on_evict)))
            .unwrap_or_else(|err| panic!("failed to spawn the cache sweeper: {}", err))
    }

    fn build(ttl: Duration, on_evict: Option<EvictFn<K, V>>) -> io::Result<Self> {
        let inner = Arc::new(Inner {
            entries: Monitor::new(HashMap::new()),
            ttl,
            on_evict,
            generation: AtomicU64::new(0),
        });
        let (schedule, scheduled) = unbounded();

        Sweeper {
            inner: Arc::downgrade(&inner),
            scheduled,
            queue: BinaryHeap::new(),
        }
        .spawn()?;
        debug!(?ttl, "cache created");

        Ok(Self { inner, schedule })
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Insert or replace the value of `key`, resetting its expiry.
    pub fn set(&self, key: K, value: V) {
        let mut entries = self.inner.entries.capture();
        let now = Instant::now();

        if let Some(entry) = entries.get_mut(&key) {
            entry.value = value;
            entry.last_activity = now;
            return;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);

        entries.insert(
            key.clone(),
            Entry {
                value,
                last_activity: now,
                generation,
            },
        );

        let deadline = Deadline {
            at: now + self.inner.ttl,
            generation,
            key,
        };

        // an entry nobody will expire must not stay
        if let Err(unscheduled) = self.schedule.send(deadline) {
            warn!(generation, "cache sweeper is gone, entry dropped");
            entries.remove(&unscheduled.into_inner().key);
        }
    }

    /// Look up `key`, counting the lookup as activity.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.entries.access(|entries| {
            entries.get_mut(key).map(|entry| {
                entry.last_activity = Instant::now();
                entry.value.clone()
            })
        })
    }

    /// Drop `key` right away. The eviction callback is not called.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner
            .entries
            .access(|entries| entries.remove(key))
            .map(|entry| entry.value)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.access(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owns the cache's deadline queue, earliest deadline first.
struct Sweeper<K, V> {
    inner: Weak<Inner<K, V>>,
    scheduled: Receiver<Deadline<K>>,
    queue: BinaryHeap<Reverse<Deadline<K>>>,
}

impl<K, V> Sweeper<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + 'static,
{
    fn spawn(self) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("cache-sweeper".into())
            .spawn(move || self.run())
    }

    fn run(mut self) {
        loop {
            let received = match self.queue.peek() {
                Some(Reverse(next)) => self.scheduled.recv_deadline(next.at),
                None => self
                    .scheduled
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(deadline) => self.queue.push(Reverse(deadline)),
                Err(RecvTimeoutError::Timeout) => {
                    if !self.sweep_due() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        debug!(pending = self.queue.len(), "cache sweeper exiting");
    }

    // returns false once the cache itself is gone
    fn sweep_due(&mut self) -> bool {
        let inner = match self.inner.upgrade() {
            Some(inner) => inner,
            None => return false,
        };
        let now = Instant::now();

        while let Some(Reverse(next)) = self.queue.peek() {
            if next.at > now {
                break;
            }

            let Reverse(deadline) = match self.queue.pop() {
                Some(deadline) => deadline,
                None => break,
            };

            match inner.sweep(&deadline.key, deadline.generation) {
                Sweep::Gone => {}
                Sweep::Evicted => trace!(generation = deadline.generation, "cache entry expired"),
                Sweep::Alive(remaining) => self.queue.push(Reverse(Deadline {
                    at: now + remaining,
                    ..deadline
                })),
            }
        }

        true
    }
}
