use std::{
    collections::HashMap,
    hash::Hash,
    io,
    panic::{self, AssertUnwindSafe},
    sync::Weak,
    thread,
};

use crossbeam_channel::Receiver;
use tracing::{debug, trace, warn};

use super::{command::Command, Shared};

/// The only owner of the map's storage.
///
/// Commands are taken off the queue one at a time and each one runs to
/// completion before the next is looked at.
pub(crate) struct Worker<K, V> {
    map: HashMap<K, V>,
    commands: Receiver<Command<K, V>>,
    // handed to set_pair forwarders so they can submit through the facade
    shared: Weak<Shared<K, V>>,
}

impl<K, V> Worker<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    pub(crate) fn new(commands: Receiver<Command<K, V>>, shared: Weak<Shared<K, V>>) -> Self {
        Self {
            map: HashMap::new(),
            commands,
            shared,
        }
    }

    pub(crate) fn spawn(self) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("amap-worker".into())
            .spawn(move || self.run())
    }

    fn run(mut self) {
        debug!("amap worker started");

        // ends once every sender is gone and the queue is drained
        while let Ok(command) = self.commands.recv() {
            trace!(command = command.name(), len = self.map.len(), "processing");
            self.process(command);
        }

        debug!(len = self.map.len(), "amap worker exiting");
    }

    fn process(&mut self, command: Command<K, V>) {
        match command {
            Command::Get { key, done } => match self.map.get(&key) {
                Some(value) => done.complete(value.clone()),
                None => done.close(),
            },
            Command::Set { key, value, done } => match value.recv() {
                Ok(value) => {
                    self.map.insert(key, value);
                    done.complete(());
                }
                Err(_) => {
                    trace!("value sink dropped before sending, set skipped");
                    done.close();
                }
            },
            Command::Delete { key, done } => {
                self.map.remove(&key);
                done.complete(());
            }
            Command::Release { key, done } => match self.map.remove(&key) {
                Some(value) => done.complete(value),
                None => done.close(),
            },
            Command::Len { done } => done.complete(self.map.len()),
            Command::List { done } => {
                for (key, value) in self.map.iter() {
                    if !done.feed((key.clone(), value.clone())) {
                        trace!("list reader went away");
                        break;
                    }
                }
            }
            Command::SetPair { pairs } => self.spawn_forwarder(pairs),
            Command::Batch { job } => {
                let map = &mut self.map;

                // the job's completion is dropped while unwinding, so the caller sees `None`
                if panic::catch_unwind(AssertUnwindSafe(move || job(map))).is_err() {
                    warn!("batch job panicked, map may be partially updated");
                }
            }
        }
    }

    fn spawn_forwarder(&self, pairs: Receiver<(K, V)>) {
        let shared = self.shared.clone();

        let spawned = thread::Builder::new()
            .name("amap-set-pair".into())
            .spawn(move || forward(pairs, shared));

        if let Err(err) = spawned {
            warn!(%err, "failed to spawn set_pair forwarder, stream dropped");
        }
    }
}

/// Turn every incoming pair into an ordinary set on the same map.
fn forward<K, V>(pairs: Receiver<(K, V)>, shared: Weak<Shared<K, V>>)
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    for (key, value) in pairs.iter() {
        let shared = match shared.upgrade() {
            Some(shared) => shared,
            None => break,
        };

        if let Err(err) = shared.insert(key, value) {
            warn!(%err, "set_pair stream stopped");
            break;
        }
    }

    trace!("set_pair stream finished");
}
