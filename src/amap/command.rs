use std::collections::HashMap;

use crossbeam_channel::Receiver;

use super::pending::Completion;

pub(crate) type Job<K, V> = Box<dyn FnOnce(&mut HashMap<K, V>) + Send>;

/// One request for the worker, carrying the write side of its completion signal.
pub(crate) enum Command<K, V> {
    Get {
        key: K,
        done: Completion<V>,
    },
    /// The value itself follows on `value` once the worker reaches this command.
    Set {
        key: K,
        value: Receiver<V>,
        done: Completion<()>,
    },
    Delete {
        key: K,
        done: Completion<()>,
    },
    Release {
        key: K,
        done: Completion<V>,
    },
    Len {
        done: Completion<usize>,
    },
    List {
        done: Completion<(K, V)>,
    },
    SetPair {
        pairs: Receiver<(K, V)>,
    },
    /// The job owns its own completion and fills it with the closure's result.
    Batch {
        job: Job<K, V>,
    },
}

impl<K, V> Command<K, V> {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
            Command::Delete { .. } => "delete",
            Command::Release { .. } => "release",
            Command::Len { .. } => "len",
            Command::List { .. } => "list",
            Command::SetPair { .. } => "set_pair",
            Command::Batch { .. } => "batch",
        }
    }
}
