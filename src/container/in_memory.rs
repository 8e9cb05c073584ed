//! InMemoryContainer - HashMap-backed state container.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tokio::sync::watch;

use super::{ContainerError, Snapshot, StateContainer};

/// Internal stored representation of one key.
struct Slot {
    value: Arc<Value>,
    revision: u64,
}

struct Inner {
    slots: HashMap<String, Slot>,
    revision: u64,
}

/// In-memory container backed by a HashMap.
///
/// Values are kept behind `Arc` so snapshots are cheap; a mutation copies
/// the value only while an older snapshot is still alive. Clone-friendly:
/// clones share storage.
#[derive(Clone)]
pub struct InMemoryContainer {
    inner: Arc<RwLock<Inner>>,
    changes: Arc<watch::Sender<u64>>,
}

impl Default for InMemoryContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryContainer {
    /// Create a new empty container.
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(Inner {
                slots: HashMap::new(),
                revision: 0,
            })),
            changes: Arc::new(changes),
        }
    }

    fn notify(&self, revision: u64) {
        self.changes.send_replace(revision);
    }
}

impl StateContainer for InMemoryContainer {
    fn insert(&self, key: &str, value: Value) -> Result<u64, ContainerError> {
        let revision = {
            let mut inner = self
                .inner
                .write()
                .map_err(|_| ContainerError::LockPoisoned("insert"))?;
            inner.revision += 1;
            let revision = inner.revision;
            inner.slots.insert(
                key.to_string(),
                Slot {
                    value: Arc::new(value),
                    revision,
                },
            );
            revision
        };
        self.notify(revision);
        Ok(revision)
    }

    fn snapshot(&self, key: &str) -> Result<Option<Snapshot>, ContainerError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ContainerError::LockPoisoned("snapshot"))?;
        Ok(inner.slots.get(key).map(|slot| Snapshot {
            value: Arc::clone(&slot.value),
            revision: slot.revision,
        }))
    }

    fn revision(&self, key: &str) -> Result<Option<u64>, ContainerError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ContainerError::LockPoisoned("revision"))?;
        Ok(inner.slots.get(key).map(|slot| slot.revision))
    }

    fn mutate(
        &self,
        key: &str,
        mutation: &mut dyn FnMut(&mut Value),
    ) -> Result<u64, ContainerError> {
        let revision = {
            let mut inner = self
                .inner
                .write()
                .map_err(|_| ContainerError::LockPoisoned("mutate"))?;
            let next = inner.revision + 1;
            let slot = inner
                .slots
                .get_mut(key)
                .ok_or_else(|| ContainerError::UnknownKey(key.to_string()))?;
            mutation(Arc::make_mut(&mut slot.value));
            slot.revision = next;
            inner.revision = next;
            next
        };
        self.notify(revision);
        Ok(revision)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn keys(&self) -> Result<Vec<String>, ContainerError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ContainerError::LockPoisoned("keys"))?;
        Ok(inner.slots.keys().cloned().collect())
    }
}
