//! State container - the reactive key/value store behind a [`Store`](crate::Store).
//!
//! A container holds one JSON value per key, bumps a revision on every
//! write and notifies subscribers. Models own their keys; nothing else
//! writes to them. [`Getter`] layers memoized derived reads on top.
//!
//! ## Example
//!
//! ```ignore
//! use actionstore::container::{InMemoryContainer, StateContainer, Getter};
//!
//! let container = Arc::new(InMemoryContainer::new());
//! container.insert("todos", json!([]))?;
//! container.mutate("todos", &mut |state| {
//!     if let Some(items) = state.as_array_mut() {
//!         items.push(json!({ "id": 1 }));
//!     }
//! })?;
//!
//! let count = Getter::new(container.clone(), ["todos"], |values| {
//!     values[0].as_array().map_or(0, Vec::len)
//! });
//! assert_eq!(*count.get()?, 1);
//! ```

mod getter;
mod in_memory;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;

pub use getter::Getter;
pub use in_memory::InMemoryContainer;

/// Error type for container operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error("container lock poisoned during {0}")]
    LockPoisoned(&'static str),
    #[error("no state registered under key `{0}`")]
    UnknownKey(String),
}

/// A value together with the revision it was read at.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub value: Arc<Value>,
    pub revision: u64,
}

/// Observable key/value state.
///
/// Mutations run synchronously and atomically against the current value of
/// a key. Every write advances a store-wide revision counter; the key's
/// revision is set to that counter, so revisions are unique and increasing.
pub trait StateContainer: Send + Sync {
    /// Registers (or replaces) the value under `key`.
    fn insert(&self, key: &str, value: Value) -> Result<u64, ContainerError>;

    /// Current value and revision of `key`, `None` if never inserted.
    fn snapshot(&self, key: &str) -> Result<Option<Snapshot>, ContainerError>;

    /// Current revision of `key` without touching the value.
    fn revision(&self, key: &str) -> Result<Option<u64>, ContainerError>;

    /// Runs `mutation` against the value under `key` and returns the new
    /// revision. Fails with `UnknownKey` if the key was never inserted.
    fn mutate(
        &self,
        key: &str,
        mutation: &mut dyn FnMut(&mut Value),
    ) -> Result<u64, ContainerError>;

    /// Receives the store-wide revision after every write.
    fn subscribe(&self) -> watch::Receiver<u64>;

    /// Registered keys, in no particular order.
    fn keys(&self) -> Result<Vec<String>, ContainerError>;
}
