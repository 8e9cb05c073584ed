//! Observable cells for action status and errors.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Lifecycle of an action invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionStatus::Idle => "idle",
            ActionStatus::Pending => "pending",
            ActionStatus::Success => "success",
            ActionStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// A shared, observable value. Clones point at the same cell.
///
/// Callers create their own cells and pass them through
/// [`Bind`](super::Bind) to isolate an invocation's status from the
/// action's own.
pub struct StateRef<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for StateRef<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StateRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateRef").field(&*self.tx.borrow()).finish()
    }
}

impl<T: Default> Default for StateRef<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> StateRef<T> {
    pub fn new(value: T) -> Self {
        let (tx, _rx) = watch::channel(value);
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Edits the value in place under the cell's lock; subscribers are
    /// woken only when `f` returns true.
    pub(crate) fn modify(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// True if both handles point at the same cell.
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }
}

impl<T: Clone> StateRef<T> {
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }
}
