//! Change notifications over `event-emitter-rs`.
//!
//! Every successful mutation emits a [`ChangeEvent`] under [`CHANGE`] and
//! under `change:<model>`. Listeners run on the emitter's own threads.

use std::sync::{Mutex, PoisonError};

use event_emitter_rs::EventEmitter;
use serde::{Deserialize, Serialize};

use crate::commit::CommitMode;

/// Event name fired for every model.
pub const CHANGE: &str = "change";

/// Event name fired for one model.
pub fn change_of(model: &str) -> String {
    format!("{CHANGE}:{model}")
}

/// Emitted after a mutation was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub model: String,
    pub mode: CommitMode,
    pub revision: u64,
}

pub(crate) struct ChangeEmitter {
    emitter: Mutex<EventEmitter>,
}

impl ChangeEmitter {
    pub(crate) fn new() -> Self {
        Self {
            emitter: Mutex::new(EventEmitter::new()),
        }
    }

    /// Registers `listener` under `event` and returns its id.
    pub(crate) fn on<F>(&self, event: &str, listener: F) -> String
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        self.emitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on(event, listener)
    }

    pub(crate) fn remove(&self, id: &str) -> bool {
        self.emitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove_listener(id)
            .is_some()
    }

    pub(crate) fn emit(&self, event: ChangeEvent) {
        let per_model = change_of(&event.model);
        let mut emitter = self.emitter.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = emitter.emit(&per_model, event.clone());
        let _ = emitter.emit(CHANGE, event);
    }
}
