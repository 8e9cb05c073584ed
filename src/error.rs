//! Store-level error types.

use thiserror::Error;

use crate::commit::CommitMode;
use crate::container::ContainerError;
use crate::model::{ModelKind, MutationError};

/// Boxed error returned by handlers and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for store assembly, lookups and direct model access.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("unknown model `{0}`")]
    UnknownModel(String),
    #[error("unknown view `{0}`")]
    UnknownView(String),
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("{kind} `{name}` is declared more than once")]
    DuplicateName { kind: &'static str, name: String },
    #[error("view `{view}` reads unknown model `{model}`")]
    ViewSource { view: String, model: String },
    #[error("action `{action}` commits to unknown model `{model}`")]
    CommitTarget { action: String, model: String },
    #[error("action `{action}` commits `{mode}` to {kind} model `{model}`")]
    IllegalCommitMode {
        action: String,
        model: String,
        mode: CommitMode,
        kind: ModelKind,
    },
    #[error("action `{0}` calls an endpoint but the store has no transport")]
    MissingTransport(String),
    #[error("failed to decode `{name}`: {message}")]
    Decode { name: String, message: String },
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error(transparent)]
    Container(#[from] ContainerError),
}
