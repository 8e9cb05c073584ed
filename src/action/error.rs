//! Error taxonomy for action invocations.
//!
//! Every failure of [`Action::execute`](super::Action::execute) is one of
//! four kinds, all cloneable so the same error can be returned to the
//! caller and stored in the action's error cell.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::error::BoxError;
use crate::transport::TransportError;

/// The transport call failed. Status details are kept when the endpoint
/// answered at all.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub data: Option<Value>,
    /// The request was cancelled through its abort signal.
    pub aborted: bool,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            status_text: None,
            data: None,
            aborted: false,
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status {
                status,
                status_text,
                data,
            } => Self {
                message: format!("request failed with status {status} {status_text}"),
                status: Some(status),
                status_text: Some(status_text),
                data: Some(data),
                aborted: false,
            },
            TransportError::Aborted => Self {
                aborted: true,
                ..Self::new(TransportError::Aborted.to_string())
            },
            other => Self::new(other.to_string()),
        }
    }
}

/// Custom handler logic failed.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub(crate) fn from_boxed(err: BoxError) -> Self {
        Self {
            message: err.to_string(),
            cause: Some(Arc::from(err)),
        }
    }

    /// The error the handler returned, if it was not built from a message.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl PartialEq for HandlerError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

/// The result could not be committed to its target model.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("commit to `{model}` failed: {message}")]
pub struct CommitError {
    pub model: String,
    pub message: String,
}

/// The action was already running under the BLOCK policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("action `{action}` is already running")]
pub struct ConcurrentError {
    pub action: String,
}

/// Error type for action invocations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error(transparent)]
    Commit(#[from] CommitError),
    #[error(transparent)]
    Concurrent(#[from] ConcurrentError),
}

impl ActionError {
    /// Wraps an error returned by a handler. Typed action errors pass
    /// through unchanged; anything else becomes a [`HandlerError`].
    pub(crate) fn from_handler(err: BoxError) -> Self {
        let err = match err.downcast::<ActionError>() {
            Ok(typed) => return *typed,
            Err(err) => err,
        };
        let err = match err.downcast::<ApiError>() {
            Ok(api) => return ActionError::Api(*api),
            Err(err) => err,
        };
        let err = match err.downcast::<HandlerError>() {
            Ok(handler) => return ActionError::Handler(*handler),
            Err(err) => err,
        };
        match err.downcast::<CommitError>() {
            Ok(commit) => ActionError::Commit(*commit),
            Err(err) => ActionError::Handler(HandlerError::from_boxed(err)),
        }
    }

    pub fn is_concurrent(&self) -> bool {
        matches!(self, ActionError::Concurrent(_))
    }
}
