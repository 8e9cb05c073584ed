//! Models - declared units of state and the mutation engine behind them.
//!
//! A model is either a single optional object ([`ModelKind::One`]), a
//! collection ([`ModelKind::Many`]) or a collection grouped by key
//! ([`ModelKind::Grouped`]). State is only changed through
//! `set / reset / patch / add / remove`, whether called directly on a
//! [`Model`] handle or through a commit instruction from an action.
//!
//! ## Example
//!
//! ```ignore
//! use actionstore::{ModelDefinition, CommitOptions};
//!
//! let store = Store::builder("app")
//!     .model(ModelDefinition::many("todos").shape_of::<Todo>())
//!     .build()?;
//!
//! let todos = store.model("todos")?;
//! todos.add(&todo, CommitOptions::new().unique())?;
//! todos.patch(json!({ "id": 1, "done": true }), CommitOptions::new())?;
//! todos.remove(json!({ "id": 1 }), CommitOptions::new())?;
//! ```

mod engine;
mod handle;
pub(crate) mod merge;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::commit::{CommitMode, CommitOptions};
use crate::container::ContainerError;
use crate::error::BoxError;
use crate::shape::{HasShape, Shape};

pub(crate) use engine::ModelEngine;
pub use handle::Model;

/// The state layout of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// `S | null`
    One,
    /// `S[]`
    Many,
    /// `Record<string, S[]>`
    Grouped,
}

impl ModelKind {
    /// Zero value used when no default is declared.
    pub fn empty(self) -> Value {
        match self {
            ModelKind::One => Value::Null,
            ModelKind::Many => Value::Array(Vec::new()),
            ModelKind::Grouped => Value::Object(serde_json::Map::new()),
        }
    }

    pub fn allows(self, mode: CommitMode) -> bool {
        !matches!(
            (self, mode),
            (ModelKind::One, CommitMode::Add) | (ModelKind::One, CommitMode::Remove)
        )
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::One => "one",
            ModelKind::Many => "many",
            ModelKind::Grouped => "grouped",
        };
        f.write_str(name)
    }
}

/// When a hook runs relative to the mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Pre,
    Post,
}

/// What a mutation hook sees.
#[derive(Debug)]
pub struct HookEvent<'a> {
    pub model: &'a str,
    pub stage: HookStage,
    pub mode: CommitMode,
    pub value: &'a Value,
    pub options: &'a CommitOptions,
    /// State before the mutation for `Pre`, after it for `Post`.
    pub state: &'a Value,
}

/// Best-effort side channel run around mutations. Failures are logged.
pub type Hook = Arc<dyn Fn(&HookEvent<'_>) -> Result<(), BoxError> + Send + Sync>;

/// Declaration of one model.
#[derive(Clone)]
pub struct ModelDefinition {
    pub(crate) name: String,
    pub(crate) kind: ModelKind,
    pub(crate) shape: Option<Shape>,
    pub(crate) default: Option<Value>,
    pub(crate) identifier: Option<String>,
    pub(crate) pre: Option<Hook>,
    pub(crate) post: Option<Hook>,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            name: name.into(),
            kind,
            shape: None,
            default: None,
            identifier: None,
            pre: None,
            post: None,
        }
    }

    pub fn one(name: impl Into<String>) -> Self {
        Self::new(name, ModelKind::One)
    }

    pub fn many(name: impl Into<String>) -> Self {
        Self::new(name, ModelKind::Many)
    }

    pub fn grouped(name: impl Into<String>) -> Self {
        Self::new(name, ModelKind::Grouped)
    }

    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn shape_of<T: HasShape>(self) -> Self {
        self.shape(T::shape())
    }

    /// Initial state, restored by `reset`.
    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Identifier field used when the shape does not name one.
    pub fn identifier(mut self, field: impl Into<String>) -> Self {
        self.identifier = Some(field.into());
        self
    }

    pub fn pre<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HookEvent<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.pre = Some(Arc::new(hook));
        self
    }

    pub fn post<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HookEvent<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.post = Some(Arc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("shape", &self.shape)
            .field("default", &self.default)
            .field("identifier", &self.identifier)
            .field("pre", &self.pre.is_some())
            .field("post", &self.post.is_some())
            .finish()
    }
}

/// Error type for mutation operations.
///
/// Only structurally invalid calls fail; matching nothing is not an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    #[error("unknown model `{0}`")]
    UnknownModel(String),
    #[error("`{mode}` is not allowed on {kind} model `{model}`")]
    IllegalMode {
        model: String,
        mode: CommitMode,
        kind: ModelKind,
    },
    #[error("model `{model}` has no identifier to match `{mode}` items by")]
    MissingIdentifier { model: String, mode: CommitMode },
    #[error("`{mode}` on grouped model `{model}` requires a group")]
    MissingGroup { model: String, mode: CommitMode },
    #[error("invalid payload for `{mode}` on model `{model}`: {reason}")]
    InvalidPayload {
        model: String,
        mode: CommitMode,
        reason: String,
    },
    #[error("failed to serialize value for model `{model}`: {message}")]
    Serialize { model: String, message: String },
    #[error(transparent)]
    Container(#[from] ContainerError),
}
