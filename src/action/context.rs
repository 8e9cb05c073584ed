//! Context passed to handlers and request resolvers.
//!
//! Carries the call payload, the fetched response for API handlers, and a
//! reference to the store. Handlers reach models and views through it and
//! commit explicitly when the definition has no template.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{ActionError, CommitError, HandlerError};
use super::signal::AbortSignal;
use crate::commit::CommitInstruction;
use crate::error::StoreError;
use crate::model::Model;
use crate::store::StoreCore;
use crate::transport::Response;
use crate::view::View;

/// The context passed to every handler and resolver.
///
/// ## Example
///
/// ```ignore
/// async fn create(ctx: ActionContext) -> Result<Value, BoxError> {
///     let input = ctx.input::<NewTodo>()?;
///     let todo = json!({ "id": input.id, "title": input.title });
///     ctx.commit(CommitInstruction::new("todos", CommitMode::Add, todo.clone()))?;
///     Ok(todo)
/// }
/// ```
#[derive(Clone)]
pub struct ActionContext {
    core: Arc<StoreCore>,
    action: Arc<str>,
    payload: Value,
    signal: AbortSignal,
    api: Option<Arc<Response>>,
}

impl ActionContext {
    pub(crate) fn new(
        core: Arc<StoreCore>,
        action: Arc<str>,
        payload: Value,
        signal: AbortSignal,
    ) -> Self {
        Self {
            core,
            action,
            payload,
            signal,
            api: None,
        }
    }

    pub(crate) fn with_api(mut self, response: Response) -> Self {
        self.api = Some(Arc::new(response));
        self
    }

    /// Name of the action being run.
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Deserialize the payload into a typed struct.
    pub fn input<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        T::deserialize(&self.payload)
            .map_err(|e| HandlerError::new(format!("invalid payload: {e}")))
    }

    /// The already-fetched response of an API action.
    pub fn api(&self) -> Option<&Response> {
        self.api.as_deref()
    }

    /// Effective abort signal of this invocation.
    pub fn signal(&self) -> &AbortSignal {
        &self.signal
    }

    pub fn model(&self, name: &str) -> Result<Model, StoreError> {
        Model::new(Arc::clone(&self.core), name)
    }

    pub fn view(&self, name: &str) -> Result<View, StoreError> {
        self.core.view(name)
    }

    /// Current state of a model.
    pub fn state(&self, model: &str) -> Result<Arc<Value>, StoreError> {
        self.core.read(model)
    }

    /// Applies an instruction now. The value is taken as-is, in internal
    /// field names.
    pub fn commit(&self, instruction: CommitInstruction) -> Result<(), ActionError> {
        self.core.apply(&instruction).map_err(|e| CommitError {
            model: instruction.model.clone(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}
