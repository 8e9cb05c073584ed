//! Per-call options for [`Action::execute`](super::Action::execute).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::definition::Concurrency;
use super::error::ActionError;
use super::signal::AbortSignal;
use super::state::{ActionStatus, StateRef};
use crate::commit::CommitMode;
use crate::transport::Request;

type RequestTransformer = Arc<dyn Fn(Request) -> Request + Send + Sync>;
type ResponseTransformer = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Caller-owned cells an invocation reports to instead of the action's own.
#[derive(Debug, Clone, Default)]
pub struct Bind {
    pub status: StateRef<ActionStatus>,
    pub error: StateRef<Option<ActionError>>,
}

impl Bind {
    pub fn new(status: StateRef<ActionStatus>, error: StateRef<Option<ActionError>>) -> Self {
        Self { status, error }
    }
}

/// Call-time hooks around the transport.
#[derive(Clone, Default)]
pub struct Transformer {
    pub(crate) request: Option<RequestTransformer>,
    pub(crate) response: Option<ResponseTransformer>,
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("request", &self.request.is_some())
            .field("response", &self.response.is_some())
            .finish()
    }
}

/// Options for one invocation. Call-time values win over the definition's.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub(crate) payload: Value,
    pub(crate) params: BTreeMap<String, String>,
    pub(crate) query: Option<Value>,
    pub(crate) headers: Option<Value>,
    pub(crate) body: Option<Value>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) signal: Option<AbortSignal>,
    pub(crate) concurrent: Option<Concurrency>,
    pub(crate) transformer: Transformer,
    pub(crate) bind: Option<Bind>,
    pub(crate) commit_mode: Option<CommitMode>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input handed to resolvers and handlers.
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Fills the `:name` segment of the path.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    pub fn headers(mut self, headers: Value) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses the caller's signal instead of the action's own, opting the call
    /// out of `abort()` and CANCEL.
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn concurrent(mut self, policy: Concurrency) -> Self {
        self.concurrent = Some(policy);
        self
    }

    pub fn transform_request<F>(mut self, transform: F) -> Self
    where
        F: Fn(Request) -> Request + Send + Sync + 'static,
    {
        self.transformer.request = Some(Arc::new(transform));
        self
    }

    pub fn transform_response<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transformer.response = Some(Arc::new(transform));
        self
    }

    pub fn bind(mut self, bind: Bind) -> Self {
        self.bind = Some(bind);
        self
    }

    /// Overrides the mode of the definition's commit template.
    pub fn commit_mode(mut self, mode: CommitMode) -> Self {
        self.commit_mode = Some(mode);
        self
    }
}
