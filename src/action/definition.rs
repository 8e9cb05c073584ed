//! Action declarations.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::context::ActionContext;
use crate::commit::CommitTemplate;
use crate::error::BoxError;
use crate::transport::Method;

/// What happens when an action is invoked while already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Concurrency {
    /// Reject the new call with a `ConcurrentError`.
    #[default]
    Block,
    /// Return the result of the running invocation.
    Skip,
    /// Abort every running invocation and start a new one.
    Cancel,
    /// Start a new invocation alongside the running ones.
    Allow,
}

pub(crate) type Handler =
    Arc<dyn Fn(ActionContext) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync>;

pub(crate) type Resolver = Arc<dyn Fn(&ActionContext) -> Value + Send + Sync>;

fn boxed_handler<F, Fut>(handler: F) -> Handler
where
    F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    Arc::new(move |ctx| handler(ctx).boxed())
}

/// A request part given either as a value or computed per call.
#[derive(Clone)]
pub(crate) enum Resolvable {
    Value(Value),
    Resolver(Resolver),
}

impl Resolvable {
    pub(crate) fn resolve(&self, ctx: &ActionContext) -> Value {
        match self {
            Resolvable::Value(value) => value.clone(),
            Resolvable::Resolver(resolver) => resolver(ctx),
        }
    }
}

impl fmt::Debug for Resolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolvable::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolvable::Resolver(_) => f.write_str("Resolver"),
        }
    }
}

/// An action backed by a remote endpoint.
///
/// ## Example
///
/// ```ignore
/// ApiDefinition::get("/users/:id")
///     .headers(json!({ "accept": "application/json" }))
///     .timeout(Duration::from_secs(5))
///     .commit(CommitTemplate::new("users", CommitMode::Add).with_options(CommitOptions::new().unique()))
/// ```
#[derive(Clone)]
pub struct ApiDefinition {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: Option<Resolvable>,
    pub(crate) query: Option<Resolvable>,
    pub(crate) body: Option<Resolvable>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) concurrent: Option<Concurrency>,
    pub(crate) commit: Option<CommitTemplate>,
    pub(crate) handler: Option<Handler>,
}

impl ApiDefinition {
    /// `path` may contain `:name` segments filled from call params.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: None,
            query: None,
            body: None,
            timeout: None,
            concurrent: None,
            commit: None,
            handler: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn head(path: impl Into<String>) -> Self {
        Self::new(Method::Head, path)
    }

    pub fn headers(mut self, headers: Value) -> Self {
        self.headers = Some(Resolvable::Value(headers));
        self
    }

    pub fn headers_with<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&ActionContext) -> Value + Send + Sync + 'static,
    {
        self.headers = Some(Resolvable::Resolver(Arc::new(resolver)));
        self
    }

    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(Resolvable::Value(query));
        self
    }

    pub fn query_with<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&ActionContext) -> Value + Send + Sync + 'static,
    {
        self.query = Some(Resolvable::Resolver(Arc::new(resolver)));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(Resolvable::Value(body));
        self
    }

    pub fn body_with<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&ActionContext) -> Value + Send + Sync + 'static,
    {
        self.body = Some(Resolvable::Resolver(Arc::new(resolver)));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn concurrent(mut self, policy: Concurrency) -> Self {
        self.concurrent = Some(policy);
        self
    }

    pub fn commit(mut self, template: CommitTemplate) -> Self {
        self.commit = Some(template);
        self
    }

    /// Post-processes the response, available as `ctx.api()`. The handler's
    /// return value becomes the action result.
    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        self.handler = Some(boxed_handler(handler));
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for ApiDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiDefinition")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("concurrent", &self.concurrent)
            .field("commit", &self.commit)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// An action running custom logic only.
#[derive(Clone)]
pub struct HandlerDefinition {
    pub(crate) handler: Handler,
    pub(crate) concurrent: Option<Concurrency>,
    pub(crate) commit: Option<CommitTemplate>,
}

impl HandlerDefinition {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        Self {
            handler: boxed_handler(handler),
            concurrent: None,
            commit: None,
        }
    }

    pub fn concurrent(mut self, policy: Concurrency) -> Self {
        self.concurrent = Some(policy);
        self
    }

    pub fn commit(mut self, template: CommitTemplate) -> Self {
        self.commit = Some(template);
        self
    }
}

impl fmt::Debug for HandlerDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDefinition")
            .field("concurrent", &self.concurrent)
            .field("commit", &self.commit)
            .finish_non_exhaustive()
    }
}

/// Declaration of one action: an API call or a handler, never both.
#[derive(Debug, Clone)]
pub enum ActionDefinition {
    Api(ApiDefinition),
    Handler(HandlerDefinition),
}

impl ActionDefinition {
    pub fn concurrent(&self) -> Option<Concurrency> {
        match self {
            ActionDefinition::Api(api) => api.concurrent,
            ActionDefinition::Handler(handler) => handler.concurrent,
        }
    }

    pub fn commit(&self) -> Option<&CommitTemplate> {
        match self {
            ActionDefinition::Api(api) => api.commit.as_ref(),
            ActionDefinition::Handler(handler) => handler.commit.as_ref(),
        }
    }
}

impl From<ApiDefinition> for ActionDefinition {
    fn from(definition: ApiDefinition) -> Self {
        ActionDefinition::Api(definition)
    }
}

impl From<HandlerDefinition> for ActionDefinition {
    fn from(definition: HandlerDefinition) -> Self {
        ActionDefinition::Handler(definition)
    }
}
