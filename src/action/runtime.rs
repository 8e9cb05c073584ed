//! Action runtime - arbitration, execution and status tracking.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tokio::sync::watch;

use super::context::ActionContext;
use super::definition::{ActionDefinition, Concurrency, Handler};
use super::error::{ActionError, ApiError, CommitError, ConcurrentError, HandlerError};
use super::options::CallOptions;
use super::request;
use super::signal::{AbortController, AbortSignal};
use super::state::{ActionStatus, StateRef};
use crate::commit::CommitTemplate;
use crate::store::StoreCore;

type SharedResult = Shared<BoxFuture<'static, Result<Value, ActionError>>>;

struct Invocation {
    controller: AbortController,
    result: SharedResult,
    bound: bool,
}

#[derive(Default)]
struct Flight {
    generation: u64,
    /// Generation of the newest invocation reporting to the action's own cells.
    latest: u64,
    running: BTreeMap<u64, Invocation>,
}

struct Inner {
    name: Arc<str>,
    definition: ActionDefinition,
    core: Arc<StoreCore>,
    status: StateRef<ActionStatus>,
    error: StateRef<Option<ActionError>>,
    last_data: StateRef<Option<Value>>,
    flight: Mutex<Flight>,
}

/// Cells one invocation reports to.
#[derive(Clone)]
struct Target {
    status: StateRef<ActionStatus>,
    error: StateRef<Option<ActionError>>,
    bound: bool,
}

/// Handle to a registered action. Clones share runtime state.
///
/// ## Example
///
/// ```ignore
/// let fetch = store.action("fetch")?;
/// let todos = fetch
///     .execute(CallOptions::new().param("id", 7).query(json!({ "page": 2 })))
///     .await?;
/// assert_eq!(fetch.status(), ActionStatus::Success);
/// ```
#[derive(Clone)]
pub struct Action {
    inner: Arc<Inner>,
}

impl Action {
    pub(crate) fn new(name: String, definition: ActionDefinition, core: Arc<StoreCore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                definition,
                core,
                status: StateRef::default(),
                error: StateRef::default(),
                last_data: StateRef::default(),
                flight: Mutex::new(Flight::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn definition(&self) -> &ActionDefinition {
        &self.inner.definition
    }

    pub fn status(&self) -> ActionStatus {
        self.inner.status.get()
    }

    pub fn error(&self) -> Option<ActionError> {
        self.inner.error.get()
    }

    /// Result of the last successful invocation.
    pub fn last_data(&self) -> Option<Value> {
        self.inner.last_data.get()
    }

    /// True while any invocation is running.
    pub fn is_pending(&self) -> bool {
        !self.inner.flight().running.is_empty()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ActionStatus> {
        self.inner.status.subscribe()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<ActionError>> {
        self.inner.error.subscribe()
    }

    /// Aborts every running invocation that uses the action's own signal.
    pub fn abort(&self) {
        let flight = self.inner.flight();
        for invocation in flight.running.values() {
            invocation.controller.abort();
        }
        tracing::warn!(action = %self.inner.name, running = flight.running.len(), "action aborted");
    }

    /// Back to IDLE with no error or data. Running invocations keep going.
    pub fn reset(&self) {
        self.inner.status.set(ActionStatus::Idle);
        self.inner.error.set(None);
        self.inner.last_data.set(None);
    }

    /// Runs the action under its concurrency policy.
    ///
    /// Arbitration happens when `execute` is called, before the returned
    /// future is first polled, so back-to-back calls are ordered as issued.
    /// The invocation runs as its own task and completes even if the
    /// returned future is dropped.
    pub fn execute(
        &self,
        options: CallOptions,
    ) -> impl Future<Output = Result<Value, ActionError>> + Send + 'static {
        let launch = self.inner.launch(options);
        async move {
            tokio::task::yield_now().await;
            match launch {
                Launch::Blocked(err) => Err(err),
                Launch::Join(result) => result.await,
            }
        }
    }
}

enum Launch {
    Blocked(ActionError),
    Join(SharedResult),
}

impl Inner {
    fn flight(&self) -> MutexGuard<'_, Flight> {
        self.flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn launch(self: &Arc<Self>, options: CallOptions) -> Launch {
        let policy = options
            .concurrent
            .or_else(|| self.definition.concurrent())
            .unwrap_or(self.core.config().concurrency);
        let target = match &options.bind {
            Some(bind) => Target {
                status: bind.status.clone(),
                error: bind.error.clone(),
                bound: true,
            },
            None => Target {
                status: self.status.clone(),
                error: self.error.clone(),
                bound: false,
            },
        };

        let mut flight = self.flight();
        let running = flight
            .running
            .last_key_value()
            .map(|(_, invocation)| invocation.result.clone());
        match (running, policy) {
            (Some(_), Concurrency::Block) => {
                tracing::debug!(action = %self.name, "blocked: already running");
                let err = ActionError::Concurrent(ConcurrentError {
                    action: self.name.to_string(),
                });
                // A running unbound invocation will report to the own cells;
                // otherwise nobody else touches them.
                let owned = flight.running.values().any(|invocation| !invocation.bound);
                if target.bound || !owned {
                    target.status.set(ActionStatus::Error);
                }
                target.error.set(Some(err.clone()));
                Launch::Blocked(err)
            }
            (Some(result), Concurrency::Skip) => {
                tracing::debug!(action = %self.name, "skipped: joining running invocation");
                Launch::Join(result)
            }
            (running, policy) => {
                if running.is_some() && policy == Concurrency::Cancel {
                    tracing::debug!(
                        action = %self.name,
                        running = flight.running.len(),
                        "cancelling running invocations"
                    );
                    for invocation in flight.running.values() {
                        invocation.controller.abort();
                    }
                }
                Launch::Join(self.start(&mut flight, options, target, policy))
            }
        }
    }

    /// Spawns a new invocation. Runs under the flight lock so the slot is
    /// registered before the task can release it.
    fn start(
        self: &Arc<Self>,
        flight: &mut Flight,
        options: CallOptions,
        target: Target,
        policy: Concurrency,
    ) -> SharedResult {
        flight.generation += 1;
        let generation = flight.generation;
        if !target.bound {
            flight.latest = generation;
        }
        target.status.set(ActionStatus::Pending);
        target.error.set(None);

        let controller = AbortController::new();
        let signal = options
            .signal
            .clone()
            .unwrap_or_else(|| controller.signal());
        tracing::debug!(action = %self.name, generation, ?policy, "invocation started");

        let bound = target.bound;
        let task = tokio::spawn(Arc::clone(self).run(generation, options, target, signal));
        let name = Arc::clone(&self.name);
        let result = async move {
            task.await.unwrap_or_else(|err| {
                Err(ActionError::Handler(HandlerError::new(format!(
                    "action `{name}` task failed: {err}"
                ))))
            })
        }
        .boxed()
        .shared();

        flight.running.insert(
            generation,
            Invocation {
                controller,
                result: result.clone(),
                bound,
            },
        );
        result
    }

    async fn run(
        self: Arc<Self>,
        generation: u64,
        options: CallOptions,
        target: Target,
        signal: AbortSignal,
    ) -> Result<Value, ActionError> {
        let _slot = Release {
            inner: Arc::clone(&self),
            generation,
        };

        let outcome = self.invoke(&options, signal).await;
        self.report(generation, &target, &outcome);
        outcome
    }

    async fn invoke(&self, options: &CallOptions, signal: AbortSignal) -> Result<Value, ActionError> {
        let ctx = ActionContext::new(
            Arc::clone(&self.core),
            Arc::clone(&self.name),
            options.payload.clone(),
            signal.clone(),
        );

        let data = match &self.definition {
            ActionDefinition::Api(api) => {
                let request = request::build(api, self.core.config(), &ctx, options, signal)?;
                let request = match &options.transformer.request {
                    Some(transform) => transform(request),
                    None => request,
                };
                let transport = self.core.transport().ok_or_else(|| {
                    ApiError::new(format!("action `{}` has no transport", self.name))
                })?;
                tracing::debug!(action = %self.name, method = %request.method, url = %request.url, "sending request");
                let response = transport.fetch(request).await.map_err(ApiError::from)?;
                match &api.handler {
                    Some(handler) => call(handler, ctx.with_api(response)).await?,
                    None => response.data,
                }
            }
            ActionDefinition::Handler(definition) => call(&definition.handler, ctx).await?,
        };

        let data = match &options.transformer.response {
            Some(transform) => transform(data),
            None => data,
        };

        if let Some(template) = self.definition.commit() {
            self.commit(template, &data, options)?;
        }
        Ok(data)
    }

    fn commit(
        &self,
        template: &CommitTemplate,
        data: &Value,
        options: &CallOptions,
    ) -> Result<(), CommitError> {
        let failed = |message: String| CommitError {
            model: template.model.clone(),
            message,
        };
        let engine = self
            .core
            .engine(&template.model)
            .map_err(|e| failed(e.to_string()))?;
        let value = match engine.aliases() {
            Some(aliases) => aliases.decode(data),
            None => data.clone(),
        };
        let instruction = template.instruction(value, options.commit_mode);
        self.core
            .apply(&instruction)
            .map_err(|e| failed(e.to_string()))?;
        Ok(())
    }

    /// Writes the outcome. The action's own cells only take the newest
    /// invocation's outcome; bound cells always take it.
    fn report(&self, generation: u64, target: &Target, outcome: &Result<Value, ActionError>) {
        let current = target.bound || self.flight().latest == generation;
        match outcome {
            Ok(data) => {
                tracing::debug!(action = %self.name, generation, "invocation succeeded");
                if current {
                    self.last_data.set(Some(data.clone()));
                    target.error.set(None);
                    target.status.set(ActionStatus::Success);
                }
            }
            Err(err) => {
                tracing::debug!(action = %self.name, generation, error = %err, "invocation failed");
                if current {
                    target.error.set(Some(err.clone()));
                    target.status.set(ActionStatus::Error);
                }
            }
        }
    }
}

async fn call(handler: &Handler, ctx: ActionContext) -> Result<Value, ActionError> {
    match AssertUnwindSafe(handler(ctx)).catch_unwind().await {
        Ok(result) => result.map_err(ActionError::from_handler),
        Err(_) => Err(ActionError::Handler(HandlerError::new("handler panicked"))),
    }
}

/// Frees the in-flight slot however the invocation ends.
struct Release {
    inner: Arc<Inner>,
    generation: u64,
}

impl Drop for Release {
    fn drop(&mut self) {
        self.inner.flight().running.remove(&self.generation);
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.inner.name)
            .field("status", &self.status())
            .field("pending", &self.is_pending())
            .finish()
    }
}
