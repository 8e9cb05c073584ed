//! Store - one named instance wiring models, views and actions to a
//! state container.
//!
//! ## Example
//!
//! ```ignore
//! use actionstore::{ApiDefinition, CommitMode, CommitTemplate, ModelDefinition, Store};
//!
//! let store = Store::builder("todos")
//!     .config(StoreConfig::new().endpoint("https://api.example.com"))
//!     .model(ModelDefinition::many("todos").shape_of::<Todo>())
//!     .action(
//!         "fetch",
//!         ApiDefinition::get("/todos").commit(CommitTemplate::new("todos", CommitMode::Set)),
//!     )
//!     .build()?;
//!
//! store.action("fetch")?.execute(CallOptions::new()).await?;
//! let todos: Vec<Todo> = store.model("todos")?.get_as()?;
//! ```

mod config;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::action::{Action, ActionDefinition};
use crate::commit::CommitInstruction;
use crate::container::{InMemoryContainer, StateContainer};
use crate::error::StoreError;
use crate::model::{Model, ModelDefinition, ModelEngine, MutationError};
use crate::transport::Transport;
use crate::view::{View, ViewDefinition};

#[cfg(feature = "emitter")]
use crate::emitter::{ChangeEmitter, ChangeEvent};

pub use config::{ConfigError, StoreConfig};

/// Shared state behind every handle of one store.
pub(crate) struct StoreCore {
    name: String,
    config: StoreConfig,
    container: Arc<dyn StateContainer>,
    models: HashMap<String, ModelEngine>,
    views: HashMap<String, View>,
    transport: Option<Arc<dyn Transport>>,
    #[cfg(feature = "emitter")]
    emitter: ChangeEmitter,
}

impl StoreCore {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref()
    }

    pub(crate) fn engine(&self, model: &str) -> Result<&ModelEngine, StoreError> {
        self.models
            .get(model)
            .ok_or_else(|| StoreError::UnknownModel(model.to_string()))
    }

    pub(crate) fn view(&self, name: &str) -> Result<View, StoreError> {
        self.views
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownView(name.to_string()))
    }

    pub(crate) fn read(&self, model: &str) -> Result<Arc<Value>, StoreError> {
        self.engine(model)?;
        let snapshot = self
            .container
            .snapshot(model)?
            .ok_or_else(|| StoreError::UnknownModel(model.to_string()))?;
        Ok(snapshot.value)
    }

    /// Routes a commit instruction to its model's engine.
    pub(crate) fn apply(&self, instruction: &CommitInstruction) -> Result<u64, MutationError> {
        let engine = self
            .models
            .get(&instruction.model)
            .ok_or_else(|| MutationError::UnknownModel(instruction.model.clone()))?;
        let revision = engine.apply(self.container.as_ref(), instruction)?;

        #[cfg(feature = "emitter")]
        self.emitter.emit(ChangeEvent {
            model: instruction.model.clone(),
            mode: instruction.mode,
            revision,
        });

        Ok(revision)
    }
}

/// Builder for a [`Store`]. Definitions are validated in [`build`](Self::build).
pub struct StoreBuilder {
    name: String,
    config: StoreConfig,
    container: Option<Arc<dyn StateContainer>>,
    transport: Option<Arc<dyn Transport>>,
    models: Vec<ModelDefinition>,
    views: Vec<ViewDefinition>,
    actions: Vec<(String, ActionDefinition)>,
}

impl StoreBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: StoreConfig::default(),
            container: None,
            transport: None,
            models: Vec::new(),
            views: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Backs the store with `container` instead of a fresh in-memory one.
    /// A container holds the state of one store only.
    pub fn container(mut self, container: Arc<dyn StateContainer>) -> Self {
        self.container = Some(container);
        self
    }

    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn model(mut self, definition: ModelDefinition) -> Self {
        self.models.push(definition);
        self
    }

    pub fn view(mut self, definition: ViewDefinition) -> Self {
        self.views.push(definition);
        self
    }

    pub fn action(mut self, name: impl Into<String>, definition: impl Into<ActionDefinition>) -> Self {
        self.actions.push((name.into(), definition.into()));
        self
    }

    /// Registers every definition and seeds model state.
    pub fn build(self) -> Result<Store, StoreError> {
        let container = self
            .container
            .unwrap_or_else(|| Arc::new(InMemoryContainer::new()));

        let mut models = HashMap::new();
        for definition in self.models {
            let engine = ModelEngine::new(definition);
            if models.contains_key(engine.name()) {
                return Err(StoreError::DuplicateName {
                    kind: "model",
                    name: engine.name().to_string(),
                });
            }
            container.insert(engine.name(), engine.initial())?;
            models.insert(engine.name().to_string(), engine);
        }

        let mut views = HashMap::new();
        for definition in self.views {
            if let Some(missing) = definition.sources.iter().find(|s| !models.contains_key(*s)) {
                return Err(StoreError::ViewSource {
                    view: definition.name.clone(),
                    model: missing.clone(),
                });
            }
            if views.contains_key(&definition.name) {
                return Err(StoreError::DuplicateName {
                    kind: "view",
                    name: definition.name,
                });
            }
            let name = definition.name.clone();
            views.insert(name, View::new(definition, Arc::clone(&container)));
        }

        let transport = self.transport.or_else(default_transport);
        for (name, definition) in &self.actions {
            if let Some(template) = definition.commit() {
                let engine = models.get(&template.model).ok_or_else(|| StoreError::CommitTarget {
                    action: name.clone(),
                    model: template.model.clone(),
                })?;
                if !engine.kind().allows(template.mode) {
                    return Err(StoreError::IllegalCommitMode {
                        action: name.clone(),
                        model: template.model.clone(),
                        mode: template.mode,
                        kind: engine.kind(),
                    });
                }
            }
            if matches!(definition, ActionDefinition::Api(_)) && transport.is_none() {
                return Err(StoreError::MissingTransport(name.clone()));
            }
        }

        let core = Arc::new(StoreCore {
            name: self.name,
            config: self.config,
            container,
            models,
            views,
            transport,
            #[cfg(feature = "emitter")]
            emitter: ChangeEmitter::new(),
        });

        let mut actions = HashMap::new();
        for (name, definition) in self.actions {
            if actions.contains_key(&name) {
                return Err(StoreError::DuplicateName { kind: "action", name });
            }
            let action = Action::new(name.clone(), definition, Arc::clone(&core));
            actions.insert(name, action);
        }

        tracing::debug!(
            store = %core.name,
            models = core.models.len(),
            views = core.views.len(),
            actions = actions.len(),
            "store assembled"
        );

        Ok(Store { core, actions })
    }
}

#[cfg(feature = "http")]
fn default_transport() -> Option<Arc<dyn Transport>> {
    Some(Arc::new(crate::transport::HttpTransport::new()))
}

#[cfg(not(feature = "http"))]
fn default_transport() -> Option<Arc<dyn Transport>> {
    None
}

/// An assembled store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Store {
    core: Arc<StoreCore>,
    actions: HashMap<String, Action>,
}

impl Store {
    pub fn builder(name: impl Into<String>) -> StoreBuilder {
        StoreBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn config(&self) -> &StoreConfig {
        self.core.config()
    }

    pub fn container(&self) -> Arc<dyn StateContainer> {
        Arc::clone(&self.core.container)
    }

    pub fn model(&self, name: &str) -> Result<Model, StoreError> {
        Model::new(Arc::clone(&self.core), name)
    }

    pub fn view(&self, name: &str) -> Result<View, StoreError> {
        self.core.view(name)
    }

    pub fn action(&self, name: &str) -> Result<Action, StoreError> {
        self.actions
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownAction(name.to_string()))
    }

    /// Applies a commit instruction directly.
    pub fn commit(&self, instruction: &CommitInstruction) -> Result<u64, StoreError> {
        Ok(self.core.apply(instruction)?)
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.core.models.keys().map(String::as_str).collect()
    }

    pub fn action_names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    /// Listens to every change. Returns the listener id.
    #[cfg(feature = "emitter")]
    pub fn on_change<F>(&self, listener: F) -> String
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        self.core.emitter.on(crate::emitter::CHANGE, listener)
    }

    /// Listens to changes of one model. Returns the listener id.
    #[cfg(feature = "emitter")]
    pub fn on_model_change<F>(&self, model: &str, listener: F) -> Result<String, StoreError>
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        self.core.engine(model)?;
        Ok(self.core.emitter.on(&crate::emitter::change_of(model), listener))
    }

    #[cfg(feature = "emitter")]
    pub fn remove_listener(&self, id: &str) -> bool {
        self.core.emitter.remove(id)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.core.name)
            .field("models", &self.model_names())
            .field("views", &self.core.views.keys().collect::<Vec<_>>())
            .field("actions", &self.action_names())
            .finish()
    }
}
