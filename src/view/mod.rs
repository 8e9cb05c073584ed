//! Views - memoized read-only projections of one or more models.
//!
//! A view names its source models and a pure resolver. The resolver runs
//! on the first read and again only after a source model changed.
//!
//! ## Example
//!
//! ```ignore
//! let store = Store::builder("app")
//!     .model(ModelDefinition::many("todos"))
//!     .view(ViewDefinition::from("open", "todos").resolve(|todos| {
//!         let open: Vec<Value> = todos
//!             .as_array()
//!             .into_iter()
//!             .flatten()
//!             .filter(|todo| todo["done"] == false)
//!             .cloned()
//!             .collect();
//!         Value::Array(open)
//!     }))
//!     .build()?;
//!
//! let open = store.view("open")?.get()?;
//! ```

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::container::{Getter, StateContainer};
use crate::error::StoreError;

type Resolver = Arc<dyn Fn(&[Arc<Value>]) -> Value + Send + Sync>;

/// Declaration of one view.
#[derive(Clone)]
pub struct ViewDefinition {
    pub(crate) name: String,
    pub(crate) sources: Vec<String>,
    pub(crate) resolver: Option<Resolver>,
}

impl ViewDefinition {
    /// A view over a single model. Without a resolver it returns the raw state.
    pub fn from(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: vec![model.into()],
            resolver: None,
        }
    }

    /// A view over several models, resolved together.
    pub fn merge<M, F>(name: impl Into<String>, models: M, resolver: F) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        F: Fn(&[Arc<Value>]) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            sources: models.into_iter().map(Into::into).collect(),
            resolver: Some(Arc::new(resolver)),
        }
    }

    /// Like [`merge`](Self::merge), but the resolver owns copies of the
    /// sources and may change them freely.
    pub fn merge_owned<M, F>(name: impl Into<String>, models: M, resolver: F) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        F: Fn(Vec<Value>) -> Value + Send + Sync + 'static,
    {
        Self::merge(name, models, move |values: &[Arc<Value>]| {
            resolver(values.iter().map(|value| (**value).clone()).collect())
        })
    }

    /// Resolver for a single-model view.
    pub fn resolve<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(move |values: &[Arc<Value>]| {
            values.first().map_or(Value::Null, |value| resolver(value))
        }));
        self
    }

    /// Resolver for a single-model view that takes an owned copy of the
    /// state, e.g. to sort or filter it in place.
    pub fn resolve_owned<F>(mut self, resolver: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(move |values: &[Arc<Value>]| {
            values
                .first()
                .map_or(Value::Null, |value| resolver((**value).clone()))
        }));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

impl fmt::Debug for ViewDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewDefinition")
            .field("name", &self.name)
            .field("sources", &self.sources)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Handle to a registered view. Clones share the memo.
#[derive(Clone)]
pub struct View {
    name: Arc<str>,
    getter: Arc<Getter<Value>>,
    container: Arc<dyn StateContainer>,
}

impl View {
    pub(crate) fn new(definition: ViewDefinition, container: Arc<dyn StateContainer>) -> Self {
        let ViewDefinition {
            name,
            sources,
            resolver,
        } = definition;

        let getter = Getter::new(Arc::clone(&container), sources, move |values| match &resolver {
            Some(resolver) => resolver(values),
            None => values.first().map_or(Value::Null, |value| (**value).clone()),
        });

        Self {
            name: name.into(),
            getter: Arc::new(getter),
            container,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[String] {
        self.getter.keys()
    }

    /// Current projection, recomputed only if a source changed.
    pub fn get(&self) -> Result<Arc<Value>, StoreError> {
        Ok(self.getter.get()?)
    }

    pub fn get_as<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let value = self.get()?;
        T::deserialize(&*value).map_err(|e| StoreError::Decode {
            name: self.name.to_string(),
            message: e.to_string(),
        })
    }

    /// Fires after every write to the store. Call [`get`](Self::get) to read
    /// the projection; it only recomputes when one of its sources moved.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.container.subscribe()
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("sources", &self.sources())
            .finish()
    }
}
