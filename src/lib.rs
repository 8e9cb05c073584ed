//! Store runtime: declared models, memoized views, and async actions with
//! concurrency policies, cancellation and commit-based mutations.

extern crate self as actionstore;

pub mod action;
pub mod commit;
mod compose;
pub mod container;
#[cfg(feature = "emitter")]
pub mod emitter;
mod error;
pub mod model;
pub mod shape;
pub mod store;
pub mod transport;
pub mod view;

pub use action::{
    AbortController, AbortSignal, Action, ActionContext, ActionDefinition, ActionError,
    ActionStatus, ApiDefinition, ApiError, Bind, CallOptions, CommitError, Concurrency,
    ConcurrentError, HandlerDefinition, HandlerError, StateRef,
};
pub use commit::{CommitInstruction, CommitMode, CommitOptions, CommitTemplate, Silent};
pub use compose::{compose, Composed};
pub use container::{ContainerError, InMemoryContainer, StateContainer};
#[cfg(feature = "emitter")]
pub use emitter::ChangeEvent;
pub use error::{BoxError, StoreError};
pub use model::{HookEvent, HookStage, Model, ModelDefinition, ModelKind, MutationError};
pub use shape::{Field, FieldKind, HasShape, Shape, ShapeField};
pub use store::{ConfigError, Store, StoreBuilder, StoreConfig};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{Method, Request, Response, Transport, TransportError};
pub use view::{View, ViewDefinition};

pub use async_trait::async_trait;

// Derive macro for `HasShape`; shares its name with the `Shape` type.
pub use actionstore_macros::Shape;
