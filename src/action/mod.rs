//! Actions - asynchronous operations that call an endpoint and/or run a
//! handler, then commit their result into a model.
//!
//! Each action keeps a small state machine:
//!
//! ```text
//! IDLE -> PENDING -> SUCCESS | ERROR -> (reset or next execute)
//! ```
//!
//! A call made while another invocation is running is arbitrated by the
//! [`Concurrency`] policy, resolved from the call options, then the
//! definition, then the store config.
//!
//! ## Example
//!
//! ```ignore
//! let store = Store::builder("app")
//!     .model(ModelDefinition::many("todos"))
//!     .action(
//!         "create",
//!         HandlerDefinition::new(create_todo)
//!             .concurrent(Concurrency::Skip)
//!             .commit(CommitTemplate::new("todos", CommitMode::Add)),
//!     )
//!     .build()?;
//!
//! let create = store.action("create")?;
//! create.execute(CallOptions::new().payload(json!({ "title": "write docs" }))).await?;
//! ```

mod context;
mod definition;
mod error;
mod options;
mod request;
mod runtime;
mod signal;
mod state;

pub use context::ActionContext;
pub use definition::{ActionDefinition, ApiDefinition, Concurrency, HandlerDefinition};
pub use error::{ActionError, ApiError, CommitError, ConcurrentError, HandlerError};
pub use options::{Bind, CallOptions, Transformer};
pub use runtime::Action;
pub use signal::{AbortController, AbortSignal};
pub use state::{ActionStatus, StateRef};
