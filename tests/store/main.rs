//! Store integration tests.

mod support;
mod views;
mod actions;
mod bindings;
