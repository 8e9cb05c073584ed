//! Commit instructions - the single path by which values reach model state.
//!
//! Direct model calls and action results both end up as a
//! [`CommitInstruction`] applied by the mutation engine.
//!
//! ## Example
//!
//! ```ignore
//! // Static template on an action: every successful result is added to `todos`.
//! ApiDefinition::get("/todos").commit(CommitTemplate::new("todos", CommitMode::Set));
//!
//! // Explicit instruction inside a handler.
//! ctx.commit(
//!     CommitInstruction::new("todos", CommitMode::Add, json!({ "id": 1 }))
//!         .with_options(CommitOptions::new().prepend().unique()),
//! )?;
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a committed value is applied to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitMode {
    Set,
    Reset,
    Patch,
    Add,
    Remove,
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommitMode::Set => "set",
            CommitMode::Reset => "reset",
            CommitMode::Patch => "patch",
            CommitMode::Add => "add",
            CommitMode::Remove => "remove",
        };
        f.write_str(name)
    }
}

/// Which mutation hooks to suppress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Silent {
    #[default]
    None,
    /// Skip both hooks.
    All,
    Pre,
    Post,
}

impl Silent {
    pub(crate) fn runs_pre(self) -> bool {
        matches!(self, Silent::None | Silent::Post)
    }

    pub(crate) fn runs_post(self) -> bool {
        matches!(self, Silent::None | Silent::Pre)
    }
}

/// Per-commit options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitOptions {
    /// Field used to match items instead of the model identifier.
    pub by: Option<String>,
    /// `add`: insert the batch before existing items.
    pub prepend: bool,
    /// `add`: skip items whose key is already present.
    pub unique: bool,
    /// `patch`: recursive merge instead of top-level overwrite.
    pub deep: bool,
    pub silent: Silent,
    /// Grouped models: the bucket to operate on.
    pub group: Option<String>,
}

impl CommitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by(mut self, field: impl Into<String>) -> Self {
        self.by = Some(field.into());
        self
    }

    pub fn prepend(mut self) -> Self {
        self.prepend = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    pub fn silent(mut self, silent: Silent) -> Self {
        self.silent = silent;
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// A fully specified change to one model.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInstruction {
    pub model: String,
    pub mode: CommitMode,
    pub value: Value,
    pub options: CommitOptions,
}

impl CommitInstruction {
    pub fn new(model: impl Into<String>, mode: CommitMode, value: Value) -> Self {
        Self {
            model: model.into(),
            mode,
            value,
            options: CommitOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CommitOptions) -> Self {
        self.options = options;
        self
    }
}

/// Commit declared on an action definition; the value is the action result.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitTemplate {
    pub model: String,
    pub mode: CommitMode,
    pub options: CommitOptions,
}

impl CommitTemplate {
    pub fn new(model: impl Into<String>, mode: CommitMode) -> Self {
        Self {
            model: model.into(),
            mode,
            options: CommitOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CommitOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the instruction for `value`, with an optional per-call mode.
    pub fn instruction(&self, value: Value, mode: Option<CommitMode>) -> CommitInstruction {
        CommitInstruction {
            model: self.model.clone(),
            mode: mode.unwrap_or(self.mode),
            value,
            options: self.options.clone(),
        }
    }
}
