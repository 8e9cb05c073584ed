//! Applies commit instructions to one model's state.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;

use super::merge::{self, batch};
use super::{Hook, HookEvent, HookStage, ModelDefinition, ModelKind, MutationError};
use crate::commit::{CommitInstruction, CommitMode};
use crate::container::StateContainer;
use crate::shape::{self, Aliases, ShapeInfo};

/// Registered model: its definition resolved into what mutations need.
pub(crate) struct ModelEngine {
    name: String,
    kind: ModelKind,
    identifier: Option<String>,
    default: Value,
    info: Option<ShapeInfo>,
    pre: Option<Hook>,
    post: Option<Hook>,
}

impl ModelEngine {
    pub(crate) fn new(definition: ModelDefinition) -> Self {
        let info = definition
            .shape
            .as_ref()
            .map(|shape| shape::resolve(shape, definition.identifier.as_deref()));
        let identifier = match &info {
            Some(info) => info.identifier.clone(),
            None => Some(definition.identifier.unwrap_or_else(|| "id".to_string())),
        };
        let default = definition
            .default
            .unwrap_or_else(|| definition.kind.empty());

        Self {
            name: definition.name,
            kind: definition.kind,
            identifier,
            default,
            info,
            pre: definition.pre,
            post: definition.post,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn kind(&self) -> ModelKind {
        self.kind
    }

    pub(crate) fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub(crate) fn info(&self) -> Option<&ShapeInfo> {
        self.info.as_ref()
    }

    pub(crate) fn aliases(&self) -> Option<&Aliases> {
        self.info
            .as_ref()
            .map(|info| &info.aliases)
            .filter(|aliases| !aliases.is_empty())
    }

    /// A fresh copy of the declared default.
    pub(crate) fn initial(&self) -> Value {
        self.default.clone()
    }

    pub(crate) fn check_mode(&self, mode: CommitMode) -> Result<(), MutationError> {
        if self.kind.allows(mode) {
            Ok(())
        } else {
            Err(MutationError::IllegalMode {
                model: self.name.clone(),
                mode,
                kind: self.kind,
            })
        }
    }

    /// Applies `instruction` and returns the container revision it produced.
    pub(crate) fn apply(
        &self,
        container: &dyn StateContainer,
        instruction: &CommitInstruction,
    ) -> Result<u64, MutationError> {
        self.check_mode(instruction.mode)?;
        self.validate(instruction)?;

        let silent = instruction.options.silent;
        if silent.runs_pre() {
            if let Some(hook) = &self.pre {
                let state = self.current(container)?;
                self.run_hook(hook, HookStage::Pre, instruction, &state);
            }
        }

        let revision = container.mutate(&self.name, &mut |state| self.mutate(state, instruction))?;
        tracing::trace!(model = %self.name, mode = %instruction.mode, revision, "commit applied");

        if silent.runs_post() {
            if let Some(hook) = &self.post {
                let state = self.current(container)?;
                self.run_hook(hook, HookStage::Post, instruction, &state);
            }
        }

        Ok(revision)
    }

    fn current(&self, container: &dyn StateContainer) -> Result<Value, MutationError> {
        Ok(container
            .snapshot(&self.name)?
            .map(|snapshot| (*snapshot.value).clone())
            .unwrap_or(Value::Null))
    }

    fn match_key<'a>(&'a self, instruction: &'a CommitInstruction) -> Option<&'a str> {
        instruction
            .options
            .by
            .as_deref()
            .or(self.identifier.as_deref())
    }

    /// Structural checks. Everything that can fail is checked here so the
    /// mutation itself never has to.
    fn validate(&self, instruction: &CommitInstruction) -> Result<(), MutationError> {
        let mode = instruction.mode;
        let value = &instruction.value;
        let invalid = |reason: &str| MutationError::InvalidPayload {
            model: self.name.clone(),
            mode,
            reason: reason.to_string(),
        };

        match (self.kind, mode) {
            (_, CommitMode::Reset) => Ok(()),
            (ModelKind::One, CommitMode::Set) => Ok(()),
            (ModelKind::Many, CommitMode::Set) if !value.is_array() => {
                Err(invalid("expected an array"))
            }
            (ModelKind::Grouped, CommitMode::Set) => {
                let conforming = value
                    .as_object()
                    .is_some_and(|groups| groups.values().all(Value::is_array));
                if conforming {
                    Ok(())
                } else {
                    Err(invalid("expected an object of arrays"))
                }
            }
            (_, CommitMode::Set) => Ok(()),
            (ModelKind::One, CommitMode::Patch) => {
                if batch(value).iter().all(|partial| partial.is_object()) {
                    Ok(())
                } else {
                    Err(invalid("expected an object or an array of objects"))
                }
            }
            (_, CommitMode::Patch) => {
                if self.match_key(instruction).is_none() {
                    return Err(MutationError::MissingIdentifier {
                        model: self.name.clone(),
                        mode,
                    });
                }
                self.require_group(instruction)
            }
            (ModelKind::Grouped, CommitMode::Add) if instruction.options.group.is_none() => {
                if value.is_object() {
                    Ok(())
                } else {
                    Err(invalid("expected an object of group name to items"))
                }
            }
            (ModelKind::Grouped, CommitMode::Remove) => self.require_group(instruction),
            _ => Ok(()),
        }
    }

    fn require_group(&self, instruction: &CommitInstruction) -> Result<(), MutationError> {
        if self.kind == ModelKind::Grouped && instruction.options.group.is_none() {
            return Err(MutationError::MissingGroup {
                model: self.name.clone(),
                mode: instruction.mode,
            });
        }
        Ok(())
    }

    fn mutate(&self, state: &mut Value, instruction: &CommitInstruction) {
        let options = &instruction.options;
        let value = &instruction.value;
        let key = self.match_key(instruction);

        match instruction.mode {
            CommitMode::Set => *state = value.clone(),
            CommitMode::Reset => *state = self.initial(),
            CommitMode::Patch => {
                let partials = batch(value);
                match (self.kind, key, options.group.as_deref()) {
                    (ModelKind::One, _, _) => {
                        // Patch never creates a missing singleton.
                        if !state.is_null() {
                            for partial in partials {
                                merge::merge(state, partial, options.deep);
                            }
                        }
                    }
                    (ModelKind::Many, Some(key), _) => merge::with_list(state, |items| {
                        merge::patch_items(items, &partials, key, options.deep)
                    }),
                    (ModelKind::Grouped, Some(key), Some(group)) => {
                        merge::with_bucket(state, group, false, |items| {
                            merge::patch_items(items, &partials, key, options.deep)
                        })
                    }
                    _ => {}
                }
            }
            CommitMode::Add => {
                let add = |items: &mut Vec<Value>, incoming: &Value| {
                    let incoming = batch(incoming).into_iter().cloned().collect();
                    merge::add_items(items, incoming, key, options.prepend, options.unique)
                };
                match (self.kind, options.group.as_deref()) {
                    (ModelKind::Many, _) => merge::with_list(state, |items| add(items, value)),
                    (ModelKind::Grouped, Some(group)) => {
                        merge::with_bucket(state, group, true, |items| add(items, value))
                    }
                    (ModelKind::Grouped, None) => {
                        if let Some(groups) = value.as_object() {
                            for (group, incoming) in groups {
                                merge::with_bucket(state, group, true, |items| add(items, incoming));
                            }
                        }
                    }
                    (ModelKind::One, _) => {}
                }
            }
            CommitMode::Remove => {
                let matchers = batch(value);
                match (self.kind, options.group.as_deref()) {
                    (ModelKind::Many, _) => merge::with_list(state, |items| {
                        merge::remove_items(items, &matchers, key)
                    }),
                    (ModelKind::Grouped, Some(group)) => {
                        merge::with_bucket(state, group, false, |items| {
                            merge::remove_items(items, &matchers, key)
                        })
                    }
                    _ => {}
                }
            }
        }
    }

    fn run_hook(
        &self,
        hook: &Hook,
        stage: HookStage,
        instruction: &CommitInstruction,
        state: &Value,
    ) {
        let event = HookEvent {
            model: &self.name,
            stage,
            mode: instruction.mode,
            value: &instruction.value,
            options: &instruction.options,
            state,
        };
        match catch_unwind(AssertUnwindSafe(|| hook(&event))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(model = %self.name, ?stage, error = %err, "mutation hook failed")
            }
            Err(_) => tracing::warn!(model = %self.name, ?stage, "mutation hook panicked"),
        }
    }
}
