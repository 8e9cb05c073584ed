use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::ModelKind;
use crate::commit::{CommitInstruction, CommitMode, CommitOptions};
use crate::error::StoreError;
use crate::shape::{FieldSet, Subset};
use crate::store::StoreCore;

/// Handle to one model of a store. Clones refer to the same state.
#[derive(Clone)]
pub struct Model {
    core: Arc<StoreCore>,
    name: String,
}

impl Model {
    pub(crate) fn new(core: Arc<StoreCore>, name: &str) -> Result<Self, StoreError> {
        core.engine(name)?;
        Ok(Self {
            core,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Result<ModelKind, StoreError> {
        Ok(self.core.engine(&self.name)?.kind())
    }

    /// The field items are matched by when no `by` is given.
    pub fn identifier(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .core
            .engine(&self.name)?
            .identifier()
            .map(str::to_string))
    }

    /// Field names of the shape, if the model declares one.
    pub fn fields(&self) -> Result<Option<FieldSet>, StoreError> {
        Ok(self
            .core
            .engine(&self.name)?
            .info()
            .map(|info| info.fields.clone()))
    }

    /// A zero-valued record of the model's shape, `null` without one.
    pub fn blank(&self) -> Result<Value, StoreError> {
        Ok(self
            .core
            .engine(&self.name)?
            .info()
            .map_or(Value::Null, |info| info.defaults.clone()))
    }

    /// Keeps only the fields of `subset`. Values pass through unchanged
    /// without a shape.
    pub fn project(&self, value: &Value, subset: Subset) -> Result<Value, StoreError> {
        Ok(match self.core.engine(&self.name)?.info() {
            Some(info) => info.project(value, subset),
            None => value.clone(),
        })
    }

    /// Converts a wire payload to internal field names.
    pub fn decode(&self, value: Value) -> Result<Value, StoreError> {
        Ok(match self.core.engine(&self.name)?.aliases() {
            Some(aliases) => aliases.decode(&value),
            None => value,
        })
    }

    /// Converts internal field names to their wire names.
    pub fn encode(&self, value: Value) -> Result<Value, StoreError> {
        Ok(match self.core.engine(&self.name)?.aliases() {
            Some(aliases) => aliases.encode(&value),
            None => value,
        })
    }

    /// Current state, shared with the container.
    pub fn get(&self) -> Result<Arc<Value>, StoreError> {
        self.core.read(&self.name)
    }

    pub fn get_as<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let value = self.get()?;
        T::deserialize(&*value).map_err(|e| StoreError::Decode {
            name: self.name.clone(),
            message: e.to_string(),
        })
    }

    pub fn set(&self, value: impl Serialize, options: CommitOptions) -> Result<(), StoreError> {
        self.write(CommitMode::Set, value, options)
    }

    /// Restores a fresh copy of the declared default.
    pub fn reset(&self, options: CommitOptions) -> Result<(), StoreError> {
        self.commit(
            CommitInstruction::new(&self.name, CommitMode::Reset, Value::Null).with_options(options),
        )
    }

    pub fn patch(&self, value: impl Serialize, options: CommitOptions) -> Result<(), StoreError> {
        self.write(CommitMode::Patch, value, options)
    }

    pub fn add(&self, value: impl Serialize, options: CommitOptions) -> Result<(), StoreError> {
        self.write(CommitMode::Add, value, options)
    }

    pub fn remove(&self, value: impl Serialize, options: CommitOptions) -> Result<(), StoreError> {
        self.write(CommitMode::Remove, value, options)
    }

    /// Applies an instruction addressed to this model.
    pub fn commit(&self, instruction: CommitInstruction) -> Result<(), StoreError> {
        let instruction = CommitInstruction {
            model: self.name.clone(),
            ..instruction
        };
        self.core.apply(&instruction)?;
        Ok(())
    }

    fn write(
        &self,
        mode: CommitMode,
        value: impl Serialize,
        options: CommitOptions,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|e| super::MutationError::Serialize {
            model: self.name.clone(),
            message: e.to_string(),
        })?;
        self.commit(CommitInstruction::new(&self.name, mode, value).with_options(options))
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model").field("name", &self.name).finish()
    }
}
