//! Shapes - declared record layouts for models.
//!
//! A [`Shape`] lists the fields of a record with their [`FieldKind`] and
//! optional metadata (identifier flag, wire alias). [`resolve`] turns a
//! shape into a [`ShapeInfo`]: the identifier field, a zero-value record,
//! field subsets and the alias table.
//!
//! ## Example
//!
//! ```ignore
//! use actionstore::{Shape, HasShape};
//!
//! #[derive(Serialize, Deserialize, Shape)]
//! struct User {
//!     #[shape(id)]
//!     uuid: String,
//!     #[shape(alias = "display-name")]
//!     name: String,
//! }
//!
//! let info = actionstore::shape::resolve(&User::shape(), None);
//! assert_eq!(info.identifier.as_deref(), Some("uuid"));
//! ```

mod alias;
mod kind;

use serde_json::{Map, Value};

pub use alias::Aliases;
pub use kind::{FieldKind, ShapeField};

/// Types with a declared record shape. Usually derived.
pub trait HasShape {
    fn shape() -> Shape;
}

/// A single declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub identifier: bool,
    pub alias: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            identifier: false,
            alias: None,
        }
    }

    /// Marks this field as the record identifier.
    pub fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }

    /// Sets the external (wire) name of this field.
    pub fn alias(mut self, wire: impl Into<String>) -> Self {
        self.alias = Some(wire.into());
        self
    }
}

/// Ordered set of fields describing a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    fields: Vec<Field>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shape of a type implementing [`HasShape`].
    pub fn of<T: HasShape>() -> Self {
        T::shape()
    }

    /// Adds a field. A field with the same name replaces the earlier one.
    pub fn field(mut self, field: Field) -> Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Zero-value record for this shape. Optional fields are omitted.
    pub fn defaults(&self) -> Value {
        let mut record = Map::new();
        for field in &self.fields {
            if let Some(value) = field.kind.zero() {
                record.insert(field.name.clone(), value);
            }
        }
        Value::Object(record)
    }
}

/// Named field subsets of a shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    /// Every declared field, in declaration order.
    pub all: Vec<String>,
    /// Every field except the identifier.
    pub writable: Vec<String>,
}

/// Which subset of fields to keep when projecting a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subset {
    All,
    Writable,
}

/// Everything derived from a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeInfo {
    pub identifier: Option<String>,
    pub defaults: Value,
    pub fields: FieldSet,
    pub aliases: Aliases,
}

impl ShapeInfo {
    /// Keeps only the keys of `value` that belong to `subset`.
    ///
    /// Arrays are projected element-wise; non-object values pass through.
    pub fn project(&self, value: &Value, subset: Subset) -> Value {
        let keep = match subset {
            Subset::All => &self.fields.all,
            Subset::Writable => &self.fields.writable,
        };
        match value {
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.project(item, subset)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter(|(key, _)| keep.iter().any(|k| k == *key))
                    .map(|(key, v)| (key.clone(), v.clone()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// Resolves a shape.
///
/// The identifier is the field flagged as identifier, else a field named
/// `id`, else a field named `_id`, else `identifier_override`.
pub fn resolve(shape: &Shape, identifier_override: Option<&str>) -> ShapeInfo {
    let identifier = shape
        .fields
        .iter()
        .find(|f| f.identifier)
        .or_else(|| shape.get("id"))
        .or_else(|| shape.get("_id"))
        .map(|f| f.name.clone())
        .or_else(|| identifier_override.map(str::to_string));

    let all: Vec<String> = shape.fields.iter().map(|f| f.name.clone()).collect();
    let writable = all
        .iter()
        .filter(|name| Some(name.as_str()) != identifier.as_deref())
        .cloned()
        .collect();

    ShapeInfo {
        identifier,
        defaults: shape.defaults(),
        fields: FieldSet { all, writable },
        aliases: Aliases::from_shape(shape),
    }
}
