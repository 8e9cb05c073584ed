//! Field aliasing between in-memory names and wire names.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::{FieldKind, Shape};

/// Bidirectional rename table built from a shape's `alias` metadata.
///
/// Nested object fields (directly, or inside arrays, records and
/// optional/nullable wrappers) carry their own table keyed by the
/// in-memory field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aliases {
    to_wire: HashMap<String, String>,
    from_wire: HashMap<String, String>,
    nested: HashMap<String, Aliases>,
    /// Set on nested tables whose field holds a record of objects.
    record: bool,
}

impl Aliases {
    pub fn from_shape(shape: &Shape) -> Self {
        let mut aliases = Aliases::default();
        for field in shape.fields() {
            if let Some(wire) = &field.alias {
                aliases.to_wire.insert(field.name.clone(), wire.clone());
                aliases.from_wire.insert(wire.clone(), field.name.clone());
            }
            if let Some(inner) = field.kind.nested_shape() {
                let mut nested = Aliases::from_shape(inner);
                nested.record = is_record(&field.kind);
                if !nested.is_empty() {
                    aliases.nested.insert(field.name.clone(), nested);
                }
            }
        }
        aliases
    }

    pub fn is_empty(&self) -> bool {
        self.to_wire.is_empty() && self.nested.is_empty()
    }

    /// Wire name of an in-memory field (the field name itself when unaliased).
    pub fn wire_name<'a>(&'a self, field: &'a str) -> &'a str {
        self.to_wire.get(field).map(String::as_str).unwrap_or(field)
    }

    /// In-memory name of a wire key (the key itself when unaliased).
    pub fn field_name<'a>(&'a self, wire: &'a str) -> &'a str {
        self.from_wire.get(wire).map(String::as_str).unwrap_or(wire)
    }

    /// Renames in-memory keys to wire keys.
    pub fn encode(&self, value: &Value) -> Value {
        self.rename(value, Direction::ToWire)
    }

    /// Renames wire keys to in-memory keys.
    pub fn decode(&self, value: &Value) -> Value {
        self.rename(value, Direction::FromWire)
    }

    fn rename(&self, value: &Value, direction: Direction) -> Value {
        match value {
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.rename(item, direction)).collect())
            }
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, inner) in map {
                    let (renamed, field) = match direction {
                        Direction::ToWire => (self.wire_name(key), key.as_str()),
                        Direction::FromWire => {
                            let field = self.field_name(key);
                            (field, field)
                        }
                    };
                    let inner = match self.nested.get(field) {
                        Some(nested) => nested.rename_nested(inner, direction),
                        None => inner.clone(),
                    };
                    out.insert(renamed.to_string(), inner);
                }
                Value::Object(out)
            }
            other => other.clone(),
        }
    }

    fn rename_nested(&self, value: &Value, direction: Direction) -> Value {
        match value {
            Value::Object(map) if self.record => Value::Object(
                map.iter()
                    .map(|(key, inner)| (key.clone(), self.rename(inner, direction)))
                    .collect(),
            ),
            other => self.rename(other, direction),
        }
    }
}

fn is_record(kind: &FieldKind) -> bool {
    match kind {
        FieldKind::Record(_) => true,
        FieldKind::Optional(inner) | FieldKind::Nullable(inner) | FieldKind::Default(inner, _) => {
            is_record(inner)
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    ToWire,
    FromWire,
}
