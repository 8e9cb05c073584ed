//! Field kinds and their zero values.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use super::Shape;

/// The kind of a single field in a [`Shape`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    /// Untyped JSON; zero value is `null`.
    Any,
    Object(Shape),
    Array(Box<FieldKind>),
    /// String-keyed map of values of the inner kind.
    Record(Box<FieldKind>),
    Tuple(Vec<FieldKind>),
    /// Zero value comes from the first variant.
    Union(Vec<FieldKind>),
    Enum(Vec<Value>),
    Literal(Value),
    /// Absent by default.
    Optional(Box<FieldKind>),
    Nullable(Box<FieldKind>),
    /// Inner kind with an explicit default value.
    Default(Box<FieldKind>, Value),
}

impl FieldKind {
    pub fn array(inner: FieldKind) -> Self {
        FieldKind::Array(Box::new(inner))
    }

    pub fn record(inner: FieldKind) -> Self {
        FieldKind::Record(Box::new(inner))
    }

    pub fn optional(inner: FieldKind) -> Self {
        FieldKind::Optional(Box::new(inner))
    }

    pub fn nullable(inner: FieldKind) -> Self {
        FieldKind::Nullable(Box::new(inner))
    }

    pub fn with_default(inner: FieldKind, value: Value) -> Self {
        FieldKind::Default(Box::new(inner), value)
    }

    /// Returns the value used to seed a new record for this kind.
    ///
    /// `None` means the field is left out of the seeded record entirely
    /// (optional fields).
    pub fn zero(&self) -> Option<Value> {
        match self {
            FieldKind::String => Some(Value::String(String::new())),
            FieldKind::Number => Some(Value::from(0)),
            FieldKind::Boolean => Some(Value::Bool(false)),
            FieldKind::Any => Some(Value::Null),
            FieldKind::Object(shape) => Some(shape.defaults()),
            FieldKind::Array(_) => Some(Value::Array(Vec::new())),
            FieldKind::Record(_) => Some(Value::Object(Map::new())),
            FieldKind::Tuple(items) => Some(Value::Array(
                items
                    .iter()
                    .map(|kind| kind.zero().unwrap_or(Value::Null))
                    .collect(),
            )),
            FieldKind::Union(variants) => Some(
                variants
                    .first()
                    .and_then(FieldKind::zero)
                    .unwrap_or(Value::Null),
            ),
            FieldKind::Enum(values) => Some(values.first().cloned().unwrap_or(Value::Null)),
            FieldKind::Literal(value) => Some(value.clone()),
            FieldKind::Optional(_) => None,
            FieldKind::Nullable(_) => Some(Value::Null),
            FieldKind::Default(_, value) => Some(value.clone()),
        }
    }

    /// The object shape reachable through wrappers and containers, if any.
    pub fn nested_shape(&self) -> Option<&Shape> {
        match self {
            FieldKind::Object(shape) => Some(shape),
            FieldKind::Array(inner)
            | FieldKind::Record(inner)
            | FieldKind::Optional(inner)
            | FieldKind::Nullable(inner)
            | FieldKind::Default(inner, _) => inner.nested_shape(),
            _ => None,
        }
    }
}

/// Rust types that map onto a [`FieldKind`].
///
/// Implemented for primitives, std containers and every type deriving
/// [`Shape`](crate::Shape).
pub trait ShapeField {
    fn kind() -> FieldKind;
}

macro_rules! number_fields {
    ($($ty:ty),*) => {
        $(impl ShapeField for $ty {
            fn kind() -> FieldKind {
                FieldKind::Number
            }
        })*
    };
}

number_fields!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl ShapeField for String {
    fn kind() -> FieldKind {
        FieldKind::String
    }
}

impl ShapeField for char {
    fn kind() -> FieldKind {
        FieldKind::String
    }
}

impl ShapeField for bool {
    fn kind() -> FieldKind {
        FieldKind::Boolean
    }
}

impl ShapeField for Value {
    fn kind() -> FieldKind {
        FieldKind::Any
    }
}

impl<T: ShapeField> ShapeField for Option<T> {
    fn kind() -> FieldKind {
        FieldKind::optional(T::kind())
    }
}

impl<T: ShapeField> ShapeField for Vec<T> {
    fn kind() -> FieldKind {
        FieldKind::array(T::kind())
    }
}

impl<T: ShapeField> ShapeField for Box<T> {
    fn kind() -> FieldKind {
        T::kind()
    }
}

impl<T: ShapeField> ShapeField for HashMap<String, T> {
    fn kind() -> FieldKind {
        FieldKind::record(T::kind())
    }
}

impl<T: ShapeField> ShapeField for BTreeMap<String, T> {
    fn kind() -> FieldKind {
        FieldKind::record(T::kind())
    }
}

macro_rules! tuple_fields {
    ($(($($name:ident),+)),*) => {
        $(impl<$($name: ShapeField),+> ShapeField for ($($name,)+) {
            fn kind() -> FieldKind {
                FieldKind::Tuple(vec![$($name::kind()),+])
            }
        })*
    };
}

tuple_fields!((A, B), (A, B, C), (A, B, C, D));
