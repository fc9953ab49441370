use std::fmt;
use std::ops::Index;

use elementum_schema::{Id, Primitive, ValueKind};

use crate::instance::Instance;

/// A dynamically typed field value.
///
/// `Object` holds a nested instance owned by its parent. `Ref` holds the
/// identifier of another entry of a model container and is resolved through
/// that container, never through a pointer.
#[derive(Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Enum type name and label.
    Enum(String, String),
    Array(Vec<Value>),
    Object(Box<Instance>),
    Ref(Id),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A convenience method to extract the value out of a [Bool](#variant.Bool).
    /// Returns `false` for other value kinds.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(value) => value,
            _ => false,
        }
    }

    /// Returns `0` for other value kinds.
    pub fn as_int(&self) -> i64 {
        match *self {
            Value::Int(value) => value,
            _ => 0,
        }
    }

    /// Integers widen to floats. Returns `0.0` for other value kinds.
    pub fn as_float(&self) -> f64 {
        match *self {
            Value::Float(value) => value,
            Value::Int(value) => value as f64,
            _ => 0.0,
        }
    }

    /// The text of a [String](#variant.String), the label of an
    /// [Enum](#variant.Enum) or the identifier of a [Ref](#variant.Ref).
    /// Returns `""` for other value kinds.
    pub fn as_string(&self) -> &str {
        match *self {
            Value::String(ref value) => value.as_str(),
            Value::Enum(_, ref label) => label.as_str(),
            Value::Ref(ref id) => id.as_str(),
            _ => "",
        }
    }

    /// Returns an empty slice for other value kinds.
    pub fn as_array(&self) -> &[Value] {
        match *self {
            Value::Array(ref values) => values.as_slice(),
            _ => &[],
        }
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match *self {
            Value::Object(ref instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_ref_id(&self) -> Option<&Id> {
        match *self {
            Value::Ref(ref id) => Some(id),
            _ => None,
        }
    }

    /// A convenience method to extract the length out of an [Array](#variant.Array).
    /// Returns `0` for other value kinds.
    pub fn len(&self) -> usize {
        match *self {
            Value::Array(ref values) => values.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A convenience method to append to an [Array](#variant.Array). Does
    /// nothing for other value kinds.
    pub fn push(&mut self, value: Value) {
        if let Value::Array(ref mut values) = *self {
            values.push(value);
        }
    }

    /// A convenience method to read a field of an [Object](#variant.Object).
    /// Returns `None` for other value kinds or unknown field names.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match *self {
            Value::Object(ref instance) => instance.get(name).ok(),
            _ => None,
        }
    }

    /// Short description of what this value holds, for error messages.
    pub fn kind_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::String(_) => "string".to_string(),
            Value::Enum(name, _) => name.clone(),
            Value::Array(_) => "array".to_string(),
            Value::Object(instance) => instance.type_name().to_string(),
            Value::Ref(_) => "ref".to_string(),
        }
    }

    /// Whether this (non-null) value may be stored in a slot of `kind`.
    /// Nested objects must be instances of the slot type or a subtype.
    pub fn fits(&self, kind: &ValueKind) -> bool {
        match (kind, self) {
            (ValueKind::Primitive(Primitive::Bool), Value::Bool(_)) => true,
            (ValueKind::Primitive(Primitive::Int), Value::Int(_)) => true,
            (ValueKind::Primitive(Primitive::Float), Value::Float(_) | Value::Int(_)) => true,
            (ValueKind::Primitive(Primitive::String), Value::String(_)) => true,
            (ValueKind::Enum(expected), Value::Enum(name, _)) => expected == name,
            (ValueKind::Object(expected), Value::Object(instance)) => instance.is_a(expected),
            (ValueKind::Reference(_), Value::Ref(_)) => true,
            (ValueKind::Array(inner), Value::Array(items)) => {
                items.iter().all(|item| !item.is_null() && item.fits(inner))
            }
            _ => false,
        }
    }
}

impl Index<usize> for Value {
    type Output = Value;

    /// A convenience method that adds support for `self[index]` expressions.
    /// It will panic if this value isn't an [Array](#variant.Array) or if the
    /// provided index is out of bounds.
    fn index(&self, index: usize) -> &Value {
        match *self {
            Value::Array(ref values) => &values[index],
            _ => panic!("indexing a non-array value"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Null => f.write_str("null"),
            Value::Bool(value) => value.fmt(f),
            Value::Int(value) => value.fmt(f),
            Value::Float(value) => value.fmt(f),
            Value::String(ref value) => value.fmt(f),
            Value::Enum(ref name, ref label) => write!(f, "{}::{}", name, label),
            Value::Array(ref values) => values.fmt(f),
            Value::Object(ref instance) => instance.fmt(f),
            Value::Ref(ref id) => write!(f, "&{}", id),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<Id> for Value {
    fn from(value: Id) -> Self {
        Value::Ref(value)
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Value::Object(Box::new(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}
