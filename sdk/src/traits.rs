//! Traits implemented by generated code.

use elementum_schema::{Id, TypeDescriptor};

use crate::{error::ModelError, instance::Instance, value::Value};

/// A generated record wrapper around an [`Instance`].
pub trait Entity: Sized {
    const TYPE_NAME: &'static str;

    fn descriptor() -> TypeDescriptor;

    /// Wraps `instance` without checking its type.
    fn from_instance_unchecked(instance: Instance) -> Self;

    fn into_instance(self) -> Instance;

    fn as_instance(&self) -> &Instance;

    /// Wraps `instance` if it is a `TYPE_NAME` or derives from it.
    fn from_instance(instance: Instance) -> Result<Self, ModelError> {
        if instance.is_a(Self::TYPE_NAME) {
            Ok(Self::from_instance_unchecked(instance))
        } else {
            Err(ModelError::mismatch(Self::TYPE_NAME, Self::TYPE_NAME, instance.type_name()))
        }
    }
}

/// A generated enumeration.
pub trait EnumEntity: Sized + Copy {
    const TYPE_NAME: &'static str;

    fn descriptor() -> TypeDescriptor;

    fn label(&self) -> &'static str;

    fn ordinal(&self) -> i64;

    fn from_label(label: &str) -> Result<Self, ModelError>;
}

/// Typed reads out of a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ModelError>;
}

fn expected(what: &str, value: &Value) -> ModelError {
    ModelError::mismatch("value", what, value.kind_name())
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ModelError> {
        match *value {
            Value::Bool(b) => Ok(b),
            _ => Err(expected("bool", value)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, ModelError> {
        match *value {
            Value::Int(n) => Ok(n),
            _ => Err(expected("int", value)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ModelError> {
        match *value {
            Value::Float(x) => Ok(x),
            Value::Int(n) => Ok(n as f64),
            _ => Err(expected("float", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ModelError> {
        match *value {
            Value::String(ref text) => Ok(text.clone()),
            _ => Err(expected("string", value)),
        }
    }
}

impl FromValue for Id {
    fn from_value(value: &Value) -> Result<Self, ModelError> {
        match *value {
            Value::Ref(ref id) => Ok(id.clone()),
            _ => Err(expected("ref", value)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, ModelError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, ModelError> {
        match *value {
            Value::Array(ref items) => items.iter().map(T::from_value).collect(),
            _ => Err(expected("array", value)),
        }
    }
}

/// `FromValue` body for generated record wrappers.
pub fn entity_from_value<T: Entity>(value: &Value) -> Result<T, ModelError> {
    match *value {
        Value::Object(ref instance) => T::from_instance(instance.as_ref().clone()),
        _ => Err(expected(T::TYPE_NAME, value)),
    }
}

/// `FromValue` body for generated enumerations.
pub fn enum_from_value<T: EnumEntity>(value: &Value) -> Result<T, ModelError> {
    match *value {
        Value::Enum(ref name, ref label) if name == T::TYPE_NAME => T::from_label(label),
        _ => Err(expected(T::TYPE_NAME, value)),
    }
}

/// `From<T> for Value` body for generated enumerations.
pub fn enum_to_value<T: EnumEntity>(value: &T) -> Value {
    Value::Enum(T::TYPE_NAME.to_string(), value.label().to_string())
}
