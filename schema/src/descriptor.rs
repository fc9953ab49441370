use serde::{Deserialize, Serialize};
use std::fmt;

/// The reserved wire key that carries an instance's exact type name.
pub const DEFAULT_DISCRIMINATOR: &str = "discriminator";

/// Scalar value kinds understood natively by the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Bool,
    Int,
    Float,
    String,
}

impl Primitive {
    /// The schema keyword for this primitive.
    pub fn keyword(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::String => "string",
        }
    }

    /// Looks up a primitive by its schema keyword.
    pub fn from_keyword(keyword: &str) -> Option<Primitive> {
        match keyword {
            "bool" => Some(Primitive::Bool),
            "int" => Some(Primitive::Int),
            "float" => Some(Primitive::Float),
            "string" => Some(Primitive::String),
            _ => None,
        }
    }
}

/// What a field holds.
///
/// `Object` values are owned by the enclosing instance and are written inline
/// with their own discriminator. `Reference` values point at another entry of
/// a model container and are written as that entry's identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    Primitive(Primitive),
    Enum(String),
    Object(String),
    Reference(String),
    Array(Box<ValueKind>),
}

impl ValueKind {
    /// The named type this kind refers to, looking through arrays.
    pub fn referenced_type(&self) -> Option<&str> {
        match self {
            ValueKind::Primitive(_) => None,
            ValueKind::Enum(name) | ValueKind::Object(name) | ValueKind::Reference(name) => {
                Some(name.as_str())
            }
            ValueKind::Array(inner) => inner.referenced_type(),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, ValueKind::Array(_))
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Primitive(p) => f.write_str(p.keyword()),
            ValueKind::Enum(name) | ValueKind::Object(name) => f.write_str(name),
            ValueKind::Reference(name) => write!(f, "ref {}", name),
            ValueKind::Array(inner) => write!(f, "{}[]", inner),
        }
    }
}

/// How a null field value is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullRule {
    /// Emit an explicit `null`.
    #[default]
    Include,
    /// Omit the property entirely.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name:       String,
    pub wire_name:  String,
    pub kind:       ValueKind,
    pub required:   bool,
    pub null_rule:  NullRule,
    pub identity:   bool,
    pub deprecated: bool,
}

impl FieldDescriptor {
    /// A required field whose wire name equals its in-memory name.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        let name = name.into();
        FieldDescriptor {
            wire_name:  name.clone(),
            name,
            kind,
            required:   true,
            null_rule:  NullRule::Include,
            identity:   false,
            deprecated: false,
        }
    }

    pub fn wire_name(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn ignore_null(mut self) -> Self {
        self.null_rule = NullRule::Ignore;
        self
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }
}

/// One member of an enumeration: the label written on the wire and its ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub label:   String,
    pub ordinal: i64,
}

impl EnumValue {
    pub fn new(label: impl Into<String>, ordinal: i64) -> Self {
        EnumValue { label: label.into(), ordinal }
    }
}

/// A named record or enumeration type.
///
/// Descriptors are declarative: `base` and every type named by a field are
/// plain names that a registry resolves when the descriptor is registered.
/// `fields` holds only the fields this type adds; inherited fields come from
/// the base chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescriptor {
    pub name:         String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base:         Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields:       Vec<FieldDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback:     Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values:  Option<Vec<EnumValue>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
}

impl TypeDescriptor {
    /// An empty record type with no base.
    pub fn record(name: impl Into<String>) -> Self {
        TypeDescriptor {
            name:         name.into(),
            base:         None,
            fields:       Vec::new(),
            fallback:     None,
            enum_values:  None,
            capabilities: Vec::new(),
        }
    }

    /// An enumeration type with the given `(label, ordinal)` members.
    pub fn enumeration(name: impl Into<String>, values: Vec<EnumValue>) -> Self {
        TypeDescriptor {
            enum_values: Some(values),
            ..TypeDescriptor::record(name)
        }
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fallback(mut self, target: impl Into<String>) -> Self {
        self.fallback = Some(target.into());
        self
    }

    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn is_enum(&self) -> bool {
        self.enum_values.is_some()
    }

    /// Finds one of this type's own fields by in-memory name.
    pub fn own_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Finds an enum member by wire label. Always `None` for record types.
    pub fn enum_value(&self, label: &str) -> Option<&EnumValue> {
        self.enum_values
            .as_ref()
            .and_then(|values| values.iter().find(|v| v.label == label))
    }
}
