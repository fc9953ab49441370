// Generated by elementum. Do not edit.
pub mod shapes {
#![allow(unused_imports)]
use elementum::schema::{EnumValue, FieldDescriptor, Primitive, TypeDescriptor, ValueKind};
use elementum::{Context, Entity, EnumEntity, FromValue, Id, Instance, ModelError, Shell, TypeRegistry, Value};
use elementum::{entity_from_value, enum_from_value, enum_to_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Units {
    Meters,
    Feet,
}

impl EnumEntity for Units {
    const TYPE_NAME: &'static str = "Units";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::enumeration("Units", vec![
            EnumValue::new("METERS", 0),
            EnumValue::new("FEET", 1),
        ])
    }

    fn label(&self) -> &'static str {
        match self {
            Units::Meters => "METERS",
            Units::Feet => "FEET",
        }
    }

    fn ordinal(&self) -> i64 {
        match self {
            Units::Meters => 0,
            Units::Feet => 1,
        }
    }

    fn from_label(label: &str) -> Result<Self, ModelError> {
        match label {
            "METERS" => Ok(Units::Meters),
            "FEET" => Ok(Units::Feet),
            other => Err(ModelError::UnknownEnumValue {
                enum_name: Self::TYPE_NAME.to_string(),
                label:     other.to_string(),
            }),
        }
    }
}

impl From<Units> for Value {
    fn from(value: Units) -> Value {
        enum_to_value(&value)
    }
}

impl FromValue for Units {
    fn from_value(value: &Value) -> Result<Self, ModelError> {
        enum_from_value(value)
    }
}

/// The `Shape` record type.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape(Instance);

impl Shape {
    /// Full constructor; runs the validation hooks registered for this type.
    pub fn new(id: String, name: Option<String>) -> Result<Self, ModelError> {
        Self::new_in(Context::global(), id, name)
    }

    pub fn new_in(ctx: Context<'_>, id: String, name: Option<String>) -> Result<Self, ModelError> {
        let own = vec![Value::from(id), Value::from(name)];
        Instance::construct(ctx, Self::TYPE_NAME, None, own).map(Shape)
    }

    /// Incremental constructor; hooks run once, when the shell is finished.
    pub fn shell() -> Result<Shell<'static>, ModelError> {
        Shell::new(Context::global(), Self::TYPE_NAME)
    }

    pub fn shell_in(ctx: Context<'_>) -> Result<Shell<'_>, ModelError> {
        Shell::new(ctx, Self::TYPE_NAME)
    }

    pub fn id(&self) -> Result<String, ModelError> {
        FromValue::from_value(self.0.get("id")?)
    }

    pub fn set_id(&mut self, value: String) -> Result<(), ModelError> {
        self.0.set("id", Value::from(value))
    }

    pub fn name(&self) -> Result<Option<String>, ModelError> {
        FromValue::from_value(self.0.get("name")?)
    }

    pub fn set_name(&mut self, value: Option<String>) -> Result<(), ModelError> {
        self.0.set("name", Value::from(value))
    }
}

impl Entity for Shape {
    const TYPE_NAME: &'static str = "Shape";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::record("Shape")
            .field(FieldDescriptor::new("id", ValueKind::Primitive(Primitive::String)).identity())
            .field(FieldDescriptor::new("name", ValueKind::Primitive(Primitive::String)).optional().ignore_null())
    }

    fn from_instance_unchecked(instance: Instance) -> Self {
        Shape(instance)
    }

    fn into_instance(self) -> Instance {
        self.0
    }

    fn as_instance(&self) -> &Instance {
        &self.0
    }
}

impl From<Shape> for Value {
    fn from(value: Shape) -> Value {
        Value::Object(Box::new(value.0))
    }
}

impl FromValue for Shape {
    fn from_value(value: &Value) -> Result<Self, ModelError> {
        entity_from_value(value)
    }
}

/// The `Circle` record type, derived from `Shape`.
#[derive(Debug, Clone, PartialEq)]
pub struct Circle(Instance);

impl Circle {
    /// Full constructor; runs the validation hooks registered for this type.
    pub fn new(base: Shape, radius: f64, units: Units) -> Result<Self, ModelError> {
        Self::new_in(Context::global(), base, radius, units)
    }

    pub fn new_in(ctx: Context<'_>, base: Shape, radius: f64, units: Units) -> Result<Self, ModelError> {
        let own = vec![Value::from(radius), Value::from(units)];
        Instance::construct(ctx, Self::TYPE_NAME, Some(base.into_instance()), own).map(Circle)
    }

    /// Incremental constructor; hooks run once, when the shell is finished.
    pub fn shell() -> Result<Shell<'static>, ModelError> {
        Shell::new(Context::global(), Self::TYPE_NAME)
    }

    pub fn shell_in(ctx: Context<'_>) -> Result<Shell<'_>, ModelError> {
        Shell::new(ctx, Self::TYPE_NAME)
    }

    pub fn id(&self) -> Result<String, ModelError> {
        FromValue::from_value(self.0.get("id")?)
    }

    pub fn set_id(&mut self, value: String) -> Result<(), ModelError> {
        self.0.set("id", Value::from(value))
    }

    pub fn name(&self) -> Result<Option<String>, ModelError> {
        FromValue::from_value(self.0.get("name")?)
    }

    pub fn set_name(&mut self, value: Option<String>) -> Result<(), ModelError> {
        self.0.set("name", Value::from(value))
    }

    pub fn radius(&self) -> Result<f64, ModelError> {
        FromValue::from_value(self.0.get("radius")?)
    }

    pub fn set_radius(&mut self, value: f64) -> Result<(), ModelError> {
        self.0.set("radius", Value::from(value))
    }

    pub fn units(&self) -> Result<Units, ModelError> {
        FromValue::from_value(self.0.get("units")?)
    }

    pub fn set_units(&mut self, value: Units) -> Result<(), ModelError> {
        self.0.set("units", Value::from(value))
    }
}

impl Entity for Circle {
    const TYPE_NAME: &'static str = "Circle";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::record("Circle")
            .base("Shape")
            .fallback("Shape")
            .capability("HasArea")
            .field(FieldDescriptor::new("radius", ValueKind::Primitive(Primitive::Float)))
            .field(FieldDescriptor::new("units", ValueKind::Enum("Units".to_string())))
    }

    fn from_instance_unchecked(instance: Instance) -> Self {
        Circle(instance)
    }

    fn into_instance(self) -> Instance {
        self.0
    }

    fn as_instance(&self) -> &Instance {
        &self.0
    }
}

impl From<Circle> for Value {
    fn from(value: Circle) -> Value {
        Value::Object(Box::new(value.0))
    }
}

impl FromValue for Circle {
    fn from_value(value: &Value) -> Result<Self, ModelError> {
        entity_from_value(value)
    }
}

/// The `Group` record type, derived from `Shape`.
#[derive(Debug, Clone, PartialEq)]
pub struct Group(Instance);

impl Group {
    /// Full constructor; runs the validation hooks registered for this type.
    pub fn new(base: Shape, members: Vec<Shape>, anchor: Option<Id>) -> Result<Self, ModelError> {
        Self::new_in(Context::global(), base, members, anchor)
    }

    pub fn new_in(ctx: Context<'_>, base: Shape, members: Vec<Shape>, anchor: Option<Id>) -> Result<Self, ModelError> {
        let own = vec![Value::from(members), Value::from(anchor)];
        Instance::construct(ctx, Self::TYPE_NAME, Some(base.into_instance()), own).map(Group)
    }

    /// Incremental constructor; hooks run once, when the shell is finished.
    pub fn shell() -> Result<Shell<'static>, ModelError> {
        Shell::new(Context::global(), Self::TYPE_NAME)
    }

    pub fn shell_in(ctx: Context<'_>) -> Result<Shell<'_>, ModelError> {
        Shell::new(ctx, Self::TYPE_NAME)
    }

    pub fn id(&self) -> Result<String, ModelError> {
        FromValue::from_value(self.0.get("id")?)
    }

    pub fn set_id(&mut self, value: String) -> Result<(), ModelError> {
        self.0.set("id", Value::from(value))
    }

    pub fn name(&self) -> Result<Option<String>, ModelError> {
        FromValue::from_value(self.0.get("name")?)
    }

    pub fn set_name(&mut self, value: Option<String>) -> Result<(), ModelError> {
        self.0.set("name", Value::from(value))
    }

    pub fn members(&self) -> Result<Vec<Shape>, ModelError> {
        FromValue::from_value(self.0.get("members")?)
    }

    pub fn set_members(&mut self, value: Vec<Shape>) -> Result<(), ModelError> {
        self.0.set("members", Value::from(value))
    }

    pub fn anchor(&self) -> Result<Option<Id>, ModelError> {
        FromValue::from_value(self.0.get("anchor")?)
    }

    pub fn set_anchor(&mut self, value: Option<Id>) -> Result<(), ModelError> {
        self.0.set("anchor", Value::from(value))
    }
}

impl Entity for Group {
    const TYPE_NAME: &'static str = "Group";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::record("Group")
            .base("Shape")
            .field(FieldDescriptor::new("members", ValueKind::Array(Box::new(ValueKind::Object("Shape".to_string())))))
            .field(FieldDescriptor::new("anchor", ValueKind::Reference("Shape".to_string())).optional())
    }

    fn from_instance_unchecked(instance: Instance) -> Self {
        Group(instance)
    }

    fn into_instance(self) -> Instance {
        self.0
    }

    fn as_instance(&self) -> &Instance {
        &self.0
    }
}

impl From<Group> for Value {
    fn from(value: Group) -> Value {
        Value::Object(Box::new(value.0))
    }
}

impl FromValue for Group {
    fn from_value(value: &Value) -> Result<Self, ModelError> {
        entity_from_value(value)
    }
}

/// Descriptors of every type in this module, bases first.
pub fn descriptors() -> Vec<TypeDescriptor> {
    vec![
        Units::descriptor(),
        Shape::descriptor(),
        Circle::descriptor(),
        Group::descriptor(),
    ]
}

/// Registers this module's types as one batch and marks the registry initialized.
pub fn register_types(registry: &TypeRegistry) -> Result<(), ModelError> {
    registry.register_all(descriptors())
}
}
