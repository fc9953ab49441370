//! Runtime instances of registered record types and the two ways to build
//! them: the full constructor and the incremental [`Shell`].

use std::fmt;
use std::sync::Arc;

use elementum_schema::{FieldDescriptor, Id, Primitive, ValueKind};
use serde_json::Map;

use crate::{context::Context, error::ModelError, registry::RegisteredType, value::Value};

/// One value of a registered record type.
///
/// Field values are stored in the order of [`RegisteredType::fields`],
/// inherited fields first. Every stored value has been checked against its
/// field's kind.
#[derive(Clone)]
pub struct Instance {
    ty:           Arc<RegisteredType>,
    values:       Vec<Value>,
    unrecognized: Option<String>,
    extras:       Map<String, serde_json::Value>,
}

impl Instance {
    /// Full constructor.
    ///
    /// `base` must be an instance of exactly the declared base type; its
    /// values become the inherited part of the new instance. `own` holds one
    /// value per field the type declares itself. The pre-construct hook sees
    /// the raw argument list, the post-construct hook the finished instance.
    pub fn construct(
        ctx: Context<'_>,
        type_name: &str,
        base: Option<Instance>,
        own: Vec<Value>,
    ) -> Result<Instance, ModelError> {
        let ty = record_type(ctx, type_name)?;

        let mut args = match (ty.base(), base) {
            (Some(expected), Some(base)) if base.type_name() == expected => base.values,
            (Some(expected), Some(base)) => {
                return Err(ModelError::mismatch(
                    format!("{}(base)", type_name),
                    expected,
                    base.type_name(),
                ))
            }
            (Some(expected), None) => {
                return Err(ModelError::mismatch(format!("{}(base)", type_name), expected, "no base"))
            }
            (None, Some(base)) => {
                return Err(ModelError::mismatch(
                    format!("{}(base)", type_name),
                    "no base",
                    base.type_name(),
                ))
            }
            (None, None) => Vec::new(),
        };

        if own.len() != ty.own_fields().len() {
            return Err(ModelError::mismatch(
                format!("{}(own fields)", type_name),
                ty.own_fields().len(),
                own.len(),
            ));
        }
        args.extend(own);

        ctx.validators.run_pre(&ty, &args)?;

        let mut values = Vec::with_capacity(args.len());
        for (field, value) in ty.fields().iter().zip(args) {
            values.push(checked(&ty, field, value, true)?);
        }

        let mut instance = Instance {
            ty: ty.clone(),
            values,
            unrecognized: None,
            extras: Map::new(),
        };
        ctx.validators.run_post(&ty, &mut instance)?;
        Ok(instance)
    }

    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    pub fn registered_type(&self) -> &Arc<RegisteredType> {
        &self.ty
    }

    pub fn is_a(&self, ancestor: &str) -> bool {
        self.ty.is_a(ancestor)
    }

    pub fn get(&self, name: &str) -> Result<&Value, ModelError> {
        let index = self.index_of(name)?;
        Ok(&self.values[index])
    }

    /// Checked setter: the value must fit the field and required fields
    /// cannot be cleared. Hooks do not run.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), ModelError> {
        let index = self.index_of(name)?;
        let value = checked(&self.ty, &self.ty.fields()[index], value, true)?;
        self.values[index] = value;
        Ok(())
    }

    /// Field descriptors paired with their values, inherited fields first.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &Value)> {
        self.ty.fields().iter().zip(self.values.iter())
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The value of the identity field, as an [`Id`].
    pub fn identifier(&self) -> Option<Id> {
        let index = self.ty.fields().iter().position(|f| f.identity)?;
        match self.values[index] {
            Value::String(ref text) => Some(Id::new(text.clone())),
            Value::Int(number) => Some(Id::from(number)),
            _ => None,
        }
    }

    /// Stores `id` in a string identity field.
    pub(crate) fn assign_identifier(&mut self, id: &Id) -> Result<(), ModelError> {
        let field = self
            .ty
            .identity_field()
            .ok_or_else(|| ModelError::Unidentifiable(self.type_name().to_string()))?;
        if field.kind != ValueKind::Primitive(Primitive::String) {
            return Err(ModelError::Unidentifiable(self.type_name().to_string()));
        }
        let name = field.name.clone();
        self.set(&name, Value::String(id.to_string()))
    }

    /// The discriminator this instance was read with, when it was read as a
    /// fallback type.
    pub fn unrecognized_discriminator(&self) -> Option<&str> {
        self.unrecognized.as_deref()
    }

    /// Wire properties this instance was read with that no field claims.
    pub fn additional_properties(&self) -> &Map<String, serde_json::Value> {
        &self.extras
    }

    /// Identifiers of every cross reference held by this instance, nested
    /// objects included.
    pub fn references(&self) -> Vec<Id> {
        let mut ids = Vec::new();
        for value in &self.values {
            collect_references(value, &mut ids);
        }
        ids
    }

    /// Every cross reference held by this instance, nested objects included,
    /// with the type its field expects the target to be.
    pub(crate) fn reference_slots(&self) -> Vec<ReferenceSlot> {
        let mut slots = Vec::new();
        for (field, value) in self.fields() {
            let location = format!("{}.{}", self.type_name(), field.name);
            collect_slots(&location, &field.kind, value, &mut slots);
        }
        slots
    }

    fn index_of(&self, name: &str) -> Result<usize, ModelError> {
        self.ty.field_index(name).ok_or_else(|| {
            ModelError::mismatch(format!("{}.{}", self.type_name(), name), "a declared field", "unknown field")
        })
    }
}

fn collect_references(value: &Value, ids: &mut Vec<Id>) {
    match value {
        Value::Ref(id) => ids.push(id.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_references(item, ids)),
        Value::Object(instance) => ids.extend(instance.references()),
        _ => {}
    }
}

/// A cross reference paired with the declared target type of its field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReferenceSlot {
    /// `Type.field` of the field holding the reference.
    pub location: String,
    pub target:   Id,
    pub expected: String,
}

fn collect_slots(location: &str, kind: &ValueKind, value: &Value, slots: &mut Vec<ReferenceSlot>) {
    match (kind, value) {
        (ValueKind::Reference(expected), Value::Ref(id)) => slots.push(ReferenceSlot {
            location: location.to_string(),
            target:   id.clone(),
            expected: expected.clone(),
        }),
        (ValueKind::Array(inner), Value::Array(items)) => {
            items.iter().for_each(|item| collect_slots(location, inner, item, slots))
        }
        (_, Value::Object(instance)) => slots.extend(instance.reference_slots()),
        _ => {}
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name()
            && self.values == other.values
            && self.unrecognized == other.unrecognized
            && self.extras == other.extras
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{} {{", self.type_name())?;
        let mut first = true;
        for (field, value) in self.fields() {
            if first {
                first = false;
            } else {
                write!(f, ",")?;
            }
            write!(f, " {}: {:?}", field.name, value)?;
        }
        write!(f, " }}")
    }
}

/// Incremental constructor.
///
/// Fields are assigned one at a time with [`Shell::set`]; nothing runs until
/// [`Shell::finish`], which checks required fields and runs the pre- and
/// post-construct hooks exactly once. `finish` consumes the shell.
pub struct Shell<'a> {
    ctx:          Context<'a>,
    ty:           Arc<RegisteredType>,
    values:       Vec<Value>,
    unrecognized: Option<String>,
    extras:       Map<String, serde_json::Value>,
}

impl<'a> Shell<'a> {
    pub fn new(ctx: Context<'a>, type_name: &str) -> Result<Shell<'a>, ModelError> {
        let ty = record_type(ctx, type_name)?;
        Ok(Shell::for_type(ctx, ty))
    }

    pub(crate) fn for_type(ctx: Context<'a>, ty: Arc<RegisteredType>) -> Shell<'a> {
        let values = vec![Value::Null; ty.fields().len()];
        Shell {
            ctx,
            ty,
            values,
            unrecognized: None,
            extras: Map::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    /// Assigns one field. Nulls are accepted here; required fields are
    /// checked by `finish`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self, ModelError> {
        let index = self.ty.field_index(name).ok_or_else(|| {
            ModelError::mismatch(format!("{}.{}", self.ty.name(), name), "a declared field", "unknown field")
        })?;
        self.values[index] = checked(&self.ty, &self.ty.fields()[index], value.into(), false)?;
        Ok(self)
    }

    pub(crate) fn set_unrecognized_discriminator(&mut self, discriminator: String) {
        self.unrecognized = Some(discriminator);
    }

    pub(crate) fn set_additional_properties(&mut self, extras: Map<String, serde_json::Value>) {
        self.extras = extras;
    }

    pub fn finish(self) -> Result<Instance, ModelError> {
        for (field, value) in self.ty.fields().iter().zip(&self.values) {
            if field.required && value.is_null() {
                return Err(ModelError::MissingRequiredField {
                    type_name: self.ty.name().to_string(),
                    field:     field.name.clone(),
                });
            }
        }

        self.ctx.validators.run_pre(&self.ty, &self.values)?;
        let mut instance = Instance {
            ty:           self.ty.clone(),
            values:       self.values,
            unrecognized: self.unrecognized,
            extras:       self.extras,
        };
        self.ctx.validators.run_post(&self.ty, &mut instance)?;
        Ok(instance)
    }
}

fn record_type(ctx: Context<'_>, type_name: &str) -> Result<Arc<RegisteredType>, ModelError> {
    let ty = ctx.registry.get(type_name).ok_or_else(|| ModelError::UnknownTypeReference {
        missing:       type_name.to_string(),
        referenced_by: "construction".to_string(),
    })?;
    if ty.is_enum() {
        return Err(ModelError::mismatch(type_name, "record type", "enum"));
    }
    Ok(ty)
}

/// Checks `value` against `field` and widens integers stored in float slots.
fn checked(ty: &RegisteredType, field: &FieldDescriptor, value: Value, enforce_required: bool) -> Result<Value, ModelError> {
    if value.is_null() {
        if field.required && enforce_required {
            return Err(ModelError::MissingRequiredField {
                type_name: ty.name().to_string(),
                field:     field.name.clone(),
            });
        }
        return Ok(Value::Null);
    }
    if !value.fits(&field.kind) {
        return Err(ModelError::mismatch(
            format!("{}.{}", ty.name(), field.name),
            &field.kind,
            value.kind_name(),
        ));
    }
    Ok(widen(&field.kind, value))
}

fn widen(kind: &ValueKind, value: Value) -> Value {
    match (kind, value) {
        (ValueKind::Primitive(Primitive::Float), Value::Int(number)) => Value::Float(number as f64),
        (ValueKind::Array(inner), Value::Array(items)) => {
            Value::Array(items.into_iter().map(|item| widen(inner, item)).collect())
        }
        (_, value) => value,
    }
}
