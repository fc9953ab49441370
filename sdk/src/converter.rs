//! Polymorphic JSON conversion.
//!
//! A wire record is a JSON object holding the exact type name under the
//! discriminator key followed by one property per field, keyed by wire name:
//!
//! ```json
//! {"discriminator":"Circle","id":1,"radius":5.0}
//! ```
//!
//! Nested objects carry their own discriminator, enum values are written as
//! labels and cross references as the target's identifier.

use std::sync::Arc;

use elementum_schema::{FieldDescriptor, Id, NullRule, Primitive, ValueKind, DEFAULT_DISCRIMINATOR};
use serde_json::{Map, Number};
use tracing::{debug, warn};

use crate::{
    context::Context,
    error::ModelError,
    instance::{Instance, Shell},
    registry::RegisteredType,
    value::Value,
};

#[derive(Debug, Clone)]
pub struct ConverterOptions {
    /// Wire key holding the type name.
    pub discriminator_key: String,
    /// Type used for top-level records whose discriminator is unknown.
    pub fallback:          Option<String>,
    /// Keep unknown wire properties and unrecognized discriminators, and
    /// write them back out on serialization.
    pub preserve_unknown:  bool,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        ConverterOptions {
            discriminator_key: DEFAULT_DISCRIMINATOR.to_string(),
            fallback:          None,
            preserve_unknown:  false,
        }
    }
}

pub struct Converter<'a> {
    ctx:     Context<'a>,
    options: ConverterOptions,
}

impl<'a> Converter<'a> {
    /// Fails with `RegistryNotInitialized` until the registry has been
    /// populated with `register_all`, and with `DuplicateWireName` when a
    /// registered field is written under the discriminator key.
    pub fn new(ctx: Context<'a>, options: ConverterOptions) -> Result<Self, ModelError> {
        ctx.registry.ensure_initialized()?;
        for name in ctx.registry.names() {
            if let Some(ty) = ctx.registry.get(&name) {
                check_discriminator_key(&ty, &options.discriminator_key)?;
            }
        }
        if let Some(ref fallback) = options.fallback {
            match ctx.registry.get(fallback) {
                Some(ty) if !ty.is_enum() => {}
                _ => {
                    return Err(ModelError::UnknownTypeReference {
                        missing:       fallback.clone(),
                        referenced_by: "converter fallback".to_string(),
                    })
                }
            }
        }
        Ok(Converter { ctx, options })
    }

    pub fn context(&self) -> Context<'a> {
        self.ctx
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    pub fn serialize(&self, instance: &Instance) -> Result<serde_json::Value, ModelError> {
        let mut record = Map::new();

        let discriminator = match instance.unrecognized_discriminator() {
            Some(original) if self.options.preserve_unknown => original,
            _ => instance.type_name(),
        };
        record.insert(
            self.options.discriminator_key.clone(),
            serde_json::Value::String(discriminator.to_string()),
        );

        check_discriminator_key(instance.registered_type(), &self.options.discriminator_key)?;
        for (field, value) in instance.fields() {
            if value.is_null() {
                if field.null_rule == NullRule::Include {
                    record.insert(field.wire_name.clone(), serde_json::Value::Null);
                }
                continue;
            }
            let encoded = self.encode_value(instance.type_name(), field, value)?;
            record.insert(field.wire_name.clone(), encoded);
        }

        if self.options.preserve_unknown {
            for (key, value) in instance.additional_properties() {
                if !record.contains_key(key) {
                    record.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(serde_json::Value::Object(record))
    }

    fn encode_value(&self, type_name: &str, field: &FieldDescriptor, value: &Value) -> Result<serde_json::Value, ModelError> {
        Ok(match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::Number(Number::from(*n)),
            Value::Float(x) => {
                let number = Number::from_f64(*x).ok_or_else(|| ModelError::NonFiniteFloat {
                    type_name: type_name.to_string(),
                    field:     field.name.clone(),
                })?;
                serde_json::Value::Number(number)
            }
            Value::String(text) => serde_json::Value::String(text.clone()),
            Value::Enum(enum_name, label) => {
                let known = self
                    .ctx
                    .registry
                    .enum_descriptor(enum_name)
                    .map_or(false, |ty| ty.enum_value(label).is_some());
                if !known {
                    return Err(ModelError::UnknownEnumValue {
                        enum_name: enum_name.clone(),
                        label:     label.clone(),
                    });
                }
                serde_json::Value::String(label.clone())
            }
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| self.encode_value(type_name, field, item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Value::Object(instance) => self.serialize(instance)?,
            Value::Ref(id) => serde_json::Value::String(id.to_string()),
        })
    }

    /// Reads a top-level record, using the configured fallback type as the
    /// context for unknown discriminators.
    pub fn deserialize(&self, record: &serde_json::Value) -> Result<Instance, ModelError> {
        self.deserialize_as(record, self.options.fallback.as_deref())
    }

    /// Reads a record with `context` as the type to degrade to when the
    /// discriminator is unknown.
    pub fn deserialize_as(&self, record: &serde_json::Value, context: Option<&str>) -> Result<Instance, ModelError> {
        self.read_record(record, context, None)
    }

    pub fn to_string(&self, instance: &Instance) -> Result<String, ModelError> {
        Ok(serde_json::to_string(&self.serialize(instance)?)?)
    }

    pub fn from_str(&self, text: &str) -> Result<Instance, ModelError> {
        let record: serde_json::Value = serde_json::from_str(text)?;
        self.deserialize(&record)
    }

    fn read_record(
        &self,
        record: &serde_json::Value,
        context: Option<&str>,
        slot: Option<&str>,
    ) -> Result<Instance, ModelError> {
        let object = record
            .as_object()
            .ok_or_else(|| ModelError::mismatch("record", "object", json_kind(record)))?;
        let discriminator = object
            .get(&self.options.discriminator_key)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ModelError::MissingDiscriminator(self.options.discriminator_key.clone()))?;

        let ty = self.resolve_type(discriminator, context, slot)?;
        check_discriminator_key(&ty, &self.options.discriminator_key)?;
        let mut shell = Shell::for_type(self.ctx, ty.clone());
        if ty.name() != discriminator {
            shell.set_unrecognized_discriminator(discriminator.to_string());
        }

        for field in ty.fields() {
            match object.get(&field.wire_name) {
                None | Some(serde_json::Value::Null) => {
                    if field.required {
                        return Err(ModelError::MissingRequiredField {
                            type_name: ty.name().to_string(),
                            field:     field.name.clone(),
                        });
                    }
                }
                Some(raw) => {
                    let value = self.decode_value(ty.name(), field, &field.kind, raw)?;
                    shell.set(&field.name, value)?;
                }
            }
        }

        if self.options.preserve_unknown {
            let extras: Map<String, serde_json::Value> = object
                .iter()
                .filter(|(key, _)| {
                    **key != self.options.discriminator_key && ty.field_by_wire_name(key).is_none()
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            shell.set_additional_properties(extras);
        }

        shell.finish()
    }

    /// Exact match, then a registry fallback declaration for the
    /// discriminator, then the nearest fallback declared on the context
    /// type's lineage (the context type itself when none is declared).
    fn resolve_type(
        &self,
        discriminator: &str,
        context: Option<&str>,
        slot: Option<&str>,
    ) -> Result<Arc<RegisteredType>, ModelError> {
        let registry = self.ctx.registry;
        if let Some(ty) = registry.get(discriminator) {
            if ty.is_enum() {
                return Err(ModelError::mismatch("discriminator", "record type", discriminator));
            }
            return Ok(ty);
        }

        let fits = |ty: &RegisteredType| slot.map_or(true, |s| ty.is_a(s));

        if let Some(ty) = registry.fallback_for(discriminator) {
            if fits(&*ty) {
                warn!(discriminator, fallback = %ty.name(), "reading unknown type through a declared fallback");
                return Ok(ty);
            }
        }

        if let Some(context) = context {
            let context_ty = registry.get(context).ok_or_else(|| ModelError::UnknownTypeReference {
                missing:       context.to_string(),
                referenced_by: discriminator.to_string(),
            })?;
            if context_ty.is_enum() {
                return Err(ModelError::mismatch("context type", "record type", context));
            }
            let declared = context_ty
                .lineage()
                .iter()
                .filter_map(|name| registry.get(name))
                .filter_map(|ancestor| ancestor.fallback().and_then(|target| registry.get(target)))
                .find(|target| fits(&**target));
            let ty = declared.unwrap_or(context_ty);
            warn!(discriminator, fallback = %ty.name(), "reading unknown type as its context type");
            return Ok(ty);
        }

        Err(ModelError::UnknownDiscriminator(discriminator.to_string()))
    }

    fn decode_value(
        &self,
        type_name: &str,
        field: &FieldDescriptor,
        kind: &ValueKind,
        raw: &serde_json::Value,
    ) -> Result<Value, ModelError> {
        let location = || format!("{}.{}", type_name, field.name);
        let mismatch = || ModelError::mismatch(location(), kind, json_kind(raw));

        match kind {
            ValueKind::Primitive(Primitive::Bool) => raw.as_bool().map(Value::Bool).ok_or_else(mismatch),
            ValueKind::Primitive(Primitive::Int) => raw.as_i64().map(Value::Int).ok_or_else(mismatch),
            ValueKind::Primitive(Primitive::Float) => raw.as_f64().map(Value::Float).ok_or_else(mismatch),
            ValueKind::Primitive(Primitive::String) => raw
                .as_str()
                .map(|text| Value::String(text.to_string()))
                .ok_or_else(mismatch),
            ValueKind::Enum(enum_name) => {
                let label = raw.as_str().ok_or_else(mismatch)?;
                let known = self
                    .ctx
                    .registry
                    .enum_descriptor(enum_name)
                    .map_or(false, |ty| ty.enum_value(label).is_some());
                if !known {
                    return Err(ModelError::UnknownEnumValue {
                        enum_name: enum_name.clone(),
                        label:     label.to_string(),
                    });
                }
                Ok(Value::Enum(enum_name.clone(), label.to_string()))
            }
            ValueKind::Object(slot_type) => {
                let nested = self.read_record(raw, Some(slot_type), Some(slot_type))?;
                debug!(field = %location(), type_name = %nested.type_name(), "read nested record");
                Ok(Value::Object(Box::new(nested)))
            }
            ValueKind::Reference(_) => match raw {
                serde_json::Value::String(text) => Ok(Value::Ref(Id::new(text.clone()))),
                serde_json::Value::Number(number) => number
                    .as_i64()
                    .map(|n| Value::Ref(Id::from(n)))
                    .ok_or_else(mismatch),
                _ => Err(mismatch()),
            },
            ValueKind::Array(inner) => {
                let items = raw.as_array().ok_or_else(mismatch)?;
                items
                    .iter()
                    .map(|item| {
                        if item.is_null() {
                            Err(ModelError::mismatch(location(), inner, "null"))
                        } else {
                            self.decode_value(type_name, field, inner, item)
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
        }
    }
}

/// Types registered after the converter was built are checked when they
/// are read or written.
fn check_discriminator_key(ty: &RegisteredType, key: &str) -> Result<(), ModelError> {
    match ty.field_by_wire_name(key) {
        Some(_) => Err(ModelError::DuplicateWireName {
            type_name: ty.name().to_string(),
            wire_name: key.to_string(),
        }),
        None => Ok(()),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
