//! A keyed collection of instances whose cross references are identifiers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use elementum_schema::{Id, ValueKind};
use tracing::{debug, warn};

use crate::{converter::Converter, error::ModelError, instance::Instance, value::Value};

const ELEMENTS_KEY: &str = "elements";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    entries: BTreeMap<Id, Arc<Instance>>,
}

/// One record that did not make it into a loaded model.
#[derive(Debug)]
pub struct LoadFailure {
    /// Position of the record in the wire `elements` array.
    pub index: usize,
    pub id:    Option<Id>,
    pub error: ModelError,
}

/// Result of [`Model::from_wire`]: everything that loaded, plus a failure
/// per record that did not.
#[derive(Debug)]
pub struct ModelLoad {
    pub model:    Model,
    pub failures: Vec<LoadFailure>,
}

impl Model {
    pub fn new() -> Self {
        Model::default()
    }

    /// Adds `instance` under the value of its identity field. A string
    /// identity field that is still null gets a random identifier.
    /// Adding an instance equal to the one already stored is a no-op.
    pub fn add(&mut self, mut instance: Instance) -> Result<Id, ModelError> {
        let id = match instance.identifier() {
            Some(id) => id,
            None => {
                let id = Id::random();
                instance.assign_identifier(&id)?;
                debug!(type_name = %instance.type_name(), id = %id, "assigned identifier");
                id
            }
        };

        match self.entries.get(&id) {
            Some(existing) if **existing == instance => Ok(id),
            Some(_) => Err(ModelError::DuplicateIdentifier(id)),
            None => {
                self.entries.insert(id.clone(), Arc::new(instance));
                Ok(id)
            }
        }
    }

    pub fn get(&self, id: &Id) -> Option<&Arc<Instance>> {
        self.entries.get(id)
    }

    pub fn resolve_reference(&self, id: &Id) -> Result<&Arc<Instance>, ModelError> {
        self.entries
            .get(id)
            .ok_or_else(|| ModelError::DanglingReference(id.clone()))
    }

    /// Resolves every reference held by one field of `instance`: none for a
    /// null, one for a reference, one per element for an array. A target
    /// that is not of the field's declared type is a `TypeMismatch`.
    pub fn resolve_field(&self, instance: &Instance, field: &str) -> Result<Vec<&Arc<Instance>>, ModelError> {
        let mut ids = Vec::new();
        collect_ids(instance.get(field)?, &mut ids);
        let expected = instance.registered_type().field(field).and_then(|descriptor| reference_target(&descriptor.kind));
        ids.into_iter()
            .map(|id| {
                let target = self.resolve_reference(id)?;
                match expected {
                    Some(expected) if !target.is_a(expected) => Err(ModelError::mismatch(
                        format!("{}.{}", instance.type_name(), field),
                        expected,
                        target.type_name(),
                    )),
                    _ => Ok(target),
                }
            })
            .collect()
    }

    /// Instances of `type_name` or of any type deriving from it, in id order.
    pub fn all_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Arc<Instance>> + 'a {
        self.entries.values().filter(move |instance| instance.is_a(type_name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Id, &Arc<Instance>)> {
        self.entries.iter()
    }

    pub fn remove(&mut self, id: &Id) -> Option<Arc<Instance>> {
        self.entries.remove(id)
    }

    /// Fails with the first reference that does not resolve to an instance
    /// of its field's declared type.
    pub fn validate_references(&self) -> Result<(), ModelError> {
        match self.broken().into_iter().next() {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }

    /// `(holder, error)` for every reference that is dangling or points at
    /// an instance of the wrong type.
    fn broken(&self) -> Vec<(Id, ModelError)> {
        let mut broken = Vec::new();
        for (id, instance) in &self.entries {
            for slot in instance.reference_slots() {
                let error = match self.entries.get(&slot.target) {
                    None => ModelError::DanglingReference(slot.target),
                    Some(target) if !target.is_a(&slot.expected) => {
                        ModelError::mismatch(slot.location, &slot.expected, target.type_name())
                    }
                    Some(_) => continue,
                };
                broken.push((id.clone(), error));
            }
        }
        broken
    }

    /// `{"elements": [record, ...]}`, records in id order.
    pub fn to_wire(&self, converter: &Converter<'_>) -> Result<serde_json::Value, ModelError> {
        let elements = self
            .entries
            .values()
            .map(|instance| converter.serialize(instance))
            .collect::<Result<Vec<_>, _>>()?;
        let mut wire = serde_json::Map::new();
        wire.insert(ELEMENTS_KEY.to_string(), serde_json::Value::Array(elements));
        Ok(serde_json::Value::Object(wire))
    }

    /// Loads a model in two passes. The first constructs every record,
    /// skipping and reporting the ones that fail. The second drops instances
    /// whose references do not resolve, or resolve to an instance of the
    /// wrong type, until every remaining reference is sound. Only malformed input fails the whole call.
    pub fn from_wire(converter: &Converter<'_>, wire: &serde_json::Value) -> Result<ModelLoad, ModelError> {
        let elements = wire
            .get(ELEMENTS_KEY)
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| ModelError::MalformedModel(format!("expected an object with an \"{}\" array", ELEMENTS_KEY)))?;

        let mut model = Model::new();
        let mut failures = Vec::new();
        let mut positions: HashMap<Id, usize> = HashMap::new();

        for (index, record) in elements.iter().enumerate() {
            let instance = match converter.deserialize(record) {
                Ok(instance) => instance,
                Err(error) => {
                    warn!(index, %error, "skipping record");
                    failures.push(LoadFailure { index, id: None, error });
                    continue;
                }
            };
            let id = instance.identifier();
            match model.add(instance) {
                Ok(id) => {
                    positions.insert(id, index);
                }
                Err(error) => {
                    warn!(index, %error, "skipping record");
                    failures.push(LoadFailure { index, id, error });
                }
            }
        }

        loop {
            let broken = model.broken();
            if broken.is_empty() {
                break;
            }
            for (holder, error) in broken {
                if model.remove(&holder).is_some() {
                    warn!(id = %holder, %error, "dropping instance with a broken reference");
                    failures.push(LoadFailure {
                        index: positions.get(&holder).copied().unwrap_or(usize::MAX),
                        id:    Some(holder),
                        error,
                    });
                }
            }
        }

        failures.sort_by_key(|failure| failure.index);
        debug!(instances = model.len(), failures = failures.len(), "loaded model");
        Ok(ModelLoad { model, failures })
    }
}

fn collect_ids<'a>(value: &'a Value, ids: &mut Vec<&'a Id>) {
    match value {
        Value::Ref(id) => ids.push(id),
        Value::Array(items) => items.iter().for_each(|item| collect_ids(item, ids)),
        _ => {}
    }
}

fn reference_target(kind: &ValueKind) -> Option<&str> {
    match kind {
        ValueKind::Reference(target) => Some(target.as_str()),
        ValueKind::Array(inner) => reference_target(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::Context,
        converter::ConverterOptions,
        registry::TypeRegistry,
        validator::{Hooks, ValidatorChain},
    };
    use elementum_schema::{FieldDescriptor, Primitive, TypeDescriptor};
    use serde_json::json;

    fn registry() -> TypeRegistry {
        let registry = TypeRegistry::new();
        registry
            .register_all(vec![
                TypeDescriptor::record("Element")
                    .field(FieldDescriptor::new("id", ValueKind::Primitive(Primitive::String)).optional().identity()),
                TypeDescriptor::record("A")
                    .base("Element")
                    .field(FieldDescriptor::new("target", ValueKind::Reference("Element".into())).wire_name("ref")),
                TypeDescriptor::record("B").base("Element"),
            ])
            .unwrap();
        registry
    }

    fn wire(records: Vec<serde_json::Value>) -> serde_json::Value {
        json!({ "elements": records })
    }

    #[test]
    fn second_pass_resolves_forward_references() {
        let registry = registry();
        let validators = ValidatorChain::new();
        let converter = Converter::new(Context::new(&registry, &validators), ConverterOptions::default()).unwrap();

        let a = json!({"discriminator": "A", "id": "x1", "ref": "x2"});
        let b = json!({"discriminator": "B", "id": "x2"});

        let forward = Model::from_wire(&converter, &wire(vec![a.clone(), b.clone()])).unwrap();
        assert!(forward.failures.is_empty());
        let holder = forward.model.get(&Id::from("x1")).unwrap();
        let targets = forward.model.resolve_field(holder, "target").unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].type_name(), "B");

        let backward = Model::from_wire(&converter, &wire(vec![b, a])).unwrap();
        assert_eq!(forward.model, backward.model);
        assert_eq!(backward.model.all_of_type("Element").count(), 2);
        assert_eq!(backward.model.all_of_type("B").count(), 1);
    }

    #[test]
    fn dangling_references_are_dropped_transitively() {
        let registry = registry();
        let validators = ValidatorChain::new();
        let converter = Converter::new(Context::new(&registry, &validators), ConverterOptions::default()).unwrap();

        let load = Model::from_wire(
            &converter,
            &wire(vec![
                json!({"discriminator": "A", "id": "x1", "ref": "x2"}),
                json!({"discriminator": "A", "id": "x2", "ref": "gone"}),
                json!({"discriminator": "B", "id": "x3"}),
                json!({"discriminator": "Unknown", "id": "x4"}),
            ]),
        )
        .unwrap();

        assert_eq!(load.model.len(), 1);
        assert!(load.model.get(&Id::from("x3")).is_some());
        let indices: Vec<usize> = load.failures.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 3]);
        assert!(matches!(load.failures[1].error, ModelError::DanglingReference(ref id) if id.as_str() == "gone"));
        assert!(matches!(load.failures[2].error, ModelError::UnknownDiscriminator(_)));
        load.model.validate_references().unwrap();
    }

    #[test]
    fn duplicate_ids_and_hook_failures_are_reported() {
        let registry = registry();
        let validators = ValidatorChain::new();
        validators.register(
            "B",
            Hooks::new().post(|instance| match instance.identifier() {
                Some(id) if id.as_str() == "bad" => Err("rejected".to_string()),
                _ => Ok(()),
            }),
        );
        let converter = Converter::new(Context::new(&registry, &validators), ConverterOptions::default()).unwrap();

        let load = Model::from_wire(
            &converter,
            &wire(vec![
                json!({"discriminator": "B", "id": "x1"}),
                json!({"discriminator": "A", "id": "x1", "ref": "x1"}),
                json!({"discriminator": "B", "id": "bad"}),
            ]),
        )
        .unwrap();

        assert_eq!(load.model.len(), 1);
        assert!(matches!(load.failures[0].error, ModelError::DuplicateIdentifier(_)));
        assert_eq!(load.failures[0].id, Some(Id::from("x1")));
        assert!(matches!(load.failures[1].error, ModelError::Hook { .. }));
    }

    #[test]
    fn add_assigns_ids_and_ignores_repeats() {
        let registry = registry();
        let validators = ValidatorChain::new();
        let converter = Converter::new(Context::new(&registry, &validators), ConverterOptions::default()).unwrap();

        let anonymous = converter.deserialize(&json!({"discriminator": "B"})).unwrap();
        let mut model = Model::new();
        let id = model.add(anonymous).unwrap();
        assert_eq!(id.as_str().len(), 36);
        assert_eq!(model.get(&id).unwrap().identifier(), Some(id.clone()));

        let named = converter.deserialize(&json!({"discriminator": "B", "id": "x2"})).unwrap();
        model.add(named.clone()).unwrap();
        model.add(named).unwrap();
        assert_eq!(model.len(), 2);

        let wire = model.to_wire(&converter).unwrap();
        assert_eq!(wire["elements"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn malformed_input_fails_the_whole_load() {
        let registry = registry();
        let validators = ValidatorChain::new();
        let converter = Converter::new(Context::new(&registry, &validators), ConverterOptions::default()).unwrap();
        assert!(matches!(
            Model::from_wire(&converter, &json!([1, 2, 3])),
            Err(ModelError::MalformedModel(_))
        ));
    }

    #[test]
    fn references_to_the_wrong_type_are_dropped() {
        let registry = TypeRegistry::new();
        registry
            .register_all(vec![
                TypeDescriptor::record("Material")
                    .field(FieldDescriptor::new("id", ValueKind::Primitive(Primitive::String)).identity()),
                TypeDescriptor::record("Beam")
                    .field(FieldDescriptor::new("id", ValueKind::Primitive(Primitive::String)).identity())
                    .field(FieldDescriptor::new("material", ValueKind::Reference("Material".into())))
                    .field(
                        FieldDescriptor::new("braces", ValueKind::Array(Box::new(ValueKind::Reference("Beam".into()))))
                            .optional()
                            .ignore_null(),
                    ),
            ])
            .unwrap();
        let validators = ValidatorChain::new();
        let converter = Converter::new(Context::new(&registry, &validators), ConverterOptions::default()).unwrap();

        let load = Model::from_wire(
            &converter,
            &wire(vec![
                json!({"discriminator": "Material", "id": "steel"}),
                json!({"discriminator": "Beam", "id": "b1", "material": "steel"}),
                json!({"discriminator": "Beam", "id": "b2", "material": "b1"}),
                json!({"discriminator": "Beam", "id": "b3", "material": "steel", "braces": ["b1", "steel"]}),
            ]),
        )
        .unwrap();

        assert_eq!(load.model.len(), 2);
        assert!(load.model.get(&Id::from("b2")).is_none());
        assert!(load.model.get(&Id::from("b3")).is_none());
        let indices: Vec<usize> = load.failures.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![2, 3]);
        match &load.failures[0].error {
            ModelError::TypeMismatch { location, expected, found } => {
                assert_eq!(location, "Beam.material");
                assert_eq!(expected, "Material");
                assert_eq!(found, "Beam");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(load.failures[1].error, ModelError::TypeMismatch { ref found, .. } if found == "Material"));
        load.model.validate_references().unwrap();

        let mut model = load.model.clone();
        let wrong = converter
            .deserialize(&json!({"discriminator": "Beam", "id": "b4", "material": "b1"}))
            .unwrap();
        model.add(wrong.clone()).unwrap();
        assert!(matches!(model.validate_references(), Err(ModelError::TypeMismatch { .. })));
        assert!(matches!(
            model.resolve_field(&wrong, "material"),
            Err(ModelError::TypeMismatch { ref expected, .. }) if expected == "Material"
        ));
        let sound = model.get(&Id::from("b1")).unwrap();
        assert_eq!(model.resolve_field(sound, "material").unwrap()[0].type_name(), "Material");
    }
}
