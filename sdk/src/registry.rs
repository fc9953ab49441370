//! Process-wide catalogue of known types.
//!
//! Registration takes the write lock, lookups share the read lock. A type is
//! linked when it is registered: its lineage, flattened field list and
//! capabilities are computed once and never change afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use elementum_schema::{EnumValue, FieldDescriptor, TypeDescriptor, ValueKind, DEFAULT_DISCRIMINATOR};
use lazy_static::lazy_static;
use tracing::{debug, warn};

use crate::error::ModelError;

lazy_static! {
    static ref GLOBAL_REGISTRY: TypeRegistry = TypeRegistry::new();
}

/// A descriptor linked against its ancestors.
#[derive(Debug)]
pub struct RegisteredType {
    descriptor:   TypeDescriptor,
    lineage:      Vec<String>,
    fields:       Vec<FieldDescriptor>,
    own_offset:   usize,
    by_name:      HashMap<String, usize>,
    by_wire_name: HashMap<String, usize>,
    capabilities: Vec<String>,
}

impl RegisteredType {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn base(&self) -> Option<&str> {
        self.descriptor.base.as_deref()
    }

    /// The type itself followed by its ancestors, nearest first.
    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    /// Every field, inherited ones first.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Fields declared by this type itself.
    pub fn own_fields(&self) -> &[FieldDescriptor] {
        &self.fields[self.own_offset..]
    }

    /// Number of inherited fields; own fields start at this index.
    pub fn inherited_count(&self) -> usize {
        self.own_offset
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_index(name).map(|i| &self.fields[i])
    }

    pub fn field_by_wire_name(&self, wire_name: &str) -> Option<&FieldDescriptor> {
        self.by_wire_name.get(wire_name).map(|&i| &self.fields[i])
    }

    pub fn identity_field(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.identity)
    }

    /// Own capabilities in declared order, then inherited ones.
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    pub fn fallback(&self) -> Option<&str> {
        self.descriptor.fallback.as_deref()
    }

    pub fn is_a(&self, ancestor: &str) -> bool {
        self.lineage.iter().any(|name| name == ancestor)
    }

    pub fn is_enum(&self) -> bool {
        self.descriptor.is_enum()
    }

    pub fn enum_value(&self, label: &str) -> Option<&EnumValue> {
        self.descriptor.enum_value(label)
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    types:       HashMap<String, Arc<RegisteredType>>,
    /// Reader-side fallbacks for discriminators that cannot be constructed.
    fallbacks:   HashMap<String, String>,
    initialized: bool,
}

impl RegistryState {
    fn get(&self, name: &str) -> Option<&Arc<RegisteredType>> {
        self.types.get(name)
    }
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    state: RwLock<RegistryState>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    /// The process-wide registry used by generated constructors.
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL_REGISTRY
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers one type. Its base and every type its fields name must
    /// already be registered (a type may name itself in a field).
    pub fn register(&self, descriptor: TypeDescriptor) -> Result<Arc<RegisteredType>, ModelError> {
        let mut state = self.write();
        let linked = Arc::new(link(&descriptor, &|name| state.get(name).cloned())?);
        check_field_types(&linked, &|name| state.get(name).map(|t| t.is_enum()))?;
        debug!(type_name = %linked.name(), lineage = ?linked.lineage(), "registered type");
        state.types.insert(linked.name().to_string(), linked.clone());
        Ok(linked)
    }

    /// Registers a batch of types atomically and marks the registry
    /// initialized. Bases must precede the types deriving from them; field
    /// types may refer to any entry of the batch. Nothing is registered if
    /// any entry fails.
    pub fn register_all(&self, descriptors: Vec<TypeDescriptor>) -> Result<(), ModelError> {
        let mut state = self.write();

        check_batch_cycles(&descriptors, &state)?;

        let mut pending: HashMap<String, Arc<RegisteredType>> = HashMap::new();
        let mut order = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            if pending.contains_key(&descriptor.name) {
                return Err(ModelError::DuplicateType(descriptor.name.clone()));
            }
            let linked = link(descriptor, &|name| {
                pending.get(name).or_else(|| state.get(name)).cloned()
            })?;
            order.push(linked.name().to_string());
            pending.insert(linked.name().to_string(), Arc::new(linked));
        }

        for linked in pending.values() {
            check_field_types(linked, &|name| {
                pending
                    .get(name)
                    .or_else(|| state.get(name))
                    .map(|t| t.is_enum())
            })?;
        }

        for name in order {
            if let Some(linked) = pending.remove(&name) {
                debug!(type_name = %name, "registered type");
                state.types.insert(name, linked);
            }
        }
        state.initialized = true;
        Ok(())
    }

    /// Removes a type that no other type derives from. A fallback declared
    /// by the removed type keeps applying to its discriminator.
    pub fn unregister(&self, name: &str) -> Result<Arc<RegisteredType>, ModelError> {
        let mut state = self.write();
        if let Some(derived) = state
            .types
            .values()
            .find(|t| t.name() != name && t.is_a(name))
        {
            return Err(ModelError::TypeInUse {
                type_name: name.to_string(),
                derived:   derived.name().to_string(),
            });
        }
        let removed = state.types.remove(name).ok_or_else(|| ModelError::UnknownTypeReference {
            missing:       name.to_string(),
            referenced_by: "unregister".to_string(),
        })?;
        if let Some(target) = removed.fallback() {
            if target != name {
                state.fallbacks.insert(name.to_string(), target.to_string());
            }
        }
        debug!(type_name = name, "unregistered type");
        Ok(removed)
    }

    /// Declares that records carrying `discriminator` are read as `target`.
    pub fn declare_fallback(&self, discriminator: &str, target: &str) -> Result<(), ModelError> {
        let mut state = self.write();
        match state.get(target) {
            Some(t) if !t.is_enum() => {}
            _ => {
                return Err(ModelError::UnknownTypeReference {
                    missing:       target.to_string(),
                    referenced_by: discriminator.to_string(),
                })
            }
        }
        state.fallbacks.insert(discriminator.to_string(), target.to_string());
        Ok(())
    }

    /// The declared fallback type for a discriminator, if any.
    pub fn fallback_for(&self, discriminator: &str) -> Option<Arc<RegisteredType>> {
        let state = self.read();
        let target = state.fallbacks.get(discriminator)?;
        let resolved = state.get(target).cloned();
        if resolved.is_none() {
            warn!(discriminator, target = %target, "fallback target is no longer registered");
        }
        resolved
    }

    pub fn get(&self, name: &str) -> Option<Arc<RegisteredType>> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().types.contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().types.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn enum_descriptor(&self, name: &str) -> Option<Arc<RegisteredType>> {
        self.get(name).filter(|t| t.is_enum())
    }

    /// Whether `name` is `ancestor` or derives from it.
    pub fn is_a(&self, name: &str, ancestor: &str) -> bool {
        self.get(name).map_or(false, |t| t.is_a(ancestor))
    }

    pub fn is_initialized(&self) -> bool {
        self.read().initialized
    }

    pub fn ensure_initialized(&self) -> Result<(), ModelError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(ModelError::RegistryNotInitialized)
        }
    }

    /// Forgets every type and fallback declaration.
    pub fn clear(&self) {
        let mut state = self.write();
        *state = RegistryState::default();
    }
}

fn link(
    descriptor: &TypeDescriptor,
    lookup: &dyn Fn(&str) -> Option<Arc<RegisteredType>>,
) -> Result<RegisteredType, ModelError> {
    let name = descriptor.name.clone();
    if lookup(&name).is_some() {
        return Err(ModelError::DuplicateType(name));
    }

    let mut lineage = vec![name.clone()];
    let mut fields: Vec<FieldDescriptor> = Vec::new();
    let mut capabilities: Vec<String> = descriptor.capabilities.clone();

    if descriptor.is_enum() {
        if descriptor.base.is_some() || !descriptor.fields.is_empty() {
            return Err(ModelError::mismatch(name, "enum without base or fields", "record"));
        }
    } else if let Some(ref base_name) = descriptor.base {
        if *base_name == name {
            return Err(ModelError::CyclicInheritance {
                cycle: vec![name.clone(), name],
            });
        }
        let base = lookup(base_name).ok_or_else(|| ModelError::UnknownTypeReference {
            missing:       base_name.clone(),
            referenced_by: name.clone(),
        })?;
        if base.is_enum() {
            return Err(ModelError::mismatch(name, "record base", base_name));
        }
        lineage.extend(base.lineage().iter().cloned());
        fields.extend(base.fields().iter().cloned());
        for capability in base.capabilities() {
            if !capabilities.contains(capability) {
                capabilities.push(capability.clone());
            }
        }
    }

    let own_offset = fields.len();
    fields.extend(descriptor.fields.iter().cloned());

    let mut by_name = HashMap::new();
    let mut by_wire_name = HashMap::new();
    for (i, field) in fields.iter().enumerate() {
        let clash = field.wire_name == DEFAULT_DISCRIMINATOR
            || by_wire_name.insert(field.wire_name.clone(), i).is_some()
            || by_name.insert(field.name.clone(), i).is_some();
        if clash {
            return Err(ModelError::DuplicateWireName {
                type_name: name,
                wire_name: field.wire_name.clone(),
            });
        }
    }

    if let Some(ref target) = descriptor.fallback {
        if !lineage.contains(target) {
            return Err(ModelError::InvalidFallback {
                type_name: name,
                target:    target.clone(),
            });
        }
    }

    Ok(RegisteredType {
        descriptor: descriptor.clone(),
        lineage,
        fields,
        own_offset,
        by_name,
        by_wire_name,
        capabilities,
    })
}

/// Checks that every type named by an own field is known and of the right
/// sort. `is_enum` answers `None` for unknown names.
fn check_field_types(
    linked: &RegisteredType,
    is_enum: &dyn Fn(&str) -> Option<bool>,
) -> Result<(), ModelError> {
    for field in linked.own_fields() {
        let mut kind = &field.kind;
        while let ValueKind::Array(inner) = kind {
            kind = &**inner;
        }
        let (target, want_enum) = match kind {
            ValueKind::Enum(target) => (target, true),
            ValueKind::Object(target) | ValueKind::Reference(target) => (target, false),
            _ => continue,
        };
        let found = if target == linked.name() {
            Some(linked.is_enum())
        } else {
            is_enum(target)
        };
        match found {
            None => {
                return Err(ModelError::UnknownTypeReference {
                    missing:       target.clone(),
                    referenced_by: format!("{}.{}", linked.name(), field.name),
                })
            }
            Some(found_enum) if found_enum != want_enum => {
                return Err(ModelError::mismatch(
                    format!("{}.{}", linked.name(), field.name),
                    if want_enum { "enum type" } else { "record type" },
                    target,
                ))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn check_batch_cycles(descriptors: &[TypeDescriptor], state: &RegistryState) -> Result<(), ModelError> {
    let bases: HashMap<&str, &str> = descriptors
        .iter()
        .filter_map(|d| d.base.as_deref().map(|base| (d.name.as_str(), base)))
        .collect();

    for descriptor in descriptors {
        let mut seen: Vec<&str> = vec![descriptor.name.as_str()];
        let mut visited: HashSet<&str> = seen.iter().copied().collect();
        let mut current = bases.get(descriptor.name.as_str()).copied();
        while let Some(base) = current {
            if !visited.insert(base) {
                let start = seen.iter().position(|n| *n == base).unwrap_or(0);
                let mut cycle: Vec<String> = seen[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(base.to_string());
                return Err(ModelError::CyclicInheritance { cycle });
            }
            seen.push(base);
            // Registered types cannot be part of a new cycle.
            if state.types.contains_key(base) {
                break;
            }
            current = bases.get(base).copied();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use elementum_schema::Primitive;

    fn shape() -> TypeDescriptor {
        TypeDescriptor::record("Shape")
            .capability("Drawable")
            .field(FieldDescriptor::new("id", ValueKind::Primitive(Primitive::String)).identity())
    }

    fn circle() -> TypeDescriptor {
        TypeDescriptor::record("Circle")
            .base("Shape")
            .fallback("Shape")
            .capability("HasArea")
            .field(FieldDescriptor::new("radius", ValueKind::Primitive(Primitive::Float)))
    }

    #[test]
    fn links_lineage_fields_and_capabilities() {
        let registry = TypeRegistry::new();
        registry.register(shape()).unwrap();
        let circle = registry.register(circle()).unwrap();

        assert_eq!(circle.lineage(), &["Circle".to_string(), "Shape".to_string()]);
        let names: Vec<&str> = circle.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "radius"]);
        assert_eq!(circle.own_fields().len(), 1);
        assert_eq!(circle.capabilities(), &["HasArea".to_string(), "Drawable".to_string()]);
        assert_eq!(circle.identity_field().map(|f| f.name.as_str()), Some("id"));
        assert!(registry.is_a("Circle", "Shape"));
        assert!(!registry.is_a("Shape", "Circle"));
        assert!(!registry.is_initialized());
    }

    #[test]
    fn rejects_bad_registrations() {
        let registry = TypeRegistry::new();
        assert!(matches!(
            registry.register(circle()),
            Err(ModelError::UnknownTypeReference { ref missing, .. }) if missing == "Shape"
        ));
        registry.register(shape()).unwrap();
        assert!(matches!(registry.register(shape()), Err(ModelError::DuplicateType(_))));
        assert!(matches!(
            registry.register(TypeDescriptor::record("Loop").base("Loop")),
            Err(ModelError::CyclicInheritance { .. })
        ));
        assert!(matches!(
            registry.register(TypeDescriptor::record("Other").fallback("Shape")),
            Err(ModelError::InvalidFallback { .. })
        ));
        assert!(matches!(
            registry.register(
                TypeDescriptor::record("Square")
                    .base("Shape")
                    .field(FieldDescriptor::new("key", ValueKind::Primitive(Primitive::Int)).wire_name("id"))
            ),
            Err(ModelError::DuplicateWireName { .. })
        ));
    }

    #[test]
    fn batch_registration_is_atomic() {
        let registry = TypeRegistry::new();
        let bad = TypeDescriptor::record("Group")
            .field(FieldDescriptor::new("members", ValueKind::Array(Box::new(ValueKind::Object("Missing".into())))));
        let err = registry.register_all(vec![shape(), circle(), bad]).unwrap_err();
        assert!(matches!(err, ModelError::UnknownTypeReference { ref missing, .. } if missing == "Missing"));
        assert!(registry.names().is_empty());
        assert!(!registry.is_initialized());
        assert!(matches!(registry.ensure_initialized(), Err(ModelError::RegistryNotInitialized)));

        // Forward field references inside one batch are fine.
        let group = TypeDescriptor::record("Group")
            .field(FieldDescriptor::new("members", ValueKind::Array(Box::new(ValueKind::Object("Shape".into())))));
        registry.register_all(vec![group, shape(), circle()]).unwrap();
        assert_eq!(registry.names(), vec!["Circle", "Group", "Shape"]);
        assert!(registry.is_initialized());
    }

    #[test]
    fn batch_cycles_are_reported() {
        let registry = TypeRegistry::new();
        let err = registry
            .register_all(vec![
                TypeDescriptor::record("A").base("B"),
                TypeDescriptor::record("B").base("A"),
            ])
            .unwrap_err();
        match err {
            ModelError::CyclicInheritance { cycle } => assert_eq!(cycle, vec!["A", "B", "A"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unregister_leaves_a_fallback_behind() {
        let registry = TypeRegistry::new();
        registry.register_all(vec![shape(), circle()]).unwrap();

        assert!(matches!(registry.unregister("Shape"), Err(ModelError::TypeInUse { .. })));
        registry.unregister("Circle").unwrap();
        assert!(!registry.contains("Circle"));
        assert_eq!(registry.fallback_for("Circle").map(|t| t.name().to_string()), Some("Shape".to_string()));

        registry.declare_fallback("Hexagon", "Shape").unwrap();
        assert!(registry.fallback_for("Hexagon").is_some());
        assert!(registry.declare_fallback("Hexagon", "Nowhere").is_err());

        registry.clear();
        assert!(registry.names().is_empty());
        assert!(registry.fallback_for("Hexagon").is_none());
    }

    #[test]
    fn readers_never_see_a_partially_linked_type() {
        use crate::{
            context::Context,
            converter::{Converter, ConverterOptions},
            validator::ValidatorChain,
        };
        use serde_json::json;

        const WRITES: usize = 64;

        fn derived(name: &str, base: &str) -> TypeDescriptor {
            TypeDescriptor::record(name)
                .base(base)
                .field(FieldDescriptor::new(format!("{}_size", name.to_lowercase()), ValueKind::Primitive(Primitive::Int)).optional())
        }

        let registry = TypeRegistry::new();
        registry.register_all(vec![shape()]).unwrap();
        let validators = ValidatorChain::new();
        let converter = Converter::new(Context::new(&registry, &validators), ConverterOptions::default()).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..WRITES {
                    let name = format!("T{}", i);
                    if i % 2 == 0 {
                        registry.register(derived(&name, "Shape")).unwrap();
                    } else {
                        let child = format!("U{}", i);
                        registry.register_all(vec![derived(&name, "Shape"), derived(&child, &name)]).unwrap();
                    }
                }
            });

            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        for i in 0..WRITES {
                            for name in [format!("T{}", i), format!("U{}", i)] {
                                if let Some(ty) = registry.get(&name) {
                                    assert_eq!(ty.lineage()[0], name);
                                    assert_eq!(ty.lineage().len(), ty.fields().len());
                                    assert_eq!(ty.lineage().last().map(String::as_str), Some("Shape"));
                                }
                                match converter.deserialize(&json!({"discriminator": name.as_str(), "id": "x"})) {
                                    Ok(instance) => {
                                        assert_eq!(instance.type_name(), name);
                                        assert_eq!(instance.values().len(), instance.registered_type().lineage().len());
                                    }
                                    Err(ModelError::UnknownDiscriminator(missing)) => assert_eq!(missing, name),
                                    Err(other) => panic!("unexpected {:?}", other),
                                }
                            }
                        }
                    }
                });
            }
        });

        assert_eq!(registry.names().len(), 1 + WRITES + WRITES / 2);
    }
}
