use std::collections::{HashMap, HashSet};
use elementum_schema::{Primitive, DEFAULT_DISCRIMINATOR};
use crate::{
    gen_rust::to_pascal_case,
    types::{Schema, Definition, DefinitionKind},
    utils::quote,
    error::SchemaError,
};

pub const RESERVED_NAMES: [&str; 4] = ["package", "ref", "enum", "struct"];
pub const NATIVE_TYPES: [&str; 4] = ["bool", "int", "float", "string"];

/// Returns `Ok(())` if the schema is internally consistent.
///
/// Type names are collected before anything is resolved, so fields and
/// base types may refer to definitions that appear later in the source.
pub fn verify_schema(schema: &Schema) -> Result<(), SchemaError> {
    let mut definitions_map: HashMap<&str, &Definition> = HashMap::new();

    // 1) Duplicate / reserved type names
    for def in &schema.definitions {
        if NATIVE_TYPES.contains(&def.name.as_str()) || definitions_map.contains_key(def.name.as_str()) {
            return Err(SchemaError::DuplicateType(def.name.clone()));
        }
        if RESERVED_NAMES.contains(&def.name.as_str()) {
            return Err(SchemaError::ReservedName(def.name.clone()));
        }
        definitions_map.insert(def.name.as_str(), def);
    }

    // 2) Resolve base types and field types
    for def in &schema.definitions {
        match def.kind {
            DefinitionKind::Enum => verify_enum(def)?,
            DefinitionKind::Struct => verify_references(def, &definitions_map)?,
        }
    }

    // 3) Inheritance must form a forest
    for def in &schema.definitions {
        lineage(&def.name, &definitions_map)?;
    }

    // 4) Wire names, identity and fallback targets along each lineage
    for def in &schema.definitions {
        if def.kind != DefinitionKind::Struct {
            continue;
        }
        let chain = lineage(&def.name, &definitions_map)?;

        let mut wire_names = HashSet::new();
        let mut identities = 0;
        // Root first so that the duplicate is reported on the derived field.
        for ancestor in chain.iter().rev() {
            for field in &definitions_map[ancestor.as_str()].fields {
                if field.wire_name == DEFAULT_DISCRIMINATOR || !wire_names.insert(field.wire_name.as_str()) {
                    return Err(SchemaError::DuplicateWireName {
                        type_name: def.name.clone(),
                        wire_name: field.wire_name.clone(),
                    });
                }
                if field.is_identity {
                    identities += 1;
                }
            }
        }
        if identities > 1 {
            return Err(SchemaError::VerifierError(format!(
                "The type {} declares more than one identity field",
                quote(&def.name)
            )));
        }

        if let Some(ref target) = def.fallback {
            if !chain.iter().any(|name| name == target) {
                return Err(SchemaError::InvalidFallback {
                    type_name: def.name.clone(),
                    target:    target.clone(),
                });
            }
        }
    }

    // 5) Required values may not contain themselves
    let mut state: HashMap<String, u8> = HashMap::new();
    for def in &schema.definitions {
        check_recursion(&def.name, &definitions_map, &mut state)?;
    }

    Ok(())
}

fn verify_enum(def: &Definition) -> Result<(), SchemaError> {
    if def.members.is_empty() {
        return Err(SchemaError::VerifierError(format!(
            "The enum {} has no values",
            quote(&def.name)
        )));
    }
    let mut labels = HashSet::new();
    let mut ordinals = HashSet::new();
    let mut variants: HashMap<String, &str> = HashMap::new();
    for member in &def.members {
        if !labels.insert(member.label.as_str()) {
            return Err(SchemaError::VerifierError(format!(
                "The label {} is used twice in {}",
                quote(&member.label),
                quote(&def.name)
            )));
        }
        if !ordinals.insert(member.ordinal) {
            return Err(SchemaError::VerifierError(format!(
                "The ordinal {} is used twice in {}",
                member.ordinal,
                quote(&def.name)
            )));
        }
        if let Some(other) = variants.insert(to_pascal_case(&member.label), member.label.as_str()) {
            return Err(SchemaError::VerifierError(format!(
                "The labels {} and {} of {} map to the same variant name",
                quote(other),
                quote(&member.label),
                quote(&def.name)
            )));
        }
    }
    Ok(())
}

fn verify_references(def: &Definition, definitions_map: &HashMap<&str, &Definition>) -> Result<(), SchemaError> {
    if let Some(ref base) = def.base {
        match definitions_map.get(base.as_str()) {
            None => {
                return Err(SchemaError::UnknownTypeReference {
                    missing:       base.clone(),
                    referenced_by: def.name.clone(),
                })
            }
            Some(base_def) if base_def.kind == DefinitionKind::Enum => {
                return Err(SchemaError::VerifierError(format!(
                    "The type {} cannot derive from the enum {}",
                    quote(&def.name),
                    quote(base)
                )))
            }
            Some(_) => {}
        }
    }

    if let Some(ref target) = def.fallback {
        if !definitions_map.contains_key(target.as_str()) {
            return Err(SchemaError::UnknownTypeReference {
                missing:       target.clone(),
                referenced_by: def.name.clone(),
            });
        }
    }

    let mut names = HashSet::new();
    for field in &def.fields {
        if !names.insert(field.name.as_str()) {
            return Err(SchemaError::VerifierError(format!(
                "The field {} is defined twice in {}",
                quote(&field.name),
                quote(&def.name)
            )));
        }

        let ty = &field.type_;
        let referenced_by = format!("{}.{}", def.name, field.name);
        if let Some(primitive) = Primitive::from_keyword(&ty.name) {
            if ty.is_reference {
                return Err(SchemaError::VerifierError(format!(
                    "The field {} cannot reference the primitive {}",
                    quote(&referenced_by),
                    quote(primitive.keyword())
                )));
            }
            if field.is_identity && !matches!(primitive, Primitive::Int | Primitive::String) {
                return Err(SchemaError::VerifierError(format!(
                    "The identity field {} must be an int or a string",
                    quote(&referenced_by)
                )));
            }
            continue;
        }

        let target = definitions_map.get(ty.name.as_str()).ok_or_else(|| {
            SchemaError::UnknownTypeReference {
                missing: ty.name.clone(),
                referenced_by: referenced_by.clone(),
            }
        })?;
        if field.is_identity {
            return Err(SchemaError::VerifierError(format!(
                "The identity field {} must be an int or a string",
                quote(&referenced_by)
            )));
        }
        if ty.is_reference && target.kind == DefinitionKind::Enum {
            return Err(SchemaError::VerifierError(format!(
                "The field {} cannot reference the enum {}",
                quote(&referenced_by),
                quote(&ty.name)
            )));
        }
    }
    Ok(())
}

/// The type itself followed by its ancestors, nearest first.
pub fn lineage(name: &str, definitions_map: &HashMap<&str, &Definition>) -> Result<Vec<String>, SchemaError> {
    let mut chain: Vec<String> = vec![name.to_string()];
    let mut current = definitions_map.get(name).and_then(|d| d.base.as_deref());
    while let Some(base) = current {
        if let Some(position) = chain.iter().position(|n| n == base) {
            let mut cycle: Vec<String> = chain[position..].to_vec();
            cycle.push(base.to_string());
            return Err(SchemaError::CyclicInheritance { cycle });
        }
        chain.push(base.to_string());
        current = definitions_map.get(base).and_then(|d| d.base.as_deref());
    }
    Ok(chain)
}

// Follows required, non-array object fields (inherited ones included);
// references and arrays can be empty and never force recursion.
fn check_recursion(
    name: &str,
    definitions_map: &HashMap<&str, &Definition>,
    state: &mut HashMap<String, u8>,
) -> Result<(), SchemaError> {
    let definition = match definitions_map.get(name) {
        Some(def) => def,
        None => return Ok(()),
    };
    if definition.kind != DefinitionKind::Struct {
        return Ok(());
    }
    match state.get(name) {
        Some(1) => return Err(SchemaError::RecursiveNesting(name.to_string())),
        Some(2) => return Ok(()),
        _ => {}
    }
    state.insert(name.to_string(), 1);
    for ancestor in lineage(name, definitions_map)? {
        for field in &definitions_map[ancestor.as_str()].fields {
            if field.required && !field.type_.is_array && !field.type_.is_reference {
                check_recursion(&field.type_.name, definitions_map, state)?;
            }
        }
    }
    state.insert(name.to_string(), 2);
    Ok(())
}
