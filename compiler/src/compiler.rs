use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use elementum_schema::{EnumValue, FieldDescriptor, NullRule, Primitive, TypeDescriptor, ValueKind};
use tracing::{debug, info};

use crate::{
    error::SchemaError,
    gen_rust::{generate_module_file, generate_type_file, to_snake_case, GeneratorOptions},
    json::parse_json_schema,
    parser::parse_schema,
    tokenizer::tokenize_schema,
    types::{Definition, DefinitionKind, Field, Schema, TypeRef},
    verifier::{lineage, verify_schema},
};

/// A verified schema together with everything derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSchema {
    pub schema:      Schema,
    /// Type names in emission order.
    pub order:       Vec<String>,
    /// One descriptor per type, in emission order.
    pub descriptors: Vec<TypeDescriptor>,
}

impl CompiledSchema {
    pub fn descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }
}

/// Compile `.elem` schema text.
/// Returns `Err(SchemaError)` if tokenization/parsing/verification fails.
pub fn compile_schema(text: &str) -> Result<CompiledSchema, SchemaError> {
    let tokens = tokenize_schema(text)?;
    let schema = parse_schema(&tokens)?;
    finish(schema)
}

/// Compile a JSON schema source.
pub fn compile_json_schema(text: &str) -> Result<CompiledSchema, SchemaError> {
    let schema = parse_json_schema(text)?;
    finish(schema)
}

fn finish(schema: Schema) -> Result<CompiledSchema, SchemaError> {
    verify_schema(&schema)?;
    let order = emission_order(&schema)?;
    let descriptors = lower_schema(&schema)?;
    debug!(
        package = schema.package.as_deref().unwrap_or(""),
        types = order.len(),
        "compiled schema"
    );
    Ok(CompiledSchema { schema, order, descriptors })
}

/// Enums first, then records with every base ahead of the types deriving
/// from it. Otherwise declaration order is kept.
pub fn emission_order(schema: &Schema) -> Result<Vec<String>, SchemaError> {
    let definitions_map: HashMap<&str, &Definition> = schema
        .definitions
        .iter()
        .map(|def| (def.name.as_str(), def))
        .collect();

    let mut order: Vec<String> = Vec::with_capacity(schema.definitions.len());
    let mut emitted: HashSet<String> = HashSet::new();

    for def in schema.definitions.iter().filter(|d| d.kind == DefinitionKind::Enum) {
        if emitted.insert(def.name.clone()) {
            order.push(def.name.clone());
        }
    }

    for def in schema.definitions.iter().filter(|d| d.kind == DefinitionKind::Struct) {
        let chain = lineage(&def.name, &definitions_map)?;
        for name in chain.into_iter().rev() {
            // Bases outside this schema are registered by someone else.
            if !definitions_map.contains_key(name.as_str()) {
                continue;
            }
            if emitted.insert(name.clone()) {
                order.push(name);
            }
        }
    }

    Ok(order)
}

/// Turn every definition into a runtime descriptor, in emission order.
pub fn lower_schema(schema: &Schema) -> Result<Vec<TypeDescriptor>, SchemaError> {
    let kinds: HashMap<&str, DefinitionKind> = schema
        .definitions
        .iter()
        .map(|def| (def.name.as_str(), def.kind))
        .collect();

    let mut descriptors = Vec::with_capacity(schema.definitions.len());
    for name in emission_order(schema)? {
        let def = schema
            .definition(&name)
            .ok_or_else(|| SchemaError::VerifierError(format!("Lost definition {}", name)))?;
        descriptors.push(lower_definition(def, &kinds)?);
    }
    Ok(descriptors)
}

fn lower_definition(def: &Definition, kinds: &HashMap<&str, DefinitionKind>) -> Result<TypeDescriptor, SchemaError> {
    if def.kind == DefinitionKind::Enum {
        let values = def
            .members
            .iter()
            .map(|m| EnumValue::new(m.label.clone(), m.ordinal))
            .collect();
        return Ok(TypeDescriptor::enumeration(def.name.clone(), values));
    }

    let mut descriptor = TypeDescriptor::record(def.name.clone());
    descriptor.base = def.base.clone();
    descriptor.fallback = def.fallback.clone();
    descriptor.capabilities = def.capabilities.clone();
    for field in &def.fields {
        descriptor.fields.push(lower_field(&def.name, field, kinds)?);
    }
    Ok(descriptor)
}

fn lower_field(owner: &str, field: &Field, kinds: &HashMap<&str, DefinitionKind>) -> Result<FieldDescriptor, SchemaError> {
    let kind = lower_type(owner, field, &field.type_, kinds)?;
    Ok(FieldDescriptor {
        name:       field.name.clone(),
        wire_name:  field.wire_name.clone(),
        kind,
        required:   field.required,
        null_rule:  if field.ignore_null { NullRule::Ignore } else { NullRule::Include },
        identity:   field.is_identity,
        deprecated: field.is_deprecated,
    })
}

fn lower_type(
    owner: &str,
    field: &Field,
    ty: &TypeRef,
    kinds: &HashMap<&str, DefinitionKind>,
) -> Result<ValueKind, SchemaError> {
    let element = if let Some(primitive) = Primitive::from_keyword(&ty.name) {
        ValueKind::Primitive(primitive)
    } else {
        match kinds.get(ty.name.as_str()) {
            Some(DefinitionKind::Enum) => ValueKind::Enum(ty.name.clone()),
            Some(DefinitionKind::Struct) if ty.is_reference => ValueKind::Reference(ty.name.clone()),
            Some(DefinitionKind::Struct) => ValueKind::Object(ty.name.clone()),
            None => {
                return Err(SchemaError::UnknownTypeReference {
                    missing:       ty.name.clone(),
                    referenced_by: format!("{}.{}", owner, field.name),
                })
            }
        }
    };
    Ok(if ty.is_array {
        ValueKind::Array(Box::new(element))
    } else {
        element
    })
}

/// Writes one Rust file per generated type plus a `mod.rs` into `out_dir`.
///
/// The directory is removed and recreated first, so stale files from an
/// earlier run never survive. Returns the written paths, `mod.rs` last.
pub fn generate_to_dir(
    compiled: &CompiledSchema,
    out_dir: &Path,
    options: &GeneratorOptions,
) -> Result<Vec<PathBuf>, SchemaError> {
    if out_dir.exists() {
        fs::remove_dir_all(out_dir)?;
    }
    fs::create_dir_all(out_dir)?;

    let mut written = Vec::new();
    for descriptor in &compiled.descriptors {
        if options.excluded.contains(&descriptor.name) {
            continue;
        }
        let path = out_dir.join(format!("{}.rs", to_snake_case(&descriptor.name)));
        fs::write(&path, generate_type_file(compiled, descriptor, options))?;
        written.push(path);
    }

    let mod_path = out_dir.join("mod.rs");
    fs::write(&mod_path, generate_module_file(compiled, options))?;
    written.push(mod_path);

    info!(dir = %out_dir.display(), files = written.len(), "generated rust sources");
    Ok(written)
}
