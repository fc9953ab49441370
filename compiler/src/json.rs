//! JSON form of a schema source.
//!
//! ```json
//! {
//!   "package": "shapes",
//!   "types": [
//!     { "name": "Units", "values": [{ "label": "METERS", "ordinal": 0 }] },
//!     { "name": "Shape", "fields": [{ "name": "id", "type": "int", "identity": true }] },
//!     { "name": "Circle", "base": "Shape", "fallback": "Shape",
//!       "fields": [{ "name": "radius", "wireName": "Radius", "type": "float" }] }
//!   ]
//! }
//! ```
//!
//! Field types use the same spelling as the `.elem` IDL (`int`, `Shape[]`,
//! `ref Shape`). Keys this module does not know are ignored.

use serde::Deserialize;

use crate::{
    error::SchemaError,
    types::{Definition, DefinitionKind, EnumMember, Field, Schema, TypeRef},
};

#[derive(Debug, Deserialize)]
struct JsonSchema {
    #[serde(default)]
    package: Option<String>,
    #[serde(default)]
    types:   Vec<JsonType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonType {
    name:       String,
    #[serde(default)]
    base:       Option<String>,
    #[serde(default)]
    fallback:   Option<String>,
    #[serde(default)]
    implements: Vec<String>,
    #[serde(default)]
    fields:     Vec<JsonField>,
    #[serde(default)]
    values:     Option<Vec<JsonEnumValue>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonField {
    name:        String,
    #[serde(default)]
    wire_name:   Option<String>,
    #[serde(rename = "type")]
    type_:       String,
    #[serde(default = "default_required")]
    required:    bool,
    #[serde(default)]
    ignore_null: bool,
    #[serde(default)]
    identity:    bool,
    #[serde(default)]
    deprecated:  bool,
}

#[derive(Debug, Deserialize)]
struct JsonEnumValue {
    label:   String,
    ordinal: i64,
}

fn default_required() -> bool {
    true
}

/// Reads a type spelling such as `Shape`, `float[]` or `ref Shape[]`.
pub fn parse_type_ref(text: &str) -> Result<TypeRef, SchemaError> {
    let mut rest = text.trim();
    let is_reference = match rest.strip_prefix("ref ") {
        Some(stripped) => {
            rest = stripped.trim_start();
            true
        }
        None => false,
    };
    let is_array = match rest.strip_suffix("[]") {
        Some(stripped) => {
            rest = stripped.trim_end();
            true
        }
        None => false,
    };
    let valid = !rest.is_empty()
        && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !rest.starts_with(|c: char| c.is_ascii_digit());
    if !valid {
        return Err(SchemaError::VerifierError(format!(
            "Invalid type spelling \"{}\"",
            text
        )));
    }
    Ok(TypeRef {
        name: rest.to_string(),
        is_array,
        is_reference,
    })
}

/// Builds the schema model from a JSON schema document.
pub fn parse_json_schema(text: &str) -> Result<Schema, SchemaError> {
    let source: JsonSchema = serde_json::from_str(text)?;

    let mut definitions = Vec::with_capacity(source.types.len());
    for ty in source.types {
        let kind = if ty.values.is_some() {
            DefinitionKind::Enum
        } else {
            DefinitionKind::Struct
        };
        if kind == DefinitionKind::Enum && (ty.base.is_some() || !ty.fields.is_empty()) {
            return Err(SchemaError::VerifierError(format!(
                "The enum \"{}\" cannot declare a base type or fields",
                ty.name
            )));
        }

        let mut fields = Vec::with_capacity(ty.fields.len());
        for field in ty.fields {
            fields.push(Field {
                wire_name:     field.wire_name.unwrap_or_else(|| field.name.clone()),
                name:          field.name,
                line:          0,
                column:        0,
                type_:         parse_type_ref(&field.type_)?,
                required:      field.required,
                ignore_null:   field.ignore_null,
                is_identity:   field.identity,
                is_deprecated: field.deprecated,
            });
        }

        let members = ty
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|v| EnumMember {
                label:   v.label,
                ordinal: v.ordinal,
                line:    0,
                column:  0,
            })
            .collect();

        definitions.push(Definition {
            name: ty.name,
            line: 0,
            column: 0,
            kind,
            base: ty.base,
            fallback: ty.fallback,
            capabilities: ty.implements,
            fields,
            members,
        });
    }

    Ok(Schema {
        package: source.package,
        definitions,
    })
}
