use std::fmt;

use elementum_compiler::SchemaError;
use elementum_schema::Id;
use thiserror::Error;

/// Which validation hook failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    PreConstruct,
    PostConstruct,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::PreConstruct => f.write_str("pre-construct"),
            HookPhase::PostConstruct => f.write_str("post-construct"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Record has no \"{0}\" property")]
    MissingDiscriminator(String),

    #[error("Unknown discriminator \"{0}\" and no fallback applies")]
    UnknownDiscriminator(String),

    #[error("Missing required field \"{field}\" of \"{type_name}\"")]
    MissingRequiredField {
        type_name: String,
        field:     String,
    },

    #[error("\"{label}\" is not a value of the enum \"{enum_name}\"")]
    UnknownEnumValue {
        enum_name: String,
        label:     String,
    },

    #[error("Identifier \"{0}\" is already used by another instance")]
    DuplicateIdentifier(Id),

    #[error("Reference to \"{0}\" does not resolve")]
    DanglingReference(Id),

    #[error("Type mismatch at \"{location}\": expected {expected}, found {found}")]
    TypeMismatch {
        location: String,
        expected: String,
        found:    String,
    },

    #[error("Field \"{field}\" of \"{type_name}\" holds a non-finite float")]
    NonFiniteFloat {
        type_name: String,
        field:     String,
    },

    #[error("{phase} hook of \"{type_name}\" failed: {message}")]
    Hook {
        type_name: String,
        phase:     HookPhase,
        message:   String,
    },

    #[error("The type \"{0}\" is already registered")]
    DuplicateType(String),

    #[error("Unknown type \"{missing}\" referenced by \"{referenced_by}\"")]
    UnknownTypeReference {
        missing:       String,
        referenced_by: String,
    },

    #[error("Cyclic inheritance: {}", cycle.join(" -> "))]
    CyclicInheritance { cycle: Vec<String> },

    #[error("Fallback \"{target}\" of \"{type_name}\" is not the type itself or one of its ancestors")]
    InvalidFallback {
        type_name: String,
        target:    String,
    },

    #[error("Wire name \"{wire_name}\" is used twice in \"{type_name}\"")]
    DuplicateWireName {
        type_name: String,
        wire_name: String,
    },

    #[error("Cannot unregister \"{type_name}\": \"{derived}\" derives from it")]
    TypeInUse {
        type_name: String,
        derived:   String,
    },

    #[error("The type registry has not been initialized")]
    RegistryNotInitialized,

    #[error("Malformed model: {0}")]
    MalformedModel(String),

    #[error("Instance of \"{0}\" has no identity field")]
    Unidentifiable(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub(crate) fn mismatch(location: impl Into<String>, expected: impl fmt::Display, found: impl fmt::Display) -> Self {
        ModelError::TypeMismatch {
            location: location.into(),
            expected: expected.to_string(),
            found:    found.to_string(),
        }
    }
}
