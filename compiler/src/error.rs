use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}, column {column}: {msg}")]
    ParseError {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Invalid JSON schema source: {0}")]
    Json(#[from] serde_json::Error),

    #[error("The type \"{0}\" is defined twice")]
    DuplicateType(String),

    #[error("The type name \"{0}\" is reserved")]
    ReservedName(String),

    #[error("Unknown type \"{missing}\" referenced by \"{referenced_by}\"")]
    UnknownTypeReference {
        missing:       String,
        referenced_by: String,
    },

    #[error("Cyclic inheritance: {}", cycle.join(" -> "))]
    CyclicInheritance { cycle: Vec<String> },

    #[error("Wire name \"{wire_name}\" is used twice in \"{type_name}\"")]
    DuplicateWireName {
        type_name: String,
        wire_name: String,
    },

    #[error("Fallback \"{target}\" of \"{type_name}\" is not the type itself or one of its ancestors")]
    InvalidFallback {
        type_name: String,
        target:    String,
    },

    #[error("Recursive nesting of \"{0}\" is not allowed")]
    RecursiveNesting(String),

    #[error("Verifier error: {0}")]
    VerifierError(String),
}
