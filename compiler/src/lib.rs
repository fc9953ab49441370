//! elementum-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser for `.elem` IDL files and a reader for JSON schema sources,
//!  2) A schema verifier (duplicate types, unknown references, inheritance cycles, wire names, fallbacks),
//!  3) Emission ordering and lowering to runtime `TypeDescriptor`s,
//!  4) Code generation (`compile_schema_to_rust` → `String`, `generate_to_dir` → files),
//!  5) The `SchemaError` type.

pub mod error;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod json;
pub mod verifier;
pub mod compiler;
pub mod gen_rust;

pub use compiler::{compile_json_schema, compile_schema, emission_order, generate_to_dir, lower_schema, CompiledSchema};
pub use error::SchemaError;
pub use gen_rust::{compile_schema_to_rust, GeneratorOptions};
pub use json::parse_json_schema;
pub use parser::parse_schema;
pub use tokenizer::tokenize_schema;
pub use verifier::verify_schema;
