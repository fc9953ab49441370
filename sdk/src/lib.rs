//! elementum
//!
//! Runtime support for types generated from Elementum schemas.
//!
//! - [`TypeRegistry`]: the descriptors of every known type, with inheritance
//!   and fallback links resolved
//! - [`ValidatorChain`]: pre/post construction hooks keyed by type or capability
//! - [`Instance`] and [`Shell`]: checked construction of values
//! - [`Converter`]: discriminator-tagged JSON with fallback resolution
//! - [`Model`]: an id-keyed container with reference resolution
//!
//! Generated code imports everything it needs from the crate root.
//!
//! ```
//! use elementum::schema::{FieldDescriptor, Primitive, TypeDescriptor, ValueKind};
//! use elementum::{Context, Converter, ConverterOptions, TypeRegistry, ValidatorChain};
//!
//! let registry = TypeRegistry::new();
//! registry
//!     .register_all(vec![TypeDescriptor::record("Shape")
//!         .field(FieldDescriptor::new("id", ValueKind::Primitive(Primitive::Int)).identity())])
//!     .unwrap();
//! let validators = ValidatorChain::new();
//! let converter = Converter::new(Context::new(&registry, &validators), ConverterOptions::default()).unwrap();
//!
//! let shape = converter.from_str(r#"{"discriminator":"Shape","id":7}"#).unwrap();
//! assert_eq!(shape.type_name(), "Shape");
//! assert_eq!(converter.to_string(&shape).unwrap(), r#"{"discriminator":"Shape","id":7}"#);
//! ```

pub mod context;
pub mod converter;
pub mod error;
pub mod instance;
pub mod model;
pub mod registry;
pub mod traits;
pub mod validator;
pub mod value;

pub use elementum_schema as schema;
pub use elementum_schema::Id;

pub use context::Context;
pub use converter::{Converter, ConverterOptions};
pub use error::{HookPhase, ModelError};
pub use instance::{Instance, Shell};
pub use model::{LoadFailure, Model, ModelLoad};
pub use registry::{RegisteredType, TypeRegistry};
pub use traits::{entity_from_value, enum_from_value, enum_to_value, Entity, EnumEntity, FromValue};
pub use validator::{Hooks, PostHook, PreHook, Validator, ValidatorChain};
pub use value::Value;

use tracing::info;

/// Compiles `.elem` source and registers its types into `registry`. Types a
/// plugin ships as schema text become constructible and convertible
/// without generated code.
pub fn load_schema(text: &str, registry: &TypeRegistry) -> Result<(), ModelError> {
    let compiled = elementum_compiler::compile_schema(text)?;
    info!(types = compiled.descriptors.len(), "loading schema");
    registry.register_all(compiled.descriptors)
}

/// Same as [`load_schema`] for a JSON schema source.
pub fn load_json_schema(text: &str, registry: &TypeRegistry) -> Result<(), ModelError> {
    let compiled = elementum_compiler::compile_json_schema(text)?;
    info!(types = compiled.descriptors.len(), "loading schema");
    registry.register_all(compiled.descriptors)
}
