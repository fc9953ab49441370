//! Type descriptors and identifiers shared by the Elementum compiler and
//! runtime.
//!
//! A [TypeDescriptor](struct.TypeDescriptor.html) is the registry entry for
//! one schema type: its wire name, base type, own fields, fallback target and
//! (for enumerations) its labels.
//!
//! ```
//! use elementum_schema::*;
//!
//! let circle = TypeDescriptor::record("Circle")
//!     .base("Shape")
//!     .fallback("Shape")
//!     .field(FieldDescriptor::new("radius", ValueKind::Primitive(Primitive::Float)));
//!
//! assert_eq!(circle.base.as_deref(), Some("Shape"));
//! assert_eq!(circle.own_field("radius").map(|f| f.wire_name.as_str()), Some("radius"));
//! ```

pub mod descriptor;
pub mod id;

pub use descriptor::*;
pub use id::*;
