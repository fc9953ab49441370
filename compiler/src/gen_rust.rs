use std::collections::HashSet;

use elementum_schema::{FieldDescriptor, Primitive, TypeDescriptor, ValueKind};

use crate::{compiler::CompiledSchema, utils::quote};

const HEADER: &str = "// Generated by elementum. Do not edit.";

/// Knobs for the Rust generator.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Path of the runtime crate as seen from the generated code.
    pub runtime_path:   String,
    /// Module path prefix for types that are generated elsewhere.
    pub base_namespace: Option<String>,
    /// Types that are referenced but not emitted.
    pub excluded:       HashSet<String>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            runtime_path:   "elementum".to_string(),
            base_namespace: None,
            excluded:       HashSet::new(),
        }
    }
}

/// Converts a string to PascalCase.
/// Underscored and fully uppercase names (`METERS`, `SQUARE_FEET`) are
/// lowercased after the first letter of every word; mixed case is kept.
pub(crate) fn to_pascal_case(s: &str) -> String {
    fn capitalize(word: &str, lower_rest: bool) -> String {
        let mut chars = word.chars();
        match chars.next() {
            None => String::new(),
            Some(first) if lower_rest => first.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
            Some(first) => first.to_uppercase().to_string() + chars.as_str(),
        }
    }

    if s.contains('_') {
        s.split('_')
            .filter(|word| !word.is_empty())
            .map(|word| capitalize(word, true))
            .collect()
    } else {
        capitalize(s, s == s.to_uppercase())
    }
}

/// Converts a string to snake_case, keeping acronyms together
/// (`sessionID` becomes `session_id`).
pub(crate) fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                if !prev.is_uppercase() || (i + 1 < chars.len() && chars[i + 1].is_lowercase()) {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

/// Escapes Rust reserved keywords by suffixing with an underscore.
fn escape_rust_keyword(s: &str) -> String {
    let keywords = [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else",
        "enum", "extern", "false", "fn", "for", "if", "impl",
        "in", "let", "loop", "match", "mod", "move", "mut",
        "pub", "ref", "return", "self", "Self", "static",
        "struct", "super", "trait", "true", "type", "unsafe",
        "use", "where", "while",
    ];
    if keywords.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

/// Names a field getter may not take: constructor parameters, inherent
/// constructors and the `Entity` methods that generated code calls as
/// `Self::name()` or `value.name()`.
const TAKEN_IDENTS: [&str; 11] = [
    "base",
    "ctx",
    "new",
    "new_in",
    "shell",
    "shell_in",
    "descriptor",
    "as_instance",
    "into_instance",
    "from_instance",
    "from_instance_unchecked",
];

/// Snake-case identifier for a field, clear of keywords and of the names
/// the generated code already uses.
fn field_ident(name: &str) -> String {
    let ident = escape_rust_keyword(&to_snake_case(name));
    if TAKEN_IDENTS.contains(&ident.as_str()) {
        format!("{}_", ident)
    } else {
        ident
    }
}

fn type_path(name: &str, options: &GeneratorOptions) -> String {
    let ident = to_pascal_case(name);
    match options.base_namespace {
        Some(ref namespace) if options.excluded.contains(name) => format!("{}::{}", namespace, ident),
        _ => ident,
    }
}

fn rust_type(kind: &ValueKind, options: &GeneratorOptions) -> String {
    match kind {
        ValueKind::Primitive(Primitive::Bool) => "bool".to_string(),
        ValueKind::Primitive(Primitive::Int) => "i64".to_string(),
        ValueKind::Primitive(Primitive::Float) => "f64".to_string(),
        ValueKind::Primitive(Primitive::String) => "String".to_string(),
        ValueKind::Enum(name) | ValueKind::Object(name) => type_path(name, options),
        ValueKind::Reference(_) => "Id".to_string(),
        ValueKind::Array(inner) => format!("Vec<{}>", rust_type(inner, options)),
    }
}

fn field_type(field: &FieldDescriptor, options: &GeneratorOptions) -> String {
    let ty = rust_type(&field.kind, options);
    if field.required {
        ty
    } else {
        format!("Option<{}>", ty)
    }
}

fn kind_expr(kind: &ValueKind) -> String {
    match kind {
        ValueKind::Primitive(p) => {
            let variant = match p {
                Primitive::Bool => "Bool",
                Primitive::Int => "Int",
                Primitive::Float => "Float",
                Primitive::String => "String",
            };
            format!("ValueKind::Primitive(Primitive::{})", variant)
        }
        ValueKind::Enum(name) => format!("ValueKind::Enum({}.to_string())", quote(name)),
        ValueKind::Object(name) => format!("ValueKind::Object({}.to_string())", quote(name)),
        ValueKind::Reference(name) => format!("ValueKind::Reference({}.to_string())", quote(name)),
        ValueKind::Array(inner) => format!("ValueKind::Array(Box::new({}))", kind_expr(inner)),
    }
}

fn field_expr(field: &FieldDescriptor) -> String {
    let mut expr = format!("FieldDescriptor::new({}, {})", quote(&field.name), kind_expr(&field.kind));
    if field.wire_name != field.name {
        expr.push_str(&format!(".wire_name({})", quote(&field.wire_name)));
    }
    if !field.required {
        expr.push_str(".optional()");
    }
    if field.null_rule == elementum_schema::NullRule::Ignore {
        expr.push_str(".ignore_null()");
    }
    if field.identity {
        expr.push_str(".identity()");
    }
    if field.deprecated {
        expr.push_str(".deprecated()");
    }
    expr
}

fn imports(options: &GeneratorOptions) -> Vec<String> {
    let rt = &options.runtime_path;
    vec![
        "#![allow(unused_imports)]".to_string(),
        format!("use {}::schema::{{EnumValue, FieldDescriptor, Primitive, TypeDescriptor, ValueKind}};", rt),
        format!(
            "use {}::{{Context, Entity, EnumEntity, FromValue, Id, Instance, ModelError, Shell, TypeRegistry, Value}};",
            rt
        ),
        format!("use {}::{{entity_from_value, enum_from_value, enum_to_value}};", rt),
        "".to_string(),
    ]
}

/// Own and inherited fields of a record, root type first.
fn flattened_fields<'a>(compiled: &'a CompiledSchema, descriptor: &'a TypeDescriptor) -> Vec<&'a FieldDescriptor> {
    let mut chain = vec![descriptor];
    let mut current = descriptor.base.as_deref();
    while let Some(base) = current {
        match compiled.descriptor(base) {
            // The verifier rules out cycles, but never loop forever on bad input.
            Some(d) if !chain.iter().any(|c| c.name == d.name) => {
                chain.push(d);
                current = d.base.as_deref();
            }
            _ => break,
        }
    }
    chain.iter().rev().flat_map(|d| d.fields.iter()).collect()
}

/// Generates Rust code for an enumeration.
fn generate_enum(descriptor: &TypeDescriptor) -> String {
    let enum_name = to_pascal_case(&descriptor.name);
    let values = descriptor.enum_values.as_deref().unwrap_or_default();
    let variant = |label: &str| escape_rust_keyword(&to_pascal_case(label));

    let mut lines = Vec::new();
    lines.push("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]".to_string());
    lines.push(format!("pub enum {} {{", enum_name));
    for value in values {
        lines.push(format!("    {},", variant(&value.label)));
    }
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.push(format!("impl EnumEntity for {} {{", enum_name));
    lines.push(format!("    const TYPE_NAME: &'static str = {};", quote(&descriptor.name)));
    lines.push("".to_string());
    lines.push("    fn descriptor() -> TypeDescriptor {".to_string());
    lines.push(format!("        TypeDescriptor::enumeration({}, vec![", quote(&descriptor.name)));
    for value in values {
        lines.push(format!("            EnumValue::new({}, {}),", quote(&value.label), value.ordinal));
    }
    lines.push("        ])".to_string());
    lines.push("    }".to_string());
    lines.push("".to_string());

    lines.push("    fn label(&self) -> &'static str {".to_string());
    lines.push("        match self {".to_string());
    for value in values {
        lines.push(format!("            {}::{} => {},", enum_name, variant(&value.label), quote(&value.label)));
    }
    lines.push("        }".to_string());
    lines.push("    }".to_string());
    lines.push("".to_string());

    lines.push("    fn ordinal(&self) -> i64 {".to_string());
    lines.push("        match self {".to_string());
    for value in values {
        lines.push(format!("            {}::{} => {},", enum_name, variant(&value.label), value.ordinal));
    }
    lines.push("        }".to_string());
    lines.push("    }".to_string());
    lines.push("".to_string());

    lines.push("    fn from_label(label: &str) -> Result<Self, ModelError> {".to_string());
    lines.push("        match label {".to_string());
    for value in values {
        lines.push(format!("            {} => Ok({}::{}),", quote(&value.label), enum_name, variant(&value.label)));
    }
    lines.push("            other => Err(ModelError::UnknownEnumValue {".to_string());
    lines.push("                enum_name: Self::TYPE_NAME.to_string(),".to_string());
    lines.push("                label:     other.to_string(),".to_string());
    lines.push("            }),".to_string());
    lines.push("        }".to_string());
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.push(format!("impl From<{}> for Value {{", enum_name));
    lines.push(format!("    fn from(value: {}) -> Value {{", enum_name));
    lines.push("        enum_to_value(&value)".to_string());
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.push(format!("impl FromValue for {} {{", enum_name));
    lines.push("    fn from_value(value: &Value) -> Result<Self, ModelError> {".to_string());
    lines.push("        enum_from_value(value)".to_string());
    lines.push("    }".to_string());
    lines.push("}".to_string());

    lines.join("\n")
}

/// Generates the wrapper type, constructors, accessors and trait impls of
/// one record type.
fn generate_struct(compiled: &CompiledSchema, descriptor: &TypeDescriptor, options: &GeneratorOptions) -> String {
    let struct_name = to_pascal_case(&descriptor.name);
    let base_type = descriptor.base.as_deref().map(|base| type_path(base, options));

    // Constructor parameters: the base value, then the type's own fields.
    let mut params: Vec<String> = Vec::new();
    let mut args: Vec<String> = Vec::new();
    if let Some(ref base) = base_type {
        params.push(format!("base: {}", base));
        args.push("base".to_string());
    }
    for field in &descriptor.fields {
        let ident = field_ident(&field.name);
        params.push(format!("{}: {}", ident, field_type(field, options)));
        args.push(ident);
    }
    let own_values: Vec<String> = descriptor
        .fields
        .iter()
        .map(|f| format!("Value::from({})", field_ident(&f.name)))
        .collect();
    let base_arg = if base_type.is_some() {
        "Some(base.into_instance())"
    } else {
        "None"
    };

    let mut lines = Vec::new();
    match base_type {
        Some(ref base) => lines.push(format!("/// The `{}` record type, derived from `{}`.", descriptor.name, base)),
        None => lines.push(format!("/// The `{}` record type.", descriptor.name)),
    }
    lines.push("#[derive(Debug, Clone, PartialEq)]".to_string());
    lines.push(format!("pub struct {}(Instance);", struct_name));
    lines.push("".to_string());

    lines.push(format!("impl {} {{", struct_name));
    lines.push("    /// Full constructor; runs the validation hooks registered for this type.".to_string());
    lines.push(format!("    pub fn new({}) -> Result<Self, ModelError> {{", params.join(", ")));
    let mut global_args = vec!["Context::global()".to_string()];
    global_args.extend(args.iter().cloned());
    lines.push(format!("        Self::new_in({})", global_args.join(", ")));
    lines.push("    }".to_string());
    lines.push("".to_string());

    let mut ctx_params = vec!["ctx: Context<'_>".to_string()];
    ctx_params.extend(params.iter().cloned());
    lines.push(format!("    pub fn new_in({}) -> Result<Self, ModelError> {{", ctx_params.join(", ")));
    lines.push(format!("        let own = vec![{}];", own_values.join(", ")));
    lines.push(format!(
        "        Instance::construct(ctx, Self::TYPE_NAME, {}, own).map({})",
        base_arg, struct_name
    ));
    lines.push("    }".to_string());
    lines.push("".to_string());

    lines.push("    /// Incremental constructor; hooks run once, when the shell is finished.".to_string());
    lines.push("    pub fn shell() -> Result<Shell<'static>, ModelError> {".to_string());
    lines.push("        Shell::new(Context::global(), Self::TYPE_NAME)".to_string());
    lines.push("    }".to_string());
    lines.push("".to_string());
    lines.push("    pub fn shell_in(ctx: Context<'_>) -> Result<Shell<'_>, ModelError> {".to_string());
    lines.push("        Shell::new(ctx, Self::TYPE_NAME)".to_string());
    lines.push("    }".to_string());

    for field in flattened_fields(compiled, descriptor) {
        let ident = field_ident(&field.name);
        let ty = field_type(field, options);
        let deprecated = if field.deprecated { "    #[deprecated]\n" } else { "" };
        lines.push("".to_string());
        lines.push(format!(
            "{}    pub fn {}(&self) -> Result<{}, ModelError> {{\n        FromValue::from_value(self.0.get({})?)\n    }}",
            deprecated,
            ident,
            ty,
            quote(&field.name)
        ));
        lines.push("".to_string());
        lines.push(format!(
            "{}    pub fn set_{}(&mut self, value: {}) -> Result<(), ModelError> {{\n        self.0.set({}, Value::from(value))\n    }}",
            deprecated,
            ident.trim_end_matches('_'),
            ty,
            quote(&field.name)
        ));
    }
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.push(format!("impl Entity for {} {{", struct_name));
    lines.push(format!("    const TYPE_NAME: &'static str = {};", quote(&descriptor.name)));
    lines.push("".to_string());
    lines.push("    fn descriptor() -> TypeDescriptor {".to_string());
    lines.push(format!("        TypeDescriptor::record({})", quote(&descriptor.name)));
    if let Some(ref base) = descriptor.base {
        lines.push(format!("            .base({})", quote(base)));
    }
    if let Some(ref fallback) = descriptor.fallback {
        lines.push(format!("            .fallback({})", quote(fallback)));
    }
    for capability in &descriptor.capabilities {
        lines.push(format!("            .capability({})", quote(capability)));
    }
    for field in &descriptor.fields {
        lines.push(format!("            .field({})", field_expr(field)));
    }
    lines.push("    }".to_string());
    lines.push("".to_string());
    lines.push("    fn from_instance_unchecked(instance: Instance) -> Self {".to_string());
    lines.push(format!("        {}(instance)", struct_name));
    lines.push("    }".to_string());
    lines.push("".to_string());
    lines.push("    fn into_instance(self) -> Instance {".to_string());
    lines.push("        self.0".to_string());
    lines.push("    }".to_string());
    lines.push("".to_string());
    lines.push("    fn as_instance(&self) -> &Instance {".to_string());
    lines.push("        &self.0".to_string());
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.push(format!("impl From<{}> for Value {{", struct_name));
    lines.push(format!("    fn from(value: {}) -> Value {{", struct_name));
    lines.push("        Value::Object(Box::new(value.0))".to_string());
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.push(format!("impl FromValue for {} {{", struct_name));
    lines.push("    fn from_value(value: &Value) -> Result<Self, ModelError> {".to_string());
    lines.push("        entity_from_value(value)".to_string());
    lines.push("    }".to_string());
    lines.push("}".to_string());

    lines.join("\n")
}

fn generate_type(compiled: &CompiledSchema, descriptor: &TypeDescriptor, options: &GeneratorOptions) -> String {
    if descriptor.is_enum() {
        generate_enum(descriptor)
    } else {
        generate_struct(compiled, descriptor, options)
    }
}

/// `descriptors()` and `register_types()` for the emitted types.
fn generate_registration(compiled: &CompiledSchema, options: &GeneratorOptions) -> String {
    let mut lines = Vec::new();
    lines.push("/// Descriptors of every type in this module, bases first.".to_string());
    lines.push("pub fn descriptors() -> Vec<TypeDescriptor> {".to_string());
    lines.push("    vec![".to_string());
    for descriptor in &compiled.descriptors {
        if options.excluded.contains(&descriptor.name) {
            continue;
        }
        lines.push(format!("        {}::descriptor(),", to_pascal_case(&descriptor.name)));
    }
    lines.push("    ]".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());
    lines.push("/// Registers this module's types as one batch and marks the registry initialized.".to_string());
    lines.push("pub fn register_types(registry: &TypeRegistry) -> Result<(), ModelError> {".to_string());
    lines.push("    registry.register_all(descriptors())".to_string());
    lines.push("}".to_string());
    lines.join("\n")
}

/// Compiles the schema into a single Rust module as a string.
/// When the schema names a package, the code is wrapped in `pub mod <package>`.
pub fn compile_schema_to_rust(compiled: &CompiledSchema, options: &GeneratorOptions) -> String {
    let mut rust_code: Vec<String> = vec![HEADER.to_string()];

    let package = compiled.schema.package.as_deref().map(|p| escape_rust_keyword(&to_snake_case(p)));
    if let Some(ref name) = package {
        rust_code.push(format!("pub mod {} {{", name));
    }

    rust_code.extend(imports(options));

    for descriptor in &compiled.descriptors {
        if options.excluded.contains(&descriptor.name) {
            continue;
        }
        rust_code.push(generate_type(compiled, descriptor, options));
        rust_code.push("".to_string());
    }

    rust_code.push(generate_registration(compiled, options));

    if package.is_some() {
        rust_code.push("}".to_string());
    }
    rust_code.push("".to_string());

    rust_code.join("\n")
}

/// Source of the per-type file written by `generate_to_dir`.
pub(crate) fn generate_type_file(compiled: &CompiledSchema, descriptor: &TypeDescriptor, options: &GeneratorOptions) -> String {
    let mut rust_code: Vec<String> = vec![HEADER.to_string()];
    rust_code.extend(imports(options));
    rust_code.push("use super::*;".to_string());
    rust_code.push("".to_string());
    rust_code.push(generate_type(compiled, descriptor, options));
    rust_code.push("".to_string());
    rust_code.join("\n")
}

/// `mod.rs` for a directory written by `generate_to_dir`.
pub(crate) fn generate_module_file(compiled: &CompiledSchema, options: &GeneratorOptions) -> String {
    let mut rust_code: Vec<String> = vec![HEADER.to_string()];
    rust_code.extend(imports(options));
    for descriptor in &compiled.descriptors {
        if options.excluded.contains(&descriptor.name) {
            continue;
        }
        let module = escape_rust_keyword(&to_snake_case(&descriptor.name));
        rust_code.push(format!("mod {};", module));
        rust_code.push(format!("pub use {}::{};", module, to_pascal_case(&descriptor.name)));
    }
    rust_code.push("".to_string());
    rust_code.push(generate_registration(compiled, options));
    rust_code.push("".to_string());
    rust_code.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_schema;

    const SHAPES: &str = r#"
        package shapes;
        enum Units { METERS = 0; SQUARE_FEET = 1; }
        struct Shape { string id @id; string? name @ignore_null; }
        @fallback(Shape)
        struct Circle : Shape { float radius = "Radius"; Units units; ref Shape? parent; Shape[] parts; }
    "#;

    #[test]
    fn case_conversions() {
        assert_eq!(to_pascal_case("SQUARE_FEET"), "SquareFeet");
        assert_eq!(to_pascal_case("METERS"), "Meters");
        assert_eq!(to_pascal_case("myType"), "MyType");
        assert_eq!(to_snake_case("sessionID"), "session_id");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(field_ident("type"), "type_");
        assert_eq!(field_ident("base"), "base_");
        assert_eq!(field_ident("descriptor"), "descriptor_");
        assert_eq!(field_ident("asInstance"), "as_instance_");
        assert_eq!(field_ident("from_instance_unchecked"), "from_instance_unchecked_");
    }

    #[test]
    fn fields_named_like_entity_methods_are_escaped() {
        let compiled = compile_schema("struct Part { string descriptor; int into_instance; }").unwrap();
        let code = compile_schema_to_rust(&compiled, &GeneratorOptions::default());

        assert!(code.contains("pub fn descriptor_(&self) -> Result<String, ModelError> {"));
        assert!(code.contains("pub fn set_descriptor(&mut self, value: String) -> Result<(), ModelError> {"));
        assert!(code.contains("pub fn into_instance_(&self) -> Result<i64, ModelError> {"));
        assert!(code.contains("pub fn new(descriptor_: String, into_instance_: i64) -> Result<Self, ModelError> {"));
        assert!(!code.contains("pub fn descriptor(&self)"));
        assert!(code.contains("        Part::descriptor(),"));
    }

    #[test]
    fn generates_wrapper_with_delegating_constructor() {
        let compiled = compile_schema(SHAPES).unwrap();
        let code = compile_schema_to_rust(&compiled, &GeneratorOptions::default());

        assert!(code.starts_with(HEADER));
        assert!(code.contains("pub mod shapes {"));
        assert!(code.contains("pub struct Circle(Instance);"));
        assert!(code.contains(
            "pub fn new(base: Shape, radius: f64, units: Units, parent: Option<Id>, parts: Vec<Shape>) -> Result<Self, ModelError> {"
        ));
        assert!(code.contains("Instance::construct(ctx, Self::TYPE_NAME, Some(base.into_instance()), own).map(Circle)"));
        assert!(code.contains("Instance::construct(ctx, Self::TYPE_NAME, None, own).map(Shape)"));
        // Inherited accessors are available on the derived wrapper.
        let circle_impl = &code[code.find("impl Circle {").unwrap()..];
        assert!(circle_impl.contains("pub fn id(&self) -> Result<String, ModelError> {"));
        assert!(code.contains("pub fn set_radius(&mut self, value: f64) -> Result<(), ModelError> {"));
        assert!(code.contains(
            ".field(FieldDescriptor::new(\"radius\", ValueKind::Primitive(Primitive::Float)).wire_name(\"Radius\"))"
        ));
        assert!(code.contains(
            ".field(FieldDescriptor::new(\"name\", ValueKind::Primitive(Primitive::String)).optional().ignore_null())"
        ));
    }

    #[test]
    fn generates_enum_and_registration() {
        let compiled = compile_schema(SHAPES).unwrap();
        let code = compile_schema_to_rust(&compiled, &GeneratorOptions::default());

        assert!(code.contains("pub enum Units {\n    Meters,\n    SquareFeet,\n}"));
        assert!(code.contains("\"SQUARE_FEET\" => Ok(Units::SquareFeet),"));
        assert!(code.contains("Units::SquareFeet => 1,"));

        let descriptors = &code[code.find("pub fn descriptors()").unwrap()..];
        let units = descriptors.find("Units::descriptor()").unwrap();
        let shape = descriptors.find("Shape::descriptor()").unwrap();
        let circle = descriptors.find("Circle::descriptor()").unwrap();
        assert!(units < shape && shape < circle);
        assert!(code.contains("registry.register_all(descriptors())"));
    }

    #[test]
    fn excluded_types_come_from_the_base_namespace() {
        let compiled = compile_schema(SHAPES).unwrap();
        let options = GeneratorOptions {
            runtime_path:   "crate::runtime".to_string(),
            base_namespace: Some("crate::core".to_string()),
            excluded:       ["Shape".to_string()].into_iter().collect(),
        };
        let code = compile_schema_to_rust(&compiled, &options);

        assert!(!code.contains("pub struct Shape(Instance);"));
        assert!(!code.contains("Shape::descriptor(),"));
        assert!(code.contains("pub fn new(base: crate::core::Shape,"));
        assert!(code.contains("parts: Vec<crate::core::Shape>"));
        assert!(code.contains("use crate::runtime::{Context,"));
    }
}
