use std::fs;

use elementum_compiler::{
    compile_schema,
    gen_rust::GeneratorOptions,
    generate_to_dir,
    parser::parse_schema,
    tokenizer::tokenize_schema,
    types::DefinitionKind,
    SchemaError,
};

const SCHEMA: &str = r#"
package geometry;

// Length units.
enum Units {
  METERS = 0;
  FEET = 1;
}

struct Shape {
  string id @id;
  string? name = "Name" @ignore_null;
}

@fallback(Shape) @implements(HasArea)
struct Circle : Shape {
  float radius;
  Units units;
}

struct Group : Shape {
  Shape[] members;
  ref Shape? anchor;
  int? legacy_count @deprecated;
}
"#;

#[test]
fn test_parse_schema() {
    let tokens = tokenize_schema(SCHEMA).expect("tokenize_schema failed");
    let schema = parse_schema(&tokens).expect("parse_schema failed");

    assert_eq!(schema.package.as_deref(), Some("geometry"));
    assert_eq!(schema.definitions.len(), 4);

    let units = &schema.definitions[0];
    assert_eq!(units.kind, DefinitionKind::Enum);
    assert_eq!(units.members.len(), 2);
    assert_eq!(units.members[1].label, "FEET");
    assert_eq!(units.members[1].ordinal, 1);

    let shape = &schema.definitions[1];
    assert_eq!(shape.fields.len(), 2);
    assert!(shape.fields[0].is_identity);
    assert_eq!(shape.fields[1].wire_name, "Name");
    assert!(!shape.fields[1].required);

    let circle = &schema.definitions[2];
    assert_eq!(circle.base.as_deref(), Some("Shape"));
    assert_eq!(circle.fallback.as_deref(), Some("Shape"));
    assert_eq!(circle.capabilities, vec!["HasArea"]);

    let group = &schema.definitions[3];
    assert!(group.fields[0].type_.is_array);
    assert!(group.fields[1].type_.is_reference);
    assert!(group.fields[2].is_deprecated);
}

#[test]
fn test_compile_reports_unknown_reference() {
    let err = compile_schema("struct Shape { Color fill; }").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unknown type \"Color\" referenced by \"Shape.fill\""
    );
}

#[test]
fn test_generate_to_dir_writes_one_file_per_type() {
    let compiled = compile_schema(SCHEMA).expect("compile failed");
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("generated");

    // Stale output from an earlier run is removed.
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("stale.rs"), "// old").unwrap();

    let written = generate_to_dir(&compiled, &out, &GeneratorOptions::default()).expect("generate failed");

    let mut names: Vec<String> = fs::read_dir(&out)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["circle.rs", "group.rs", "mod.rs", "shape.rs", "units.rs"]);
    assert_eq!(written.last().unwrap().file_name().unwrap(), "mod.rs");

    let module = fs::read_to_string(out.join("mod.rs")).unwrap();
    assert!(module.contains("mod circle;\npub use circle::Circle;"));
    assert!(module.contains("pub fn register_types(registry: &TypeRegistry)"));

    let circle = fs::read_to_string(out.join("circle.rs")).unwrap();
    assert!(circle.contains("use super::*;"));
    assert!(circle.contains("pub struct Circle(Instance);"));
    assert!(!circle.contains("pub struct Shape(Instance);"));

    let group = fs::read_to_string(out.join("group.rs")).unwrap();
    assert!(group.contains("#[deprecated]\n    pub fn legacy_count(&self)"));
}

#[test]
fn test_generate_to_dir_fails_loudly() {
    let compiled = compile_schema(SCHEMA).expect("compile failed");
    let dir = tempfile::tempdir().expect("tempdir");
    // A regular file where a parent directory is needed.
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    let err = generate_to_dir(&compiled, &blocker.join("out"), &GeneratorOptions::default()).unwrap_err();
    assert!(matches!(err, SchemaError::Io(_)));
}
