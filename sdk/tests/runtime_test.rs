use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use elementum::schema::{EnumValue, FieldDescriptor, Primitive, TypeDescriptor, ValueKind};
use elementum::{
    load_json_schema, load_schema, Context, Converter, ConverterOptions, Hooks, Id, Instance, Model, ModelError,
    Shell, TypeRegistry, ValidatorChain, Value,
};
use serde_json::json;

fn shape() -> TypeDescriptor {
    TypeDescriptor::record("Shape")
        .field(FieldDescriptor::new("id", ValueKind::Primitive(Primitive::Int)).identity())
        .field(FieldDescriptor::new("name", ValueKind::Primitive(Primitive::String)).optional().ignore_null())
}

fn circle() -> TypeDescriptor {
    TypeDescriptor::record("Circle")
        .base("Shape")
        .capability("HasArea")
        .field(FieldDescriptor::new("radius", ValueKind::Primitive(Primitive::Float)))
}

fn full_registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    registry.register_all(vec![shape(), circle()]).unwrap();
    registry
}

fn shape_only_registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    registry.register_all(vec![shape()]).unwrap();
    registry
}

fn make_circle(ctx: Context<'_>, id: i64, radius: f64) -> Instance {
    let base = Instance::construct(ctx, "Shape", None, vec![Value::Int(id), Value::Null]).unwrap();
    Instance::construct(ctx, "Circle", Some(base), vec![Value::Float(radius)]).unwrap()
}

#[test]
fn test_circle_degrades_to_shape_without_its_plugin() {
    let validators = ValidatorChain::new();

    let full = full_registry();
    let writer = Converter::new(Context::new(&full, &validators), ConverterOptions::default()).unwrap();
    let circle = make_circle(Context::new(&full, &validators), 1, 5.0);
    let text = writer.to_string(&circle).unwrap();
    assert_eq!(text, r#"{"discriminator":"Circle","id":1,"radius":5.0}"#);

    let partial = shape_only_registry();
    let strict = Converter::new(Context::new(&partial, &validators), ConverterOptions::default()).unwrap();
    assert!(matches!(
        strict.from_str(&text),
        Err(ModelError::UnknownDiscriminator(ref name)) if name == "Circle"
    ));

    let lenient = Converter::new(
        Context::new(&partial, &validators),
        ConverterOptions {
            fallback: Some("Shape".to_string()),
            ..ConverterOptions::default()
        },
    )
    .unwrap();
    let shape = lenient.from_str(&text).unwrap();
    assert_eq!(shape.type_name(), "Shape");
    assert_eq!(shape.get("id").unwrap(), &Value::Int(1));
    assert_eq!(shape.unrecognized_discriminator(), Some("Circle"));
    assert_eq!(lenient.to_string(&shape).unwrap(), r#"{"discriminator":"Shape","id":1}"#);
}

#[test]
fn test_registry_fallback_and_preserved_round_trip() {
    let validators = ValidatorChain::new();
    let partial = shape_only_registry();
    partial.declare_fallback("Circle", "Shape").unwrap();

    let converter = Converter::new(
        Context::new(&partial, &validators),
        ConverterOptions {
            preserve_unknown: true,
            ..ConverterOptions::default()
        },
    )
    .unwrap();

    let text = r#"{"discriminator":"Circle","id":1,"radius":5.0}"#;
    let shape = converter.from_str(text).unwrap();
    assert_eq!(shape.type_name(), "Shape");
    assert_eq!(shape.additional_properties().get("radius"), Some(&json!(5.0)));
    assert_eq!(converter.to_string(&shape).unwrap(), text);
}

#[test]
fn test_hooks_run_once_on_every_construction_path() {
    let registry = full_registry();
    let validators = ValidatorChain::new();
    let pre = Arc::new(AtomicUsize::new(0));
    let post = Arc::new(AtomicUsize::new(0));
    {
        let pre = pre.clone();
        let post = post.clone();
        validators.register(
            "HasArea",
            Hooks::new()
                .pre(move |_| {
                    pre.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .post(move |_| {
                    post.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        );
    }
    let ctx = Context::new(&registry, &validators);

    let circle = make_circle(ctx, 1, 2.0);
    assert_eq!((pre.load(Ordering::SeqCst), post.load(Ordering::SeqCst)), (1, 1));

    let mut shell = Shell::new(ctx, "Circle").unwrap();
    shell.set("id", 2i64).unwrap().set("radius", 3.0).unwrap();
    shell.finish().unwrap();
    assert_eq!((pre.load(Ordering::SeqCst), post.load(Ordering::SeqCst)), (2, 2));

    let converter = Converter::new(ctx, ConverterOptions::default()).unwrap();
    let text = converter.to_string(&circle).unwrap();
    converter.from_str(&text).unwrap();
    assert_eq!((pre.load(Ordering::SeqCst), post.load(Ordering::SeqCst)), (3, 3));

    validators.set_enabled(false);
    converter.from_str(&text).unwrap();
    assert_eq!((pre.load(Ordering::SeqCst), post.load(Ordering::SeqCst)), (3, 3));
}

#[test]
fn test_pre_hook_rejects_before_construction() {
    let registry = full_registry();
    let validators = ValidatorChain::new();
    validators.register(
        "Circle",
        Hooks::new().pre(|args| match args.last() {
            Some(Value::Float(radius)) if *radius < 0.0 => Err("negative radius".to_string()),
            _ => Ok(()),
        }),
    );
    let ctx = Context::new(&registry, &validators);
    let base = Instance::construct(ctx, "Shape", None, vec![Value::Int(1), Value::Null]).unwrap();
    let err = Instance::construct(ctx, "Circle", Some(base), vec![Value::Float(-1.0)]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "pre-construct hook of \"Circle\" failed: negative radius"
    );
}

#[test]
fn test_required_fields_and_optional_defaults() {
    let registry = full_registry();
    let validators = ValidatorChain::new();
    let converter = Converter::new(Context::new(&registry, &validators), ConverterOptions::default()).unwrap();

    assert!(matches!(
        converter.from_str(r#"{"discriminator":"Circle","id":1}"#),
        Err(ModelError::MissingRequiredField { ref field, .. }) if field == "radius"
    ));
    assert!(matches!(
        converter.from_str(r#"{"id":1}"#),
        Err(ModelError::MissingDiscriminator(_))
    ));

    let circle = converter.from_str(r#"{"discriminator":"Circle","id":1,"radius":2}"#).unwrap();
    assert_eq!(circle.get("name").unwrap(), &Value::Null);
    assert_eq!(circle.get("radius").unwrap(), &Value::Float(2.0));
}

#[test]
fn test_model_loads_in_any_order() {
    let registry = TypeRegistry::new();
    registry
        .register_all(vec![
            TypeDescriptor::record("Node")
                .field(FieldDescriptor::new("id", ValueKind::Primitive(Primitive::String)).identity())
                .field(
                    FieldDescriptor::new("next", ValueKind::Reference("Node".into()))
                        .optional()
                        .ignore_null(),
                ),
        ])
        .unwrap();
    let validators = ValidatorChain::new();
    let converter = Converter::new(Context::new(&registry, &validators), ConverterOptions::default()).unwrap();

    let records = vec![
        json!({"discriminator": "Node", "id": "x1", "next": "x2"}),
        json!({"discriminator": "Node", "id": "x2", "next": "x3"}),
        json!({"discriminator": "Node", "id": "x3"}),
    ];
    let mut reversed = records.clone();
    reversed.reverse();

    let forward = Model::from_wire(&converter, &json!({ "elements": records })).unwrap();
    let backward = Model::from_wire(&converter, &json!({ "elements": reversed })).unwrap();
    assert!(forward.failures.is_empty());
    assert_eq!(forward.model, backward.model);

    let first = forward.model.get(&Id::from("x1")).unwrap();
    let next = forward.model.resolve_field(first, "next").unwrap();
    assert_eq!(next[0].identifier(), Some(Id::from("x2")));

    let wire = forward.model.to_wire(&converter).unwrap();
    let reloaded = Model::from_wire(&converter, &wire).unwrap();
    assert_eq!(reloaded.model, forward.model);
}

const PLUGIN_SCHEMA: &str = r#"
package plugin;

enum Finish {
  MATTE = 0;
  GLOSS = 1;
}

struct Shape {
  int id @id;
}

@fallback(Shape)
struct Tile : Shape {
  Finish finish;
}
"#;

#[test]
fn test_load_schema_registers_plugin_types() {
    let registry = TypeRegistry::new();
    assert!(matches!(
        Converter::new(Context::new(&registry, ValidatorChain::global()), ConverterOptions::default()),
        Err(ModelError::RegistryNotInitialized)
    ));

    load_schema(PLUGIN_SCHEMA, &registry).unwrap();
    assert_eq!(registry.names(), vec!["Finish", "Shape", "Tile"]);
    assert!(registry.is_a("Tile", "Shape"));

    let validators = ValidatorChain::new();
    let converter = Converter::new(Context::new(&registry, &validators), ConverterOptions::default()).unwrap();
    let tile = converter
        .from_str(r#"{"discriminator":"Tile","id":4,"finish":"GLOSS"}"#)
        .unwrap();
    assert_eq!(tile.get("finish").unwrap(), &Value::Enum("Finish".into(), "GLOSS".into()));
    assert!(matches!(
        converter.from_str(r#"{"discriminator":"Tile","id":4,"finish":"SATIN"}"#),
        Err(ModelError::UnknownEnumValue { ref label, .. }) if label == "SATIN"
    ));

    assert!(matches!(load_schema(PLUGIN_SCHEMA, &registry), Err(ModelError::DuplicateType(_))));
}

#[test]
fn test_load_json_schema_matches_enum_descriptor() {
    let registry = TypeRegistry::new();
    load_json_schema(
        r#"{ "types": [{ "name": "Finish", "values": [{ "label": "MATTE", "ordinal": 0 }] }] }"#,
        &registry,
    )
    .unwrap();
    let finish = registry.enum_descriptor("Finish").unwrap();
    assert_eq!(finish.descriptor().enum_values, Some(vec![EnumValue::new("MATTE", 0)]));
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_circle_round_trips(
            id in any::<i64>(),
            radius in -1.0e9f64..1.0e9,
            name in proptest::option::of("[a-z]{0,8}"),
        ) {
            let registry = full_registry();
            let validators = ValidatorChain::new();
            let ctx = Context::new(&registry, &validators);
            let converter = Converter::new(ctx, ConverterOptions::default()).unwrap();

            let mut shell = Shell::new(ctx, "Circle").unwrap();
            shell.set("id", id).unwrap().set("radius", radius).unwrap().set("name", name).unwrap();
            let circle = shell.finish().unwrap();

            let text = converter.to_string(&circle).unwrap();
            let back = converter.from_str(&text).unwrap();
            prop_assert_eq!(back, circle);
        }
    }
}
