// example/src/main.rs

mod generated;

use elementum::{
    Context, Converter, ConverterOptions, Entity, Hooks, Id, Model, ModelError, TypeRegistry, ValidatorChain, Value,
};
use tracing_subscriber::EnvFilter;

// Bring the generated types into scope:
use generated::shapes::{self, Circle, Group, Shape, Units};

fn main() -> Result<(), ModelError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    shapes::register_types(TypeRegistry::global())?;

    // Every type implementing HasArea gets this check, whichever path builds it.
    ValidatorChain::global().register(
        "HasArea",
        Hooks::new().post(|instance| match instance.get("radius") {
            Ok(Value::Float(radius)) if *radius < 0.0 => Err(format!("negative radius {}", radius)),
            _ => Ok(()),
        }),
    );

    let circle = Circle::new(Shape::new("c1".to_string(), Some("wheel".to_string()))?, 2.5, Units::Meters)?;
    println!("circle  = {:?}", circle);
    println!("radius  = {} {:?}", circle.radius()?, circle.units()?);

    if let Err(error) = Circle::new(Shape::new("c2".to_string(), None)?, -1.0, Units::Feet) {
        println!("rejected = {}", error);
    }

    let converter = Converter::new(Context::global(), ConverterOptions::default())?;
    let text = converter.to_string(circle.as_instance())?;
    println!("wire    = {}", text);
    let back = Circle::from_instance(converter.from_str(&text)?)?;
    println!("equal after round trip: {}", back == circle);

    let group = Group::new(
        Shape::new("g1".to_string(), None)?,
        vec![Shape::new("s1".to_string(), Some("inner".to_string()))?],
        Some(Id::from("c1")),
    )?;

    let mut model = Model::new();
    model.add(circle.into_instance())?;
    model.add(group.into_instance())?;
    let wire = model.to_wire(&converter)?;
    println!("model   = {}", serde_json::to_string_pretty(&wire)?);

    let anchor = model.resolve_field(model.resolve_reference(&Id::from("g1"))?, "anchor")?;
    println!("g1.anchor -> {}", anchor[0].type_name());

    // A record written by a newer schema that has a Square type.
    let lenient = Converter::new(
        Context::global(),
        ConverterOptions {
            fallback: Some(Shape::TYPE_NAME.to_string()),
            ..ConverterOptions::default()
        },
    )?;
    let unknown = lenient.from_str(r#"{"discriminator":"Square","id":"q1","side":3}"#)?;
    println!(
        "Square read as {} (was {:?})",
        unknown.type_name(),
        unknown.unrecognized_discriminator()
    );

    Ok(())
}
