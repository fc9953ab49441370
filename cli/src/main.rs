use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use elementum::{Context, Converter, ConverterOptions, Model, ModelError, TypeRegistry, ValidatorChain};
use elementum_compiler::{compile_json_schema, compile_schema, compile_schema_to_rust, generate_to_dir, CompiledSchema, GeneratorOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "elementum")]
#[command(about = "Check Elementum schemas, generate Rust from them, or load models against them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and verify a schema, then print its emission order
    Check {
        /// Input `.elem` or `.json` schema file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the lowered type descriptors of a schema as JSON
    Describe {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Generate a single Rust source file from a schema
    GenRust {
        #[arg(short, long)]
        input: PathBuf,

        /// Output `.rs` file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        generator: GeneratorArgs,
    },

    /// Generate one Rust file per type plus a `mod.rs` into a directory
    GenDir {
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory; its previous contents are removed
        #[arg(short, long)]
        out_dir: PathBuf,

        #[command(flatten)]
        generator: GeneratorArgs,
    },

    /// Load a model file against a schema and print what survived
    LoadModel {
        /// Schema whose types are registered before loading
        #[arg(short, long)]
        schema: PathBuf,

        /// Model file of the form `{"elements": [...]}`
        #[arg(short, long)]
        model: PathBuf,

        /// Write the loaded model back out to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Type used for records whose discriminator is unknown
        #[arg(long)]
        fallback: Option<String>,

        /// Keep unknown properties and discriminators when writing back
        #[arg(long)]
        preserve_unknown: bool,
    },
}

#[derive(Args)]
struct GeneratorArgs {
    /// Path generated code imports the runtime from
    #[arg(long, default_value = "elementum")]
    runtime_path: String,

    /// Module already holding the excluded types, e.g. `crate::core`
    #[arg(long)]
    base_namespace: Option<String>,

    /// Type to leave out of the output (repeatable)
    #[arg(long)]
    exclude: Vec<String>,
}

impl From<&GeneratorArgs> for GeneratorOptions {
    fn from(args: &GeneratorArgs) -> Self {
        GeneratorOptions {
            runtime_path:   args.runtime_path.clone(),
            base_namespace: args.base_namespace.clone(),
            excluded:       args.exclude.iter().cloned().collect(),
        }
    }
}

/// Reads a schema file; `.json` files use the JSON source form.
fn read_schema(path: &Path) -> Result<CompiledSchema, ModelError> {
    let text = fs::read_to_string(path)?;
    let compiled = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => compile_json_schema(&text)?,
        _ => compile_schema(&text)?,
    };
    Ok(compiled)
}

fn main() -> Result<(), ModelError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Check { input } => {
            let compiled = read_schema(input)?;
            for name in &compiled.order {
                println!("{}", name);
            }
            info!(input = %input.display(), types = compiled.order.len(), "schema OK");
            Ok(())
        }

        Commands::Describe { input } => {
            let compiled = read_schema(input)?;
            println!("{}", serde_json::to_string_pretty(&compiled.descriptors)?);
            Ok(())
        }

        Commands::GenRust { input, output, generator } => {
            let compiled = read_schema(input)?;
            let rust_code = compile_schema_to_rust(&compiled, &generator.into());
            if let Some(out_path) = output {
                fs::write(out_path, &rust_code)?;
                info!(output = %out_path.display(), "generated Rust code");
            } else {
                println!("{}", rust_code);
            }
            Ok(())
        }

        Commands::GenDir { input, out_dir, generator } => {
            let compiled = read_schema(input)?;
            let written = generate_to_dir(&compiled, out_dir, &generator.into())?;
            for path in &written {
                println!("{}", path.display());
            }
            Ok(())
        }

        Commands::LoadModel { schema, model, output, fallback, preserve_unknown } => {
            let compiled = read_schema(schema)?;
            let registry = TypeRegistry::new();
            registry.register_all(compiled.descriptors)?;
            let validators = ValidatorChain::new();
            let converter = Converter::new(
                Context::new(&registry, &validators),
                ConverterOptions {
                    fallback: fallback.clone(),
                    preserve_unknown: *preserve_unknown,
                    ..ConverterOptions::default()
                },
            )?;

            let wire: serde_json::Value = serde_json::from_str(&fs::read_to_string(model)?)?;
            let load = Model::from_wire(&converter, &wire)?;
            println!("{} instances loaded, {} failures", load.model.len(), load.failures.len());
            for failure in &load.failures {
                match failure.id {
                    Some(ref id) => println!("  element {} ({}): {}", failure.index, id, failure.error),
                    None => println!("  element {}: {}", failure.index, failure.error),
                }
            }

            if let Some(out_path) = output {
                let text = serde_json::to_string_pretty(&load.model.to_wire(&converter)?)?;
                fs::write(out_path, text)?;
                info!(output = %out_path.display(), "wrote model");
            }
            Ok(())
        }
    }
}
