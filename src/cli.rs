use crate::asyncapi_builder::{AsyncApiBuilder, AsyncApiDocument};
use crate::config::{ConfigOverrides, GeneratorConfig};
use crate::events::Namespace;
use crate::integration::TypeScriptIntegration;
use crate::scanner::ManifestScanner;
use crate::schema_generator::SchemaGenerator;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;

/// Schema Depict - generate AsyncAPI documentation and TypeScript types from event manifests
#[derive(Parser, Debug)]
#[command(name = "schema-depict")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Manifest file, or a directory of manifests
    #[arg(value_name = "MANIFEST")]
    pub manifest_path: PathBuf,

    /// Documentation format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// AsyncAPI document output file
    #[arg(long = "docs", value_name = "FILE")]
    pub docs_path: Option<PathBuf>,

    /// TypeScript declarations output file
    #[arg(long = "types", value_name = "FILE")]
    pub types_path: Option<PathBuf>,

    /// Maximum number of rest arguments spelled out for acknowledged events
    #[arg(long = "max-overloads", value_name = "N")]
    pub max_overloads: Option<usize>,

    /// Write optional properties without `?`
    #[arg(long = "no-question-mark")]
    pub no_question_mark: bool,

    /// Write optional values without `| undefined`
    #[arg(long = "no-undefined")]
    pub no_undefined: bool,

    /// Document title
    #[arg(long = "title")]
    pub title: Option<String>,

    /// Document version
    #[arg(long = "version-label", value_name = "VERSION")]
    pub version_label: Option<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Both artifacts of one generation run
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub document: AsyncApiDocument,
    /// Printed TypeScript declarations
    pub types: String,
}

impl CliArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            title: self.title.clone(),
            version: self.version_label.clone(),
            max_overloads: self.max_overloads,
            no_question_mark: self.no_question_mark,
            no_undefined: self.no_undefined,
        }
    }
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.manifest_path.exists() {
        anyhow::bail!("Manifest path does not exist: {}", args.manifest_path.display());
    }

    info!("Manifest path: {}", args.manifest_path.display());
    info!("Documentation format: {:?}", args.output_format);
    match (&args.docs_path, &args.types_path) {
        (None, None) => info!("Output: stdout"),
        (docs, types) => {
            if let Some(docs) = docs {
                info!("Documentation file: {}", docs.display());
            }
            if let Some(types) = types {
                info!("Types file: {}", types.display());
            }
        }
    }

    Ok(args)
}

/// Generates the AsyncAPI document and the TypeScript declarations in memory.
///
/// Each artifact uses its own generator and alias table. Any unsupported schema kind
/// aborts the whole run.
pub fn generate(namespaces: &[Namespace], config: &GeneratorConfig) -> crate::error::Result<Artifacts> {
    info!("Generating documentation for {} namespaces", namespaces.len());
    let schema_gen = SchemaGenerator::new();
    let mut builder = AsyncApiBuilder::new(config);
    for namespace in namespaces {
        builder.add_namespace(namespace, &schema_gen)?;
    }
    let document = builder.build(schema_gen);

    info!("Generating TypeScript declarations");
    let mut integration = TypeScriptIntegration::new(&config.typescript);
    for namespace in namespaces {
        integration.add_namespace(namespace)?;
    }

    Ok(Artifacts {
        document,
        types: integration.print(),
    })
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Loading manifests...");
    let manifest = ManifestScanner::new(args.manifest_path.clone()).load()?;

    let mut config = manifest.config.clone();
    config.apply(&args.overrides());
    debug!("Effective configuration: {:?}", config);

    let namespaces = manifest.build().context("Failed to load event schemas")?;
    let event_count: usize = namespaces.iter().map(|ns| ns.events.len()).sum();
    if event_count == 0 {
        log::warn!("No events found in the manifest");
    }

    // nothing is written until both artifacts exist
    let artifacts = generate(&namespaces, &config).context("Generation failed")?;

    info!("Serializing to {:?} format...", args.output_format);
    let docs = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&artifacts.document)?,
        OutputFormat::Json => serialize_json(&artifacts.document)?,
    };

    match (&args.docs_path, &args.types_path) {
        (None, None) => println!("{}", docs),
        (docs_path, types_path) => {
            if let Some(path) = docs_path {
                write_to_file(&docs, path)?;
                info!("Wrote AsyncAPI document to {}", path.display());
            }
            if let Some(path) = types_path {
                write_to_file(&artifacts.types, path)?;
                info!("Wrote TypeScript declarations to {}", path.display());
            }
        }
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Namespaces: {}", namespaces.len());
    info!("  - Events: {}", event_count);
    info!(
        "  - Component schemas: {}",
        artifacts
            .document
            .components
            .as_ref()
            .map(|c| c.schemas.len())
            .unwrap_or(0)
    );

    Ok(())
}
