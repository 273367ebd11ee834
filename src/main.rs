//! Schema Depict - command-line tool for event documentation and type generation.
//!
//! Reads event manifests (YAML or JSON), then writes an AsyncAPI 3.0 document and a set of
//! TypeScript declarations describing every namespace, event and acknowledgement.
//!
//! # Usage
//!
//! ```bash
//! schema-depict [OPTIONS] <MANIFEST>
//! ```
//!
//! # Examples
//!
//! Print the YAML document:
//! ```bash
//! schema-depict ./events.yaml
//! ```
//!
//! Write both artifacts:
//! ```bash
//! schema-depict ./events --docs asyncapi.json -f json --types src/events.ts
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! schema-depict ./events.yaml -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use schema_depict::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Schema Depict starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("Generation completed successfully");

    Ok(())
}
